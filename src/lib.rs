extern crate clap;

pub mod config;
pub mod domain;
pub mod error;
pub mod services;

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::{json, Map, Value};
use std::{sync::Arc, time::Duration};

pub use config::{ResourceOptions, ResourceSettings};
pub use domain::{
    AfterRequest, BeforeRequest, CacheSetting, Entity, EntityList, EntityShape, FieldMapping,
    FieldTransform, RequestAction, ReservedKeys, Template,
};
pub use error::{ResourceError, ResourceResult, TransportError};
pub use services::{
    ActionResult, CacheStore, HttpTransport, MemoryCache, PreparedRequest, PromiseTracker,
    RequestDescriptor, Resource, Transport, TransportResponse,
};

pub fn cli() -> clap::Command {
    clap::Command::new("modelfactory")
        .about("Expand and match RFC 6570 URI templates, and issue REST resource actions")
        .subcommand_required(true)
        .subcommand(
            clap::Command::new("expand")
                .about("Expand a URI template")
                .arg(Arg::new("template").required(true).value_name("TEMPLATE"))
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_name("JSON")
                        .help("Variable bindings as a JSON object")
                        .default_value("{}"),
                ),
        )
        .subcommand(
            clap::Command::new("match")
                .about("Recover the variables a URI was expanded from")
                .arg(Arg::new("template").required(true).value_name("TEMPLATE"))
                .arg(Arg::new("uri").required(true).value_name("URI")),
        )
        .subcommand(
            clap::Command::new("request")
                .about("Build and send a resource action")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Path to a YAML or JSON file describing the resource"),
                )
                .arg(Arg::new("action").required(true).value_name("ACTION"))
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_name("JSON")
                        .help("Request data; a bare value is taken as the primary key"),
                )
                .arg(
                    Arg::new("extras")
                        .short('e')
                        .long("extras")
                        .value_name("JSON")
                        .help("Extra query parameters"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the resolved request instead of sending it"),
                ),
        )
}

pub async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("expand", args)) => {
            let template = required(args, "template")?;
            let bindings = match parse_json_arg(args.get_one::<String>("data")) {
                Some(Value::Object(bindings)) => bindings,
                Some(_) => bail!("--data must be a JSON object"),
                None => Map::new(),
            };
            println!("{}", Template::parse(template).expand(&bindings));
        }
        Some(("match", args)) => {
            let template = Template::parse(required(args, "template")?);
            let uri = required(args, "uri")?;
            match template.match_uri(uri) {
                Some(bindings) => {
                    println!("{}", serde_json::to_string_pretty(&Value::Object(bindings))?)
                }
                None => bail!("no match"),
            }
        }
        Some(("request", args)) => {
            let config_path = args.get_one::<String>("config").map(|s| s.as_str());
            let settings = config::load_settings(config_path)?;
            let action = required(args, "action")?;
            let data = parse_json_arg(args.get_one::<String>("data"));
            let extras = parse_json_arg(args.get_one::<String>("extras"));

            let resource = build_resource(&settings)?;

            if args.get_flag("dry_run") {
                let prepared = resource.build_request(action, data, extras)?;
                let descriptor = &prepared.descriptor;
                let summary = json!({
                    "method": descriptor.method,
                    "url": descriptor.url,
                    "params": descriptor.params,
                    "data": descriptor.data,
                    "headers": descriptor.headers,
                    "signature": descriptor.signature(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let result = resource.call(action, data, extras).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        _ => bail!("Unknown command"),
    }
    Ok(())
}

/// A resource backed by `HttpTransport`, configured from settings
pub fn build_resource(settings: &ResourceSettings) -> anyhow::Result<Resource> {
    let mut transport = HttpTransport::new();
    if let Some(base_url) = &settings.base_url {
        transport = transport.with_base_url(base_url)?;
    }
    if let Some(secs) = settings.timeout_secs {
        transport = transport.with_timeout(Duration::from_secs(secs))?;
    }

    Ok(Resource::new(
        &settings.url,
        ResourceOptions::from(settings),
        Arc::new(transport),
    ))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(|s| s.as_str())
        .with_context(|| format!("Missing argument: {}", name))
}

/// JSON when it parses, otherwise the raw text as a string
fn parse_json_arg(raw: Option<&String>) -> Option<Value> {
    raw.map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}
