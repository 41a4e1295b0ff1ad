// Integration tests for loading resource configuration

use modelfactory::config::load_settings;
use modelfactory::{build_resource, ResourceOptions, ResourceSettings};
use serde_json::{json, Value};
use std::path::PathBuf;

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("modelfactory_{}", name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_yaml_config_drives_request_building() {
    let path = write_config(
        "zoo.yml",
        r#"
url: api/zoo
baseUrl: https://example.com/
pk: zooId
actions:
  animals:
    url: "{zooId}/animals"
    isArray: true
    params:
      limit: 20
  update:
    method: PATCH
"#,
    );

    let settings = load_settings(path.to_str()).unwrap();
    let resource = build_resource(&settings).unwrap();

    let animals = resource
        .build_request("animals", Some(json!({"zooId": 4, "fed": true})), None)
        .unwrap();
    assert_eq!(animals.descriptor.url, "api/zoo/4/animals");
    assert_eq!(
        animals.descriptor.params.map(Value::Object),
        Some(json!({"limit": 20, "fed": true}))
    );

    let update = resource
        .build_request("update", Some(json!({"zooId": 4, "name": "Zoo"})), None)
        .unwrap();
    assert_eq!(update.descriptor.method, "PATCH");
    assert_eq!(update.descriptor.url, "api/zoo/4");
    assert_eq!(update.config.invalidate_cache, Some(true));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_json_config_is_accepted() {
    let path = write_config(
        "zoo.json",
        r#"{"url": "api/zoo", "prefix": "v1", "stripTrailingSlashes": false}"#,
    );

    let settings = load_settings(path.to_str()).unwrap();
    let resource = build_resource(&settings).unwrap();

    let prepared = resource.build_request("get", None, None).unwrap();
    assert_eq!(prepared.descriptor.url, "v1/api/zoo/");

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_invalid_yaml_reports_file() {
    let path = write_config("broken.yml", "url: [unclosed\n");

    let err = load_settings(path.to_str()).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid yaml configuration"));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_settings_round_trip_to_options() {
    let mut settings = ResourceSettings::new("api/zoo");
    settings.pk = "zooId".to_string();
    settings.prefix = "v1".to_string();

    let yml = serde_yaml::to_string(&settings).unwrap();
    let reloaded: ResourceSettings = serde_yaml::from_str(&yml).unwrap();
    let options = ResourceOptions::from(&reloaded);

    assert_eq!(options.pk, "zooId");
    assert_eq!(options.prefix, "v1");
    assert_eq!(options.actions.len(), 6);
}
