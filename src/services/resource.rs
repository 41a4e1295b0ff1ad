// Resource service - builds and issues requests for declarative REST actions

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    config::ResourceOptions,
    domain::{
        action::{RequestAction, BASE_ACTION, CORE_ACTIONS},
        entity::{Entity, EntityList, EntityShape},
        merge::{extend_deep, strip_reserved, ReservedKeys},
        template::{Template, TemplateCache},
        CacheSetting,
    },
    error::{ResourceError, ResourceResult},
    services::{
        cache::{CacheStore, MemoryCache},
        tracker::PromiseTracker,
        transport::{RequestDescriptor, Transport},
    },
};

/// The settled value of an action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Entity(Entity),
    List(EntityList),
    /// Unwrapped response body (`wrap: false`)
    Raw(Value),
}

impl ActionResult {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            ActionResult::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&EntityList> {
        match self {
            ActionResult::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ActionResult::Entity(entity) => entity.into_value(),
            ActionResult::List(list) => {
                Value::Array(list.into_iter().map(Entity::into_value).collect())
            }
            ActionResult::Raw(value) => value,
        }
    }
}

/// A resolved request plus the merged action it came from
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub action: String,
    pub config: RequestAction,
    pub descriptor: RequestDescriptor,
}

/// One logical REST endpoint with its own actions, cache and in-flight tracker
pub struct Resource {
    url: String,
    options: ResourceOptions,
    cache: Arc<MemoryCache>,
    tracker: PromiseTracker<ResourceResult<ActionResult>>,
    transport: Arc<dyn Transport>,
    templates: TemplateCache,
}

impl Resource {
    pub fn new(url: &str, options: ResourceOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: url.to_string(),
            cache: Arc::new(MemoryCache::new(url)),
            options,
            tracker: PromiseTracker::new(),
            transport,
            templates: TemplateCache::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// The resource-level cache that `cache: true` resolves to
    pub fn cache(&self) -> Arc<MemoryCache> {
        Arc::clone(&self.cache)
    }

    /// Number of distinct requests currently in flight
    pub fn pending_requests(&self) -> usize {
        self.tracker.len()
    }

    pub async fn get(&self, id: impl Into<Value>) -> ResourceResult<ActionResult> {
        self.call("get", Some(id.into()), None).await
    }

    pub async fn query(&self, params: Value) -> ResourceResult<ActionResult> {
        self.call("query", Some(params), None).await
    }

    pub async fn post(&self, data: Value) -> ResourceResult<ActionResult> {
        self.call("post", Some(data), None).await
    }

    pub async fn update(&self, data: Value) -> ResourceResult<ActionResult> {
        self.call("update", Some(data), None).await
    }

    pub async fn delete(&self, data: Value) -> ResourceResult<ActionResult> {
        self.call("delete", Some(data), None).await
    }

    /// Build and issue `action`. A call whose `METHOD:url` matches a request
    /// still in flight joins that request instead of sending another one.
    pub async fn call(
        &self,
        action: &str,
        data: Option<Value>,
        extras: Option<Value>,
    ) -> ResourceResult<ActionResult> {
        let prepared = self.build_request(action, data, extras)?;
        let signature = prepared.descriptor.signature();

        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let shape = Arc::clone(&self.options.shape);
        let reserved = self.options.reserved.clone();

        let pending = self.tracker.track(&signature, move || {
            execute(prepared, transport, cache, shape, reserved)
        });
        pending.await
    }

    /// Resolve method, URL, params and body for `action` without sending anything
    pub fn build_request(
        &self,
        action: &str,
        data: Option<Value>,
        extras: Option<Value>,
    ) -> ResourceResult<PreparedRequest> {
        let config = self.merged_action(action)?;
        let method = config.method_or_default();
        if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ResourceError::InvalidMethod(method));
        }

        let is_get = method == "GET";
        let mut data = data;
        let mut params = config.params.clone().unwrap_or_default();

        let url = if config.r#override.unwrap_or(false) {
            // The action URL is used as is; without one, the bare resource URL
            let configured = config
                .url
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(&self.url);
            let template = self.templates.get_or_compile(configured);
            self.fill(&template, &mut data, is_get)
        } else {
            let mut uri = if self.options.prefix.is_empty() {
                String::new()
            } else {
                format!("{}/", self.options.prefix)
            };
            uri.push_str(&self.url);
            if let Some(sub_path) = config.url.as_deref().filter(|s| !s.is_empty()) {
                uri.push('/');
                uri.push_str(sub_path);
            }

            let template = self.templates.get_or_compile(&uri);
            let mut uri = self.fill(&template, &mut data, is_get);

            if CORE_ACTIONS.contains(&action) {
                uri.push_str(&format!("/{{{}}}", self.options.pk));
            }

            let scalar = matches!(data, Some(Value::String(_)) | Some(Value::Number(_)));
            if is_get && scalar {
                // `get(1234)` is shorthand for `get({ pk: 1234 })`
                let mut keyed = Map::new();
                if let Some(id) = data.take() {
                    keyed.insert(self.options.pk.clone(), id);
                }
                data = Some(Value::Object(keyed));

                if let Some(Value::Object(extras)) = &extras {
                    extend_deep(&mut params, extras, &self.options.reserved);
                }
            } else if is_get {
                // Everything the sub-path did not use goes to the query string,
                // primary key included
                if let Some(Value::Object(query)) = &data {
                    extend_deep(&mut params, query, &self.options.reserved);
                }
            }

            // Already expanded once, so this string is specific to the data and
            // is not worth caching
            self.fill(&Template::parse(&uri), &mut data, is_get)
        };

        let data = if is_get || method == "DELETE" || action == "delete" {
            None
        } else {
            data
        };

        let cache: Option<Arc<dyn CacheStore>> = match &config.cache {
            Some(CacheSetting::Resource) => Some(self.cache.clone() as Arc<dyn CacheStore>),
            Some(CacheSetting::Store(store)) => Some(Arc::clone(store)),
            Some(CacheSetting::Disabled) | None => None,
        };

        tracing::debug!(action, method = %method, url = %url, "Resolved request");

        let descriptor = RequestDescriptor {
            method,
            url,
            params: if params.is_empty() { None } else { Some(params) },
            data,
            headers: config.headers.clone(),
            cache,
        };

        Ok(PreparedRequest {
            action: action.to_string(),
            config,
            descriptor,
        })
    }

    /// Expand a URL template against `data` with this resource's URL rules.
    /// Nothing is consumed from `data`.
    pub fn url_for(&self, template: &str, data: &Value) -> String {
        let mut data = Some(data.clone());
        self.fill(&Template::parse(template), &mut data, false)
    }

    fn merged_action(&self, action: &str) -> ResourceResult<RequestAction> {
        let own = self
            .options
            .actions
            .get(action)
            .filter(|_| action != BASE_ACTION)
            .ok_or_else(|| ResourceError::UnknownAction(action.to_string()))?;
        let base = self
            .options
            .actions
            .get(BASE_ACTION)
            .cloned()
            .unwrap_or_default();
        Ok(own.merged_over(&base, &self.options.reserved))
    }

    /// Expand `uri`, taking values from `data`. With `consume` set, resolved keys
    /// are removed from `data` so the remainder can become query parameters.
    fn fill(&self, template: &Template, data: &mut Option<Value>, consume: bool) -> String {
        let bindings = match data {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };

        let expanded = match bindings {
            Some(map) => template.expand_with(|name| {
                let value = if consume {
                    map.shift_remove(name)
                } else {
                    map.get(name).cloned()
                };
                value.filter(|v| !v.is_null())
            }),
            None => template.expand_with(|_| None),
        };

        if self.options.strip_trailing_slashes {
            strip_trailing_slashes(&expanded)
        } else {
            expanded
        }
    }
}

fn strip_trailing_slashes(uri: &str) -> String {
    let stripped = uri.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

async fn execute(
    prepared: PreparedRequest,
    transport: Arc<dyn Transport>,
    cache: Arc<MemoryCache>,
    shape: Arc<EntityShape>,
    reserved: ReservedKeys,
) -> ResourceResult<ActionResult> {
    let PreparedRequest {
        action,
        config,
        mut descriptor,
    } = prepared;

    if let Some(hook) = &config.before_request {
        hook.call(&mut descriptor);
    }
    if let Some(body) = descriptor.data.as_mut() {
        strip_reserved(body, &reserved);
    }

    tracing::info!(action = %action, method = %descriptor.method, url = %descriptor.url, "Sending request");
    let outcome = transport.send(descriptor).await;

    if config.invalidate_cache.unwrap_or(false) {
        tracing::debug!(cache = cache.id(), "Invalidating resource cache");
        cache.remove_all();
    }

    let response = outcome.map_err(|e| {
        tracing::warn!(action = %action, status = ?e.status, "Request failed: {}", e);
        ResourceError::from(e)
    })?;

    let mut body = response.data;
    if let Some(hook) = &config.after_request {
        if let Some(transformed) = hook.call(&body) {
            body = transformed;
        }
    }

    let result = if !config.wrap.unwrap_or(false) {
        ActionResult::Raw(body)
    } else if config.is_array.unwrap_or(false) {
        ActionResult::List(shape.list(body))
    } else {
        ActionResult::Entity(shape.entity(body))
    };

    Ok(result)
}
