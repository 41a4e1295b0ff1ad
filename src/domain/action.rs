// Declarative REST action configuration

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::merge::{extend_deep, ReservedKeys};
use crate::services::cache::CacheStore;
use crate::services::transport::RequestDescriptor;

pub const BASE_ACTION: &str = "base";

/// Actions that address a single entity and get `/{pk}` appended to their URL
pub const CORE_ACTIONS: [&str; 4] = ["get", "post", "update", "delete"];

/// Runs before transmission and may rewrite the descriptor in place
#[derive(Clone)]
pub struct BeforeRequest(Arc<dyn Fn(&mut RequestDescriptor) + Send + Sync>);

impl BeforeRequest {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&mut RequestDescriptor) + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, descriptor: &mut RequestDescriptor) {
        (self.0)(descriptor)
    }
}

impl fmt::Debug for BeforeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeforeRequest(..)")
    }
}

/// Runs on the response body; a returned value replaces the body
#[derive(Clone)]
pub struct AfterRequest(Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>);

impl AfterRequest {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, body: &Value) -> Option<Value> {
        (self.0)(body)
    }
}

impl fmt::Debug for AfterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AfterRequest(..)")
    }
}

/// The `cache` field of an action
#[derive(Clone, Default)]
pub enum CacheSetting {
    #[default]
    Disabled,
    /// `cache: true` - use the resource's own cache
    Resource,
    /// A caller-supplied store, passed through untouched
    Store(Arc<dyn CacheStore>),
}

impl CacheSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheSetting::Disabled)
    }
}

impl fmt::Debug for CacheSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSetting::Disabled => f.write_str("Disabled"),
            CacheSetting::Resource => f.write_str("Resource"),
            CacheSetting::Store(store) => write!(f, "Store({})", store.id()),
        }
    }
}

// Only the boolean form has a serialized representation
impl Serialize for CacheSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_enabled())
    }
}

impl<'de> Deserialize<'de> for CacheSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(if bool::deserialize(deserializer)? {
            CacheSetting::Resource
        } else {
            CacheSetting::Disabled
        })
    }
}

/// Configuration for one verb of a resource.
///
/// Every field is optional so that an action can be layered over `base`:
/// set fields win, unset ones fall through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Sub-path appended to the resource URL, or the whole URL with `override`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_array: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidate_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#override: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(skip)]
    pub before_request: Option<BeforeRequest>,
    #[serde(skip)]
    pub after_request: Option<AfterRequest>,
}

impl RequestAction {
    pub fn new(method: &str) -> Self {
        Self {
            method: Some(method.to_string()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_array(mut self, is_array: bool) -> Self {
        self.is_array = Some(is_array);
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = Some(wrap);
        self
    }

    pub fn with_cache(mut self, cache: CacheSetting) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_invalidate_cache(mut self, invalidate: bool) -> Self {
        self.invalidate_cache = Some(invalidate);
        self
    }

    pub fn with_override(mut self, override_url: bool) -> Self {
        self.r#override = Some(override_url);
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn with_before_request(mut self, hook: BeforeRequest) -> Self {
        self.before_request = Some(hook);
        self
    }

    pub fn with_after_request(mut self, hook: AfterRequest) -> Self {
        self.after_request = Some(hook);
        self
    }

    /// Layer `self` over `base`: fields set on `self` win, nested maps merge key-wise
    pub fn merged_over(&self, base: &RequestAction, reserved: &ReservedKeys) -> RequestAction {
        RequestAction {
            method: self.method.clone().or_else(|| base.method.clone()),
            url: self.url.clone().or_else(|| base.url.clone()),
            is_array: self.is_array.or(base.is_array),
            wrap: self.wrap.or(base.wrap),
            cache: self.cache.clone().or_else(|| base.cache.clone()),
            invalidate_cache: self.invalidate_cache.or(base.invalidate_cache),
            r#override: self.r#override.or(base.r#override),
            params: merge_maps(&base.params, &self.params, reserved),
            headers: merge_maps(&base.headers, &self.headers, reserved),
            before_request: self
                .before_request
                .clone()
                .or_else(|| base.before_request.clone()),
            after_request: self
                .after_request
                .clone()
                .or_else(|| base.after_request.clone()),
        }
    }

    /// Upper-cased method, `GET` when unset
    pub fn method_or_default(&self) -> String {
        self.method
            .as_deref()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "GET".to_string())
    }
}

fn merge_maps(
    base: &Option<Map<String, Value>>,
    own: &Option<Map<String, Value>>,
    reserved: &ReservedKeys,
) -> Option<Map<String, Value>> {
    match (base, own) {
        (None, None) => None,
        (Some(base), None) => Some(base.clone()),
        (base, Some(own)) => {
            let mut merged = base.clone().unwrap_or_default();
            extend_deep(&mut merged, own, reserved);
            Some(merged)
        }
    }
}

/// The default verbs every resource starts with
pub fn default_actions() -> BTreeMap<String, RequestAction> {
    let mut actions = BTreeMap::new();
    actions.insert(
        BASE_ACTION.to_string(),
        RequestAction::default()
            .with_wrap(true)
            .with_cache(CacheSetting::Disabled),
    );
    actions.insert("get".to_string(), RequestAction::new("GET"));
    actions.insert(
        "query".to_string(),
        RequestAction::new("GET").with_array(true),
    );
    actions.insert(
        "post".to_string(),
        RequestAction::new("POST").with_invalidate_cache(true),
    );
    actions.insert(
        "update".to_string(),
        RequestAction::new("PUT").with_invalidate_cache(true),
    );
    actions.insert(
        "delete".to_string(),
        RequestAction::new("DELETE").with_invalidate_cache(true),
    );
    actions
}
