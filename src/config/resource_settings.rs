use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::{merge::ReservedKeys, RequestAction};

fn default_pk() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

/// File form of one resource: the URL template, its actions and how
/// responses are shaped.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSettings {
    pub url: String,
    /// Absolute URL relative resource URLs are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default = "default_pk")]
    pub pk: String,
    #[serde(default = "default_true")]
    pub strip_trailing_slashes: bool,
    /// Values filled into wrapped entities that lack the field
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    /// Field renames, entity field -> response field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rename: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, RequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_keys: Option<ReservedKeys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ResourceSettings {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            base_url: None,
            prefix: String::new(),
            pk: default_pk(),
            strip_trailing_slashes: true,
            defaults: Map::new(),
            rename: BTreeMap::new(),
            actions: BTreeMap::new(),
            reserved_keys: None,
            timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde() {
        let settings = ResourceSettings::new("api/zoo");

        let yml = serde_yaml::to_string(&settings).unwrap();
        let deserde: ResourceSettings = serde_yaml::from_str(&yml).unwrap();
        assert_eq!(deserde.url, "api/zoo");
        assert_eq!(deserde.pk, "id");
        assert!(deserde.strip_trailing_slashes);
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let settings: ResourceSettings = serde_yaml::from_str("url: api/zoo\n").unwrap();
        assert_eq!(settings.pk, "id");
        assert!(settings.strip_trailing_slashes);
        assert!(settings.prefix.is_empty());
        assert!(settings.actions.is_empty());
        assert!(settings.reserved_keys.is_none());
    }

    #[test]
    fn test_skip_empty_fields_in_yaml() {
        let settings = ResourceSettings::new("api/zoo");

        let yml = serde_yaml::to_string(&settings).unwrap();

        assert!(!yml.contains("baseUrl:"));
        assert!(!yml.contains("prefix:"));
        assert!(!yml.contains("actions:"));
        assert!(!yml.contains("reservedKeys:"));

        assert!(yml.contains("url:"));
        assert!(yml.contains("pk:"));
    }

    #[test]
    fn test_full_yaml() {
        let yml = r#"
url: api/zoo
baseUrl: https://example.com
prefix: v1
pk: zooId
stripTrailingSlashes: false
defaults:
  status: open
rename:
  zooId: id
reservedKeys: ["$pending", "secret"]
timeoutSecs: 5
actions:
  animals:
    method: GET
    url: "{zooId}/animals"
    isArray: true
  update:
    method: PATCH
"#;
        let settings: ResourceSettings = serde_yaml::from_str(yml).unwrap();
        assert_eq!(settings.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(settings.prefix, "v1");
        assert_eq!(settings.pk, "zooId");
        assert!(!settings.strip_trailing_slashes);
        assert_eq!(settings.rename["zooId"], "id");
        assert_eq!(settings.timeout_secs, Some(5));
        assert!(settings.reserved_keys.unwrap().contains("secret"));
        assert_eq!(settings.actions["animals"].is_array, Some(true));
        assert_eq!(settings.actions["update"].method.as_deref(), Some("PATCH"));
    }

    #[test]
    fn test_include_some_fields_in_json() {
        let mut settings = ResourceSettings::new("api/zoo");
        settings.base_url = Some("https://example.com".to_string());

        let json = serde_json::to_string(&settings).unwrap();

        assert!(json.contains("\"baseUrl\""));
        assert!(!json.contains("\"timeoutSecs\""));
    }
}
