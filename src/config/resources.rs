use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::{
    config::resource_settings::ResourceSettings,
    domain::{
        action::default_actions,
        entity::{EntityShape, FieldMapping},
        merge::ReservedKeys,
        RequestAction,
    },
};

const DEFAULT_CONFIG_FILE: &str = "resource.yml";

/// Runtime options of a resource. Unlike [`ResourceSettings`] these can carry
/// hooks and computed field mappings.
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub prefix: String,
    pub pk: String,
    pub strip_trailing_slashes: bool,
    pub actions: BTreeMap<String, RequestAction>,
    pub shape: Arc<EntityShape>,
    pub reserved: ReservedKeys,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            pk: "id".to_string(),
            strip_trailing_slashes: true,
            actions: default_actions(),
            shape: Arc::new(EntityShape::default()),
            reserved: ReservedKeys::default(),
        }
    }
}

impl ResourceOptions {
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_pk(mut self, pk: &str) -> Self {
        self.pk = pk.to_string();
        self
    }

    pub fn with_strip_trailing_slashes(mut self, strip: bool) -> Self {
        self.strip_trailing_slashes = strip;
        self
    }

    pub fn with_shape(mut self, shape: EntityShape) -> Self {
        self.shape = Arc::new(shape);
        self
    }

    pub fn with_reserved(mut self, reserved: ReservedKeys) -> Self {
        self.reserved = reserved;
        self
    }

    /// Add an action; one with the name of an existing action is layered over it
    pub fn with_action(mut self, name: &str, action: RequestAction) -> Self {
        let action = match self.actions.get(name) {
            Some(existing) => action.merged_over(existing, &self.reserved),
            None => action,
        };
        self.actions.insert(name.to_string(), action);
        self
    }
}

impl From<&ResourceSettings> for ResourceOptions {
    fn from(settings: &ResourceSettings) -> Self {
        let mut shape = EntityShape::new().with_defaults(settings.defaults.clone());
        for (field, source_key) in &settings.rename {
            shape = shape.with_mapping(
                field,
                FieldMapping::Rename {
                    source_key: source_key.clone(),
                },
            );
        }

        let mut options = ResourceOptions::default()
            .with_prefix(&settings.prefix)
            .with_pk(&settings.pk)
            .with_strip_trailing_slashes(settings.strip_trailing_slashes)
            .with_shape(shape);
        if let Some(reserved) = &settings.reserved_keys {
            options = options.with_reserved(reserved.clone());
        }
        for (name, action) in &settings.actions {
            options = options.with_action(name, action.clone());
        }
        options
    }
}

/// Read resource settings from YAML, or JSON when the file ends in `.json`
pub fn load_settings(path: Option<&str>) -> anyhow::Result<ResourceSettings> {
    let path = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read file {}", path.display()))?;

    let settings = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid json configuration in {}", path.display()))?,
        _ => serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid yaml configuration in {}", path.display()))?,
    };
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_options() {
        let options = ResourceOptions::default();
        assert_eq!(options.pk, "id");
        assert!(options.strip_trailing_slashes);
        assert_eq!(options.actions.len(), 6);
    }

    #[test]
    fn test_with_action_layers_over_default() {
        let options =
            ResourceOptions::default().with_action("update", RequestAction::new("PATCH"));
        let update = &options.actions["update"];
        assert_eq!(update.method.as_deref(), Some("PATCH"));
        assert_eq!(update.invalidate_cache, Some(true));
    }

    #[test]
    fn test_from_settings() {
        let yml = r#"
url: api/zoo
pk: zooId
defaults:
  status: open
rename:
  zooId: id
actions:
  animals:
    url: "{zooId}/animals"
    isArray: true
"#;
        let settings: ResourceSettings = serde_yaml::from_str(yml).unwrap();
        let options = ResourceOptions::from(&settings);

        assert_eq!(options.pk, "zooId");
        assert_eq!(options.actions.len(), 7);
        assert_eq!(options.actions["animals"].is_array, Some(true));

        let entity = options.shape.entity(json!({"id": 4}));
        assert_eq!(entity.as_value(), &json!({"status": "open", "zooId": 4}));
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings(Some("/nonexistent/resource.yml")).unwrap_err();
        assert!(err.to_string().contains("Could not read file"));
    }

    #[test]
    fn test_load_settings_json() {
        let path = std::env::temp_dir().join("modelfactory_load_settings_test.json");
        std::fs::write(&path, r#"{"url": "api/zoo", "pk": "zooId"}"#).unwrap();

        let settings = load_settings(path.to_str()).unwrap();
        assert_eq!(settings.url, "api/zoo");
        assert_eq!(settings.pk, "zooId");

        std::fs::remove_file(&path).unwrap();
    }
}
