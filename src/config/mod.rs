// Resource configuration: file settings and runtime options

pub mod resource_settings;
pub mod resources;

pub use resource_settings::ResourceSettings;
pub use resources::{load_settings, ResourceOptions};
