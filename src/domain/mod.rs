// Domain model: URI templates, action configuration, and response shaping

pub mod action;
pub mod entity;
pub mod merge;
pub mod template;

pub use action::{AfterRequest, BeforeRequest, CacheSetting, RequestAction};
pub use entity::{Entity, EntityList, EntityShape, FieldMapping, FieldTransform};
pub use merge::ReservedKeys;
pub use template::{Template, TemplateCache, TemplateExpander, TemplateMatcher, TemplateParser};
