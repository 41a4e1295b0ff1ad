// Compiled template cache keyed by the raw template string

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::ast::Template;
use super::parser::TemplateParser;

/// Templates are immutable once compiled, so one compilation can be shared
/// by every expansion and match of the same string.
#[derive(Debug, Default)]
pub struct TemplateCache {
    compiled: Mutex<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, raw: &str) -> Arc<Template> {
        let mut compiled = self.compiled.lock();
        if let Some(template) = compiled.get(raw) {
            return Arc::clone(template);
        }
        let template = Arc::new(TemplateParser::parse(raw));
        compiled.insert(raw.to_string(), Arc::clone(&template));
        template
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_string_compiles_once() {
        let cache = TemplateCache::new();
        let first = cache.get_or_compile("/api/zoo/{id}");
        let second = cache.get_or_compile("/api/zoo/{id}");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_strings_are_cached_separately() {
        let cache = TemplateCache::new();
        assert!(cache.is_empty());
        cache.get_or_compile("/api/zoo/{id}");
        cache.get_or_compile("/api/zoo{?type}");
        assert_eq!(cache.len(), 2);
    }
}
