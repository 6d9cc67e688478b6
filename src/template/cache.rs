use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, OnceLock, RwLock},
};

use anyhow::Context;

use crate::{
    foundation::error::{PhotoslotError, PhotoslotResult},
    template::model::Template,
};

#[derive(Debug, Default)]
/// Shared read-only template store.
///
/// Entries are whole `Arc<Template>` values: an update validates the new
/// template first and then replaces the pointer, so readers holding an older
/// `Arc` keep a consistent template for the rest of their request.
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

static GLOBAL: OnceLock<TemplateCache> = OnceLock::new();

impl TemplateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache instance.
    pub fn global() -> &'static TemplateCache {
        GLOBAL.get_or_init(TemplateCache::new)
    }

    /// Parse, validate, and publish a template from JSON.
    pub fn load_json(&self, json: &str) -> PhotoslotResult<Arc<Template>> {
        let template = Template::from_json(json)?;
        self.insert(template)
    }

    /// Read a template JSON file and publish it.
    pub fn load_file(&self, path: &Path) -> PhotoslotResult<Arc<Template>> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read template '{}'", path.display()))?;
        self.load_json(&json)
    }

    /// Validate and publish a template, replacing any entry with the same id.
    pub fn insert(&self, template: Template) -> PhotoslotResult<Arc<Template>> {
        template.validate()?;
        let template = Arc::new(template);
        let previous = self
            .write_entries()?
            .insert(template.template_id.clone(), Arc::clone(&template));
        if previous.is_some() {
            tracing::debug!(template_id = %template.template_id, "replaced cached template");
        }
        Ok(template)
    }

    /// Fetch a template by id.
    pub fn get(&self, template_id: &str) -> PhotoslotResult<Option<Arc<Template>>> {
        Ok(self.read_entries()?.get(template_id).cloned())
    }

    /// Remove a template, returning it if present.
    pub fn remove(&self, template_id: &str) -> PhotoslotResult<Option<Arc<Template>>> {
        Ok(self.write_entries()?.remove(template_id))
    }

    /// Cached template ids in sorted order.
    pub fn ids(&self) -> PhotoslotResult<Vec<String>> {
        let mut ids: Vec<String> = self.read_entries()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn read_entries(
        &self,
    ) -> PhotoslotResult<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Template>>>> {
        self.entries
            .read()
            .map_err(|_| PhotoslotError::Other(anyhow::anyhow!("template cache lock poisoned")))
    }

    fn write_entries(
        &self,
    ) -> PhotoslotResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Template>>>> {
        self.entries
            .write()
            .map_err(|_| PhotoslotError::Other(anyhow::anyhow!("template cache lock poisoned")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/cache.rs"]
mod tests;
