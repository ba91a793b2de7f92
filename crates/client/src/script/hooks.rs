//! Named filter chains applied while generating the manifest and worker.
//!
//! Extensions register filters by id. A chain applies its filters in
//! registration order; adding an id that is already registered replaces that
//! filter in place.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Filters the web app manifest.
pub const MANIFEST: &str = "superpwa_manifest";

/// Filters the worker script filename.
pub const SW_FILENAME: &str = "superpwa_sw_filename";

/// Filters the rendered worker script.
pub const SW_TEMPLATE: &str = "superpwa_sw_template";

type Filter<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

/// An ordered list of filters over values of type `T`.
pub struct FilterChain<T> {
    filters: Vec<(String, Filter<T>)>,
}

impl<T> FilterChain<T> {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    pub fn add<F>(&mut self, id: impl Into<String>, filter: F)
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        let id = id.into();
        let filter: Filter<T> = Arc::new(filter);
        match self.filters.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = filter,
            None => self.filters.push((id, filter)),
        }
    }

    /// Returns false if no filter had this id.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(existing, _)| existing != id);
        self.filters.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.filters.iter().any(|(existing, _)| existing == id)
    }

    pub fn apply(&self, value: T) -> T {
        self.filters.iter().fold(value, |acc, (_, filter)| filter(acc))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FilterChain<T> {
    fn clone(&self) -> Self {
        Self { filters: self.filters.clone() }
    }
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// The three hook points of worker generation.
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    pub manifest: FilterChain<Value>,
    pub sw_filename: FilterChain<String>,
    pub sw_template: FilterChain<String>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook names paired with the filter ids registered on them.
    pub fn registered(&self) -> Vec<(&'static str, Vec<&str>)> {
        vec![
            (MANIFEST, self.manifest.ids().collect()),
            (SW_FILENAME, self.sw_filename.ids().collect()),
            (SW_TEMPLATE, self.sw_template.ids().collect()),
        ]
    }
}
