#![deny(missing_docs)]

//! # Contract Registry
//!
//! In-memory map from URL pattern to the contracts of every method the route serves.
//! The registry is owned by a single writer (the controller, or a one-shot generate
//! run) and handed to the artifact generator by reference.

use crate::analyzer::AnalysisResult;
use crate::descriptor::SchemaDescriptor;
use crate::method::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Request contract of one (route, method) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDescriptor {
    /// JSON body shape. Never present for `GET` and `OPTIONS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<SchemaDescriptor>,
    /// URL placeholder values, all strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_params: Option<SchemaDescriptor>,
    /// Query string shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_params: Option<SchemaDescriptor>,
}

/// Every method served by one URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// The URL pattern, e.g. `/users/[id]`.
    pub pattern: String,
    /// The endpoint file this entry was derived from.
    pub source: PathBuf,
    /// Contracts keyed by method.
    pub methods: BTreeMap<Method, ContractDescriptor>,
}

/// URL pattern → route entry, with a generation counter that only moves when the
/// content does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    routes: BTreeMap<String, RouteEntry>,
    generation: u64,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `route_id`.
    ///
    /// Returns whether anything changed. Merging an identical result is a no-op.
    pub fn merge(&mut self, route_id: &str, result: AnalysisResult) -> bool {
        let entry = RouteEntry {
            pattern: route_id.to_string(),
            source: result.source,
            methods: result.methods,
        };
        if self.routes.get(route_id) == Some(&entry) {
            debug!(route = route_id, "analysis unchanged");
            return false;
        }
        self.routes.insert(route_id.to_string(), entry);
        self.generation += 1;
        true
    }

    /// Replaces every entry with `results`, as after a full scan.
    ///
    /// Routes missing from `results` are dropped. Returns whether anything changed.
    pub fn replace_all(&mut self, results: impl IntoIterator<Item = AnalysisResult>) -> bool {
        let routes: BTreeMap<String, RouteEntry> = results
            .into_iter()
            .map(|result| {
                let entry = RouteEntry {
                    pattern: result.route_id,
                    source: result.source,
                    methods: result.methods,
                };
                (entry.pattern.clone(), entry)
            })
            .collect();
        if routes == self.routes {
            return false;
        }
        self.routes = routes;
        self.generation += 1;
        true
    }

    /// Drops the entry derived from `source`. Returns whether one was removed.
    pub fn remove_source(&mut self, source: &Path) -> bool {
        let before = self.routes.len();
        self.routes.retain(|_, entry| entry.source != source);
        let removed = self.routes.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// The entry for a URL pattern.
    pub fn get(&self, pattern: &str) -> Option<&RouteEntry> {
        self.routes.get(pattern)
    }

    /// Entries in lexicographic pattern order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    /// Number of URL patterns.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route has been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Content generation; advances on every effective change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `(pattern, contract)` pairs served with `method`, by pattern.
    pub fn contracts_for(&self, method: Method) -> Vec<(&str, &ContractDescriptor)> {
        self.routes
            .values()
            .filter_map(|entry| {
                entry
                    .methods
                    .get(&method)
                    .map(|contract| (entry.pattern.as_str(), contract))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PrimitiveKind;
    use pretty_assertions::assert_eq;

    fn result(source: &str, methods: &[Method]) -> AnalysisResult {
        AnalysisResult {
            route_id: String::new(),
            source: PathBuf::from(source),
            methods: methods
                .iter()
                .map(|m| (*m, ContractDescriptor::default()))
                .collect(),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut registry = Registry::new();
        assert!(registry.merge("/a", result("a/server.rs", &[Method::Get])));
        assert_eq!(registry.generation(), 1);

        let snapshot = registry.clone();
        assert!(!registry.merge("/a", result("a/server.rs", &[Method::Get])));
        assert_eq!(registry, snapshot);
    }

    #[test]
    fn test_merge_replaces_whole_entry() {
        let mut registry = Registry::new();
        registry.merge("/a", result("a/server.rs", &[Method::Get, Method::Post]));
        registry.merge("/a", result("a/server.rs", &[Method::Delete]));

        let methods: Vec<_> = registry.get("/a").unwrap().methods.keys().copied().collect();
        assert_eq!(methods, vec![Method::Delete]);
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_remove_source() {
        let mut registry = Registry::new();
        registry.merge("/a", result("a/server.rs", &[Method::Get]));
        registry.merge("/b", result("b/server.rs", &[Method::Get]));

        assert!(registry.remove_source(Path::new("a/server.rs")));
        assert!(!registry.remove_source(Path::new("a/server.rs")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.generation(), 3);
    }

    #[test]
    fn test_replace_all_drops_missing_routes() {
        let routed = |id: &str, source: &str| AnalysisResult {
            route_id: id.to_string(),
            ..result(source, &[Method::Get])
        };
        let mut registry = Registry::new();
        registry.merge("/a", routed("/a", "a/server.rs"));
        registry.merge("/b", routed("/b", "b/server.rs"));

        assert!(registry.replace_all(vec![routed("/b", "b/server.rs")]));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("/a").is_none());
        assert_eq!(registry.generation(), 3);

        assert!(!registry.replace_all(vec![routed("/b", "b/server.rs")]));
        assert_eq!(registry.generation(), 3);
    }

    #[test]
    fn test_contracts_for_method() {
        let mut registry = Registry::new();
        let mut post = result("b/server.rs", &[Method::Post]);
        post.methods.get_mut(&Method::Post).unwrap().body =
            Some(SchemaDescriptor::primitive(PrimitiveKind::String));
        registry.merge("/b", post);
        registry.merge("/a", result("a/server.rs", &[Method::Get, Method::Post]));

        let patterns: Vec<_> = registry
            .contracts_for(Method::Post)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(patterns, vec!["/a", "/b"]);
        assert!(registry.contracts_for(Method::Put).is_empty());
    }
}
