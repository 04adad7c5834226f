//! Routing table construction and lookup.
//!
//! # Responsibilities
//! - Build a table from a desired-state list, skipping invalid entries
//! - Exact path lookup for dispatch
//! - Summarize loaded paths for introspection
//!
//! # Design Decisions
//! - Immutable after construction (shared between request tasks via Arc)
//! - Source order matters: the last entry registered for a path wins
//! - Ordered map so summaries are deterministic

use std::collections::BTreeMap;

use serde::Serialize;

use crate::routing::endpoint::{DesiredEndpoint, Endpoint};
use crate::routing::INFO_PATH;

/// Immutable snapshot mapping path to endpoint.
#[derive(Debug, Default)]
pub struct RoutingTable {
    endpoints: BTreeMap<String, Endpoint>,
    skipped: usize,
    generation: u64,
}

impl RoutingTable {
    /// Build a table from entries in source order.
    pub fn build(entries: &[DesiredEndpoint]) -> Self {
        let mut endpoints = BTreeMap::new();
        let mut skipped = 0;

        for entry in entries {
            let endpoint = match Endpoint::from_spec(&entry.spec) {
                Ok(endpoint) => endpoint,
                Err(error) => {
                    skipped += 1;
                    tracing::error!(
                        origin = %entry.origin,
                        path = %entry.spec.path,
                        error = %error,
                        "Validation failed, entry skipped"
                    );
                    continue;
                }
            };

            if endpoint.path() == INFO_PATH {
                tracing::warn!(
                    origin = %entry.origin,
                    path = %endpoint.path(),
                    "Endpoint is shadowed by the introspection route"
                );
            }

            tracing::debug!(
                origin = %entry.origin,
                path = %endpoint.path(),
                methods = ?endpoint.supported().names(),
                "Loaded path"
            );

            let path = endpoint.path().to_string();
            if endpoints.insert(path, endpoint).is_some() {
                tracing::warn!(
                    origin = %entry.origin,
                    path = %entry.spec.path,
                    "Duplicate path, last entry wins"
                );
            }
        }

        Self {
            endpoints,
            skipped,
            generation: 0,
        }
    }

    /// Stamp the generation before the table is published.
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn get(&self, path: &str) -> Option<&Endpoint> {
        self.endpoints.get(path)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of entries rejected during build.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn summary(&self) -> TableSummary {
        let endpoints: Vec<EndpointSummary> = self
            .endpoints
            .values()
            .map(|endpoint| EndpointSummary {
                path: endpoint.path().to_string(),
                methods: endpoint.supported().names(),
            })
            .collect();

        TableSummary {
            total: endpoints.len(),
            endpoints,
        }
    }
}

/// Body of the introspection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub endpoints: Vec<EndpointSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub path: String,
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use axum::http::{Method, StatusCode};

    use super::*;
    use crate::routing::endpoint::{EndpointSpec, MethodSpec};

    fn entry(origin: &str, path: &str, status_code: i32, body: &str) -> DesiredEndpoint {
        DesiredEndpoint::new(
            origin,
            EndpointSpec {
                path: path.to_string(),
                methods: vec![MethodSpec {
                    method: "GET".to_string(),
                    status_code,
                    body: body.to_string(),
                    headers: BTreeMap::new(),
                }],
            },
        )
    }

    #[test]
    fn test_path_set_matches_valid_input() {
        let entries = vec![
            entry("0", "/a", 200, ""),
            entry("1", "/b", 404, ""),
            entry("2", "/c/d", 503, ""),
        ];
        let table = RoutingTable::build(&entries);

        let built: BTreeSet<&str> = table.paths().collect();
        let declared: BTreeSet<&str> = entries.iter().map(|e| e.spec.path.as_str()).collect();
        assert_eq!(built, declared);
        assert_eq!(table.skipped(), 0);
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let entries = vec![
            entry("0", "/ok", 200, ""),
            entry("1", "", 200, ""),
            entry("2", "/bad-status", 700, ""),
            entry("3", "/also-ok", 204, ""),
        ];
        let table = RoutingTable::build(&entries);

        let built: Vec<&str> = table.paths().collect();
        assert_eq!(built, vec!["/also-ok", "/ok"]);
        assert_eq!(table.skipped(), 2);
    }

    #[test]
    fn test_duplicate_path_last_wins() {
        let entries = vec![
            entry("first", "/dup", 200, "first"),
            entry("other", "/other", 200, ""),
            entry("second", "/dup", 201, "second"),
        ];
        let table = RoutingTable::build(&entries);

        assert_eq!(table.len(), 2);
        let responder = table
            .get("/dup")
            .and_then(|e| e.method_from_request(&Method::GET))
            .unwrap();
        assert_eq!(responder.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_invalid_duplicate_does_not_evict_valid_one() {
        let entries = vec![entry("first", "/dup", 200, ""), entry("second", "/dup", 42, "")];
        let table = RoutingTable::build(&entries);

        let responder = table
            .get("/dup")
            .and_then(|e| e.method_from_request(&Method::GET))
            .unwrap();
        assert_eq!(responder.status(), StatusCode::OK);
    }

    #[test]
    fn test_summary_sorted_by_path() {
        let entries = vec![entry("0", "/z", 200, ""), entry("1", "/a", 200, "")];
        let summary = RoutingTable::build(&entries).summary();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.endpoints[0].path, "/a");
        assert_eq!(summary.endpoints[1].methods, vec!["GET"]);
    }
}
