// src/core/markers.rs
//! Annotation marker lookup table
//!
//! Classification and dependency detection never inspect annotations by
//! hand-written string comparisons; they ask this table which role an
//! annotation plays.

use serde::{Serialize, Deserialize};

use crate::config::MarkerConfig;
use super::parser::{Annotated, AnnotationRecord, FieldRecord};
use super::call_graph::DependencyType;

/// What a recognized annotation means to the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerRole {
    /// Class exposes HTTP routes
    Controller,
    /// Class is a remotely exposed service implementation
    Provider,
    /// Method runs on a schedule
    Scheduled,
    /// Method consumes a message queue
    MqListener,
    /// Field is an injected RPC reference
    RpcReference,
    /// Field is a declarative HTTP client
    HttpClient,
}

/// Route annotations and the verb they imply. `None` means the verb comes
/// from the annotation's `method` attribute, defaulting to GET.
pub const ROUTE_MAPPINGS: &[(&str, Option<&str>)] = &[
    ("RequestMapping", None),
    ("GetMapping", Some("GET")),
    ("PostMapping", Some("POST")),
    ("PutMapping", Some("PUT")),
    ("DeleteMapping", Some("DELETE")),
    ("PatchMapping", Some("PATCH")),
];

/// Marker names grouped by role
#[derive(Debug, Clone)]
pub struct MarkerTable {
    entries: Vec<(String, MarkerRole)>,
}

impl MarkerTable {
    pub fn from_config(config: &MarkerConfig) -> Self {
        let groups = [
            (&config.controller, MarkerRole::Controller),
            (&config.provider, MarkerRole::Provider),
            (&config.scheduled, MarkerRole::Scheduled),
            (&config.mq_listener, MarkerRole::MqListener),
            (&config.rpc_reference, MarkerRole::RpcReference),
            (&config.http_client, MarkerRole::HttpClient),
        ];

        let entries = groups
            .iter()
            .flat_map(|(names, role)| names.iter().map(move |n| (n.clone(), *role)))
            .collect();

        Self { entries }
    }

    /// All marker names registered for a role
    pub fn names(&self, role: MarkerRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Whether this annotation is registered under the given role
    pub fn is(&self, annotation: &AnnotationRecord, role: MarkerRole) -> bool {
        self.entries
            .iter()
            .any(|(name, r)| *r == role && annotation.matches(name))
    }

    /// First annotation on `item` that plays the given role
    pub fn find<'a, T: Annotated>(&self, item: &'a T, role: MarkerRole) -> Option<&'a AnnotationRecord> {
        item.find_annotation(&self.names(role))
    }

    pub fn carries<T: Annotated>(&self, item: &T, role: MarkerRole) -> bool {
        self.find(item, role).is_some()
    }

    /// Dependency kind for a remote-reference field, if it is one
    pub fn reference_kind(&self, field: &FieldRecord) -> Option<DependencyType> {
        if self.carries(field, MarkerRole::RpcReference) {
            Some(DependencyType::Dubbo)
        } else if self.carries(field, MarkerRole::HttpClient) {
            Some(DependencyType::Feign)
        } else {
            None
        }
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::from_config(&MarkerConfig::default())
    }
}

/// Strip quotes and braces from raw annotation text
pub fn clean_attribute_value(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '{' | '}'))
        .collect::<String>()
        .trim()
        .to_string()
}
