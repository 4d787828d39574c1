// src/core/call_graph/service_graph.rs
//! Cross-service dependency graph
//!
//! Every scanned project is one deployable service. Provider classes tell us
//! which interfaces a service exposes; remote-reference fields tell us which
//! interfaces it consumes. Joining the two gives service-to-service edges.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use super::super::markers::{MarkerRole, MarkerTable};
use super::super::structure::ProjectStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    /// Dubbo RPC reference
    Dubbo,
    /// Declarative HTTP client
    Feign,
    /// Plain HTTP client call
    Http,
    /// Message queue
    Mq,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DependencyType::Dubbo => "DUBBO",
            DependencyType::Feign => "FEIGN",
            DependencyType::Http => "HTTP",
            DependencyType::Mq => "MQ",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub service_name: String,
    /// Fully-qualified interfaces this service exposes, first-seen order
    pub provided_interfaces: Vec<String>,
    /// Fully-qualified interfaces this service references remotely
    pub required_interfaces: Vec<String>,
}

impl ServiceNode {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn add_provided_interface(&mut self, interface_name: String) {
        if !self.provided_interfaces.contains(&interface_name) {
            self.provided_interfaces.push(interface_name);
        }
    }

    pub fn add_required_interface(&mut self, interface_name: String) {
        if !self.required_interfaces.contains(&interface_name) {
            self.required_interfaces.push(interface_name);
        }
    }
}

/// One remote-reference field and what it resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDependency {
    pub source_service: String,
    /// `None` when no scanned service provides the interface
    pub target_service: Option<String>,
    pub interface_name: String,
    pub dependency_type: DependencyType,
    pub source_class: String,
    pub source_field: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceDependencyGraph {
    services: BTreeMap<String, ServiceNode>,
    /// interface FQCN -> providing service name
    interface_index: HashMap<String, String>,
    dependencies: Vec<ServiceDependency>,
}

impl ServiceDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service and index its provided interfaces. A later provider of
    /// an already indexed interface takes over the index entry.
    pub fn add_service(&mut self, service: ServiceNode) {
        for interface_name in &service.provided_interfaces {
            if let Some(previous) = self.interface_index.get(interface_name) {
                if previous != &service.service_name {
                    warn!(
                        "Interface {} is provided by both {} and {}, using {}",
                        interface_name, previous, service.service_name, service.service_name
                    );
                }
            }
            self.interface_index.insert(interface_name.clone(), service.service_name.clone());
        }
        self.services.insert(service.service_name.clone(), service);
    }

    pub fn add_dependency(&mut self, dependency: ServiceDependency) {
        if let Some(node) = self.services.get_mut(&dependency.source_service) {
            node.add_required_interface(dependency.interface_name.clone());
        }
        self.dependencies.push(dependency);
    }

    /// All dependencies declared by `service_name`, in discovery order
    pub fn find_dependencies(&self, service_name: &str) -> Vec<&ServiceDependency> {
        self.dependencies
            .iter()
            .filter(|d| d.source_service == service_name)
            .collect()
    }

    pub fn find_service_by_interface(&self, interface_name: &str) -> Option<&ServiceNode> {
        self.interface_index
            .get(interface_name)
            .and_then(|name| self.services.get(name))
    }

    pub fn get_service(&self, service_name: &str) -> Option<&ServiceNode> {
        self.services.get(service_name)
    }

    /// The dependency recorded for one field of one class in one service
    pub fn find_field_dependency(&self, service_name: &str, class_name: &str, field_name: &str) -> Option<&ServiceDependency> {
        self.dependencies.iter().find(|d| {
            d.source_service == service_name && d.source_class == class_name && d.source_field == field_name
        })
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceNode> {
        self.services.values()
    }

    pub fn dependencies(&self) -> &[ServiceDependency] {
        &self.dependencies
    }
}

/// Builds the dependency graph from independently scanned projects
pub struct ServiceGraphBuilder {
    markers: MarkerTable,
}

impl ServiceGraphBuilder {
    pub fn new(markers: MarkerTable) -> Self {
        Self { markers }
    }

    pub fn build(&self, structures: &[ProjectStructure]) -> ServiceDependencyGraph {
        info!("Building service dependency graph for {} projects", structures.len());
        let mut graph = ServiceDependencyGraph::new();

        // Providers must all be indexed before any reference is resolved
        for structure in structures {
            let node = self.service_node(structure);
            debug!(
                "Service {} provides {} interfaces",
                node.service_name,
                node.provided_interfaces.len()
            );
            graph.add_service(node);
        }

        for structure in structures {
            self.collect_dependencies(structure, &mut graph);
        }

        info!(
            "Service graph complete: {} services, {} dependencies",
            graph.services.len(),
            graph.dependencies.len()
        );
        graph
    }

    fn service_node(&self, structure: &ProjectStructure) -> ServiceNode {
        let mut node = ServiceNode::new(structure.project_name.clone());

        for class in structure.classes() {
            if !self.markers.carries(class, MarkerRole::Provider) {
                continue;
            }
            for interface_name in &class.interfaces {
                node.add_provided_interface(class.resolve_type_name(interface_name));
            }
        }

        node
    }

    fn collect_dependencies(&self, structure: &ProjectStructure, graph: &mut ServiceDependencyGraph) {
        let service_name = &structure.project_name;

        for class in structure.classes() {
            for field in &class.fields {
                let Some(dependency_type) = self.markers.reference_kind(field) else {
                    continue;
                };

                let interface_name = class.resolve_type_name(&field.field_type);
                let target_service = graph
                    .find_service_by_interface(&interface_name)
                    .map(|node| node.service_name.clone());

                debug!(
                    "{} dependency {} -> {} ({})",
                    dependency_type,
                    service_name,
                    interface_name,
                    target_service.as_deref().unwrap_or("unresolved")
                );

                graph.add_dependency(ServiceDependency {
                    source_service: service_name.clone(),
                    target_service,
                    interface_name,
                    dependency_type,
                    source_class: class.full_class_name.clone(),
                    source_field: field.name.clone(),
                });
            }
        }
    }
}

impl Default for ServiceGraphBuilder {
    fn default() -> Self {
        Self::new(MarkerTable::default())
    }
}

/// Build a dependency graph with the default marker table
pub fn build_dependency_graph(structures: &[ProjectStructure]) -> ServiceDependencyGraph {
    ServiceGraphBuilder::default().build(structures)
}
