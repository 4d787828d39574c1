// src/core/mod.rs
mod engine;
mod parser;
mod markers;
mod structure;
mod modules;
mod project_scanner;
mod overview;

// Entry points, service graph, tracing and diagrams
mod call_graph;

// Language-specific parsers
mod languages;

pub use parser::{CodeParser, ClassRecord, MethodRecord, FieldRecord, AnnotationRecord, Annotated};
pub use markers::{MarkerTable, MarkerRole, ROUTE_MAPPINGS, clean_attribute_value};
pub use structure::{ProjectStructure, ModuleDescriptor, ProjectStatistics};
pub use modules::{ModuleReader, MavenModuleReader, PomSummary, parse_pom};
pub use project_scanner::{ProjectScanner, scan_project};
pub use overview::{
    OverviewScanner, ProjectOverview, OverviewModule, PackageSummary, Feature, DataModel,
    infer_purpose, to_snake_case
};

pub use call_graph::{
    EntryPointDetector, EntryPoint, EntryType,
    EntryPointFinder, EntryPointMatch, RELEVANCE_THRESHOLD, find_entry_points,
    DependencyType, ServiceNode, ServiceDependency, ServiceDependencyGraph,
    ServiceGraphBuilder, build_dependency_graph,
    CallChainTracer, CallChain, CallNode, CallType, DEFAULT_MAX_DEPTH, chain_id, trace_call_chain,
    SequenceDiagramRenderer, render_sequence_diagram
};

// Export the main engine
pub use engine::Engine;
