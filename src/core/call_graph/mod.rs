// src/core/call_graph/mod.rs
//! Entry-point discovery and call-chain tracing
//!
//! Detected entry points are ranked by keyword, joined across services
//! through the dependency graph, traced into call trees and rendered as
//! sequence diagrams.

mod entry_point_detector;
mod entry_point_finder;
mod service_graph;
mod call_chain_tracer;
mod sequence_diagram;

pub use entry_point_detector::{EntryPointDetector, EntryPoint, EntryType};
pub use entry_point_finder::{EntryPointFinder, EntryPointMatch, RELEVANCE_THRESHOLD, find_entry_points};
pub use service_graph::{
    DependencyType, ServiceNode, ServiceDependency, ServiceDependencyGraph,
    ServiceGraphBuilder, build_dependency_graph
};
pub use call_chain_tracer::{
    CallChainTracer, CallChain, CallNode, CallType, DEFAULT_MAX_DEPTH,
    chain_id, trace_call_chain
};
pub use sequence_diagram::{SequenceDiagramRenderer, render_sequence_diagram};
