// src/core/call_graph/call_chain_tracer.rs
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use super::entry_point_detector::EntryPoint;
use super::service_graph::{DependencyType, ServiceDependencyGraph};
use super::super::markers::MarkerTable;
use super::super::parser::{calculate_hash, ClassRecord, MethodRecord};
use super::super::structure::ProjectStructure;

/// Default bound on how far below the entry method a trace descends
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Traces execution paths from an entry method through local and remote calls
pub struct CallChainTracer {
    /// Maximum depth to trace (prevents runaway expansion)
    max_depth: usize,
    markers: MarkerTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    /// Method of the same service
    Local,
    /// Dubbo RPC into another service
    Dubbo,
    /// Declarative HTTP client into another service
    Feign,
    /// Message published to a queue
    Mq,
}

impl From<DependencyType> for CallType {
    fn from(dependency_type: DependencyType) -> Self {
        match dependency_type {
            DependencyType::Dubbo => CallType::Dubbo,
            DependencyType::Feign | DependencyType::Http => CallType::Feign,
            DependencyType::Mq => CallType::Mq,
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallType::Local => "LOCAL",
            CallType::Dubbo => "DUBBO",
            CallType::Feign => "FEIGN",
            CallType::Mq => "MQ",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    /// Service the method runs in; `None` for an unresolved remote target
    pub service: Option<String>,
    /// Owning class FQCN, or the interface FQCN for remote calls
    pub class_name: String,
    /// Method signature for local nodes, `name()` for remote ones
    pub method: String,
    pub call_type: CallType,
    /// Depth below the entry method (0 = entry point)
    pub depth: usize,
    pub children: Vec<CallNode>,
}

impl CallNode {
    fn local(service: &str, class: &ClassRecord, method: &MethodRecord, depth: usize) -> Self {
        Self {
            service: Some(service.to_string()),
            class_name: class.full_class_name.clone(),
            method: method.signature.clone(),
            call_type: CallType::Local,
            depth,
            children: Vec::new(),
        }
    }

    /// Method name without its parameter list
    pub fn method_name(&self) -> &str {
        self.method.split('(').next().unwrap_or(&self.method)
    }

    /// Edges on the longest path down from this node
    pub fn height(&self) -> usize {
        self.children.iter().map(|c| c.height() + 1).max().unwrap_or(0)
    }

    fn collect<'a>(&'a self, nodes: &mut Vec<&'a CallNode>) {
        nodes.push(self);
        for child in &self.children {
            child.collect(nodes);
        }
    }
}

/// One traced flow, rooted at an entry method.
///
/// Serializes as the nested `root` tree only. The flattened pre-order list is
/// derived on demand through [`CallChain::nodes`] and is not part of the
/// serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallChain {
    pub chain_id: String,
    pub entry_point: EntryPoint,
    /// `None` when the entry class or method could not be found
    pub root: Option<CallNode>,
}

impl CallChain {
    /// All nodes in pre-order
    pub fn nodes(&self) -> Vec<&CallNode> {
        let mut nodes = Vec::new();
        if let Some(root) = &self.root {
            root.collect(&mut nodes);
        }
        nodes
    }

    /// Edge count of the longest root-to-leaf path
    pub fn max_depth(&self) -> usize {
        self.root.as_ref().map_or(0, CallNode::height)
    }
}

/// Stable id for a chain: same entry point, same id
pub fn chain_id(entry_point: &EntryPoint) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        entry_point.entry_type,
        entry_point.class_name,
        entry_point.method_signature,
        entry_point.path.as_deref().unwrap_or("")
    );
    calculate_hash(&key)[..16].to_string()
}

/// Per-trace state; the path holds (class, method) keys of the current DFS branch
struct TraceContext<'a> {
    structure: &'a ProjectStructure,
    graph: &'a ServiceDependencyGraph,
    path: Vec<(String, String)>,
}

impl CallChainTracer {
    pub fn new(max_depth: usize, markers: MarkerTable) -> Self {
        Self { max_depth, markers }
    }

    pub fn trace(&self, entry_point: &EntryPoint, structure: &ProjectStructure, graph: &ServiceDependencyGraph) -> CallChain {
        info!("Tracing {} (max depth {})", entry_point.display_name(), self.max_depth);

        let mut chain = CallChain {
            chain_id: chain_id(entry_point),
            entry_point: entry_point.clone(),
            root: None,
        };

        if structure.get_class(&entry_point.class_name).is_none() {
            warn!("Entry class {} not found in {}", entry_point.class_name, structure.project_name);
            return chain;
        }
        let Some((class, method)) = structure.resolve_entry_point(entry_point) else {
            warn!("Entry method {}.{} not found", entry_point.class_name, entry_point.method_name);
            return chain;
        };

        let mut ctx = TraceContext {
            structure,
            graph,
            path: Vec::new(),
        };
        chain.root = Some(self.expand(&mut ctx, class, method, 0));

        info!(
            "Traced {}: {} nodes, depth {}",
            chain.chain_id,
            chain.nodes().len(),
            chain.max_depth()
        );
        chain
    }

    fn expand(&self, ctx: &mut TraceContext<'_>, class: &ClassRecord, method: &MethodRecord, depth: usize) -> CallNode {
        let mut node = CallNode::local(&ctx.structure.project_name, class, method, depth);
        if depth >= self.max_depth {
            return node;
        }

        ctx.path.push((class.full_class_name.clone(), method.name.clone()));

        for call in &method.called_methods {
            if let Some(remote) = self.remote_call(ctx, class, call, depth + 1) {
                node.children.push(remote);
                continue;
            }

            let name = called_method_name(call);
            let structure = ctx.structure;
            let Some((next_class, next_method)) = structure.find_method_owner(name) else {
                continue;
            };

            let on_path = ctx.path.iter().any(|(c, m)| {
                c == &next_class.full_class_name && m == &next_method.name
            });
            if on_path {
                debug!("Cycle at {}.{}, not expanding", next_class.full_class_name, next_method.name);
                continue;
            }

            node.children.push(self.expand(ctx, next_class, next_method, depth + 1));
        }

        ctx.path.pop();
        node
    }

    /// Child node for a call through a remote-reference field, if `call` is one
    fn remote_call(&self, ctx: &TraceContext<'_>, class: &ClassRecord, call: &str, depth: usize) -> Option<CallNode> {
        let (receiver, _) = call.split_once('.')?;
        let field = class.find_field(receiver)?;
        self.markers.reference_kind(field)?;

        let dependency = ctx.graph.find_field_dependency(
            &ctx.structure.project_name,
            &class.full_class_name,
            &field.name,
        )?;

        Some(CallNode {
            service: dependency.target_service.clone(),
            class_name: dependency.interface_name.clone(),
            method: format!("{}()", called_method_name(call)),
            call_type: dependency.dependency_type.into(),
            depth,
            children: Vec::new(),
        })
    }
}

impl Default for CallChainTracer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, MarkerTable::default())
    }
}

/// Simple method name of a call expression: `a.b.save(x)` -> `save`
fn called_method_name(call: &str) -> &str {
    let last = call.rsplit('.').next().unwrap_or(call);
    last.split('(').next().unwrap_or(last)
}

/// Trace with the default marker table
pub fn trace_call_chain(
    entry_point: &EntryPoint,
    structure: &ProjectStructure,
    graph: &ServiceDependencyGraph,
    max_depth: usize,
) -> CallChain {
    CallChainTracer::new(max_depth, MarkerTable::default()).trace(entry_point, structure, graph)
}
