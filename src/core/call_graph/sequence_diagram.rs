// src/core/call_graph/sequence_diagram.rs
//! Mermaid sequence diagrams for traced call chains

use tracing::debug;

use super::call_chain_tracer::{CallChain, CallNode, CallType};

const UNKNOWN_SERVICE: &str = "Unknown";
const MQ_PARTICIPANT: &str = "MQ";

/// Renders a `CallChain` as a Mermaid `sequenceDiagram`
pub struct SequenceDiagramRenderer {
    /// Synthetic participant that issues the entry request
    caller: String,
}

impl SequenceDiagramRenderer {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
        }
    }

    pub fn render(&self, chain: &CallChain) -> String {
        let mut diagram = String::from("sequenceDiagram\n");
        diagram.push_str(&format!("    participant {}\n", self.caller));

        let Some(root) = &chain.root else {
            return diagram;
        };

        for participant in participants(root) {
            diagram.push_str(&format!("    participant {}\n", participant));
        }
        diagram.push('\n');

        let root_service = service_label(root);
        let request = chain.entry_point.path.as_deref().unwrap_or(&chain.entry_point.method_name);
        diagram.push_str(&format!("    {}->>{}: {}\n", self.caller, root_service, request));

        render_children(root, root_service, &mut diagram);

        diagram.push_str(&format!("    {}-->>{}: response\n", root_service, self.caller));

        debug!("Rendered diagram for {} ({} bytes)", chain.chain_id, diagram.len());
        diagram
    }
}

impl Default for SequenceDiagramRenderer {
    fn default() -> Self {
        Self::new("Client")
    }
}

fn service_label(node: &CallNode) -> &str {
    node.service.as_deref().unwrap_or(UNKNOWN_SERVICE)
}

/// Distinct services in pre-order, then `MQ` if any node is a queue hop
fn participants(root: &CallNode) -> Vec<&str> {
    fn walk<'a>(node: &'a CallNode, seen: &mut Vec<&'a str>, has_mq: &mut bool) {
        let label = service_label(node);
        if !seen.contains(&label) {
            seen.push(label);
        }
        *has_mq |= node.call_type == CallType::Mq;
        for child in &node.children {
            walk(child, seen, has_mq);
        }
    }

    let mut seen = Vec::new();
    let mut has_mq = false;
    walk(root, &mut seen, &mut has_mq);
    if has_mq {
        seen.push(MQ_PARTICIPANT);
    }
    seen
}

fn render_children(node: &CallNode, current: &str, diagram: &mut String) {
    for child in &node.children {
        let target = service_label(child);
        match child.call_type {
            CallType::Local => {
                diagram.push_str(&format!("    Note over {}: {}()\n", current, child.method_name()));
                render_children(child, current, diagram);
            }
            CallType::Dubbo | CallType::Feign => {
                let tag = if child.call_type == CallType::Dubbo { "[Dubbo]" } else { "[Feign]" };
                let interface = child.class_name.rsplit('.').next().unwrap_or(&child.class_name);
                diagram.push_str(&format!(
                    "    {}->>{}: {} {}.{}()\n",
                    current, target, tag, interface, child.method_name()
                ));
                diagram.push_str(&format!("    {}-->>{}: return\n", target, current));
            }
            CallType::Mq => {
                diagram.push_str(&format!("    {}->>{}: send\n", current, MQ_PARTICIPANT));
                diagram.push_str(&format!("    {}->>{}: deliver\n", MQ_PARTICIPANT, target));
            }
        }
    }
}

/// Render with the default `Client` caller
pub fn render_sequence_diagram(chain: &CallChain) -> String {
    SequenceDiagramRenderer::default().render(chain)
}
