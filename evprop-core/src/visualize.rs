//! Graphviz DOT visualization of the event graph.
//!
//! - listeners are boxes, events are ellipses
//! - listener → event edges mean "creates"
//! - event → listener edges mean "subscribes", labelled with the tier
//!   (the normal tier is unlabelled)
//!
//! Nodes and edges are written in sorted order.

use std::fmt::Write;

use crate::graph::{EventGraph, GraphEdge};
use crate::model::PriorityTier;

/// Generate a Graphviz DOT representation of the event graph.
pub fn generate_dot(graph: &EventGraph<'_>) -> String {
    let listeners = graph.all_listeners();
    let events = graph.all_events();
    let mut dot = String::with_capacity((listeners.len() + events.len()) * 60 + 200);

    if let Err(e) = write_dot_content(&mut dot, graph, &listeners, &events) {
        tracing::error!(error = %e, "Failed to generate DOT string");
        return "digraph evprop {\n}\n".to_string();
    }
    dot
}

fn write_dot_content(
    dot: &mut String,
    graph: &EventGraph<'_>,
    listeners: &[&str],
    events: &[&str],
) -> std::fmt::Result {
    writeln!(dot, "digraph evprop {{")?;
    writeln!(dot, "  rankdir=LR;")?;
    writeln!(dot, "  node [fontname=\"JetBrains Mono\"];")?;
    writeln!(dot)?;

    for listener in listeners {
        writeln!(dot, "  \"{listener}\" [shape=box, style=filled, fillcolor=lightblue];")?;
    }
    for event in events {
        writeln!(dot, "  \"{event}\" [shape=ellipse];")?;
    }
    writeln!(dot)?;

    // Listener sources sort first, so creation edges precede subscriptions.
    let mut edges: Vec<_> = graph.graph().all_edges().collect();
    edges.sort_unstable_by_key(|&(from, to, _)| (from, to));
    for (from, to, edge) in edges {
        let (from, to) = (from.name(), to.name());
        match edge {
            GraphEdge::Subscribes(tier) if *tier != PriorityTier::Normal => {
                writeln!(dot, "  \"{from}\" -> \"{to}\" [label=\"{tier}\"];")?
            }
            _ => writeln!(dot, "  \"{from}\" -> \"{to}\";")?,
        }
    }

    writeln!(dot, "}}")?;
    Ok(())
}
