//! Output formatting - plaintext and JSON.

use serde_json::json;

use crate::graph::{EventGraph, GraphStats};

/// Plain-text summary of a graph.
pub fn format_plain(graph: &EventGraph<'_>, stats: &GraphStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("PROJECT: {}\n", graph.project_name()));
    out.push_str(&format!(
        "LISTENERS: {}  EVENTS: {}  SUBMIT CALLABLES: {}\n",
        stats.listeners, stats.events, stats.submit_callables
    ));
    out.push_str(&format!(
        "EDGES: {} emit, {} subscribe\n",
        stats.emit_edges, stats.subscribe_edges
    ));

    for listener in graph.all_listeners() {
        out.push_str(&format!("- {listener}\n"));
    }

    if !stats.unproduced_events.is_empty() {
        out.push_str(&format!("UNPRODUCED EVENTS ({}):\n", stats.unproduced_events.len()));
        for event in &stats.unproduced_events {
            out.push_str(&format!("- {event}\n"));
        }
    }
    if !stats.unconsumed_events.is_empty() {
        out.push_str(&format!("UNCONSUMED EVENTS ({}):\n", stats.unconsumed_events.len()));
        for event in &stats.unconsumed_events {
            out.push_str(&format!("- {event}\n"));
        }
    }
    out
}

/// Prints the plain-text summary.
pub fn print_plain(graph: &EventGraph<'_>) {
    print!("{}", format_plain(graph, &graph.stats()));
}

/// The model behind a graph and its statistics, as JSON.
pub fn model_json(graph: &EventGraph<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({ "model": graph.model(), "stats": graph.stats() }))
}

/// Prints the model and its statistics in JSON format.
///
/// Falls back to a minimal object if serialization fails.
pub fn print_model_json(graph: &EventGraph<'_>) {
    match model_json(graph) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::warn!(error = %e, "JSON serialization failed");
            println!("{{\"project_name\": {:?}}}", graph.project_name());
        }
    }
}
