//! Per-listener event propagation tables.
//!
//! Inbound rows fill the top of the table and outbound rows the bottom:
//!
//! ```text
//! +---------------+-------------+-------------+--------------+-------------+
//! | Source Module | Input Event | This Module | Output Event | Sink Module |
//! +===============+=============+=============+==============+=============+
//! | producer      | event       | listener    |              |             |
//! |               |             |             +--------------+-------------+
//! |               |             |             | event        | subscriber  |
//! +---------------+-------------+-------------+--------------+-------------+
//! ```
//!
//! Producer and subscriber lists at or above the collapse threshold are
//! replaced by a single reference into the index document.

use tracing::debug;

use super::table::{render_grid, Column};
use super::{literal, reference, trim_trailing_blank, ReportOptions};
use crate::error::EvpropResult;
use crate::graph::EventGraph;
use crate::model::{PriorityTier, TierMap};

pub const COLUMN_NAMES: [&str; 5] = ["Source Module", "Input Event", "This Module", "Output Event", "Sink Module"];

/// Sink cell of an outbound event nobody subscribes to.
pub const NO_SINK: &str = "None";

/// Producers of `event`, or `<event>_sources` when there are too many.
pub fn collapse_sources(event: &str, producers: Vec<&str>, threshold: usize) -> Vec<String> {
    if !producers.is_empty() && producers.len() >= threshold {
        vec![format!("{event}_sources")]
    } else {
        producers.into_iter().map(str::to_string).collect()
    }
}

/// Subscribers of `event` per tier, or `<event>_sinks` under the normal tier
/// when the total across tiers is too large.
pub fn collapse_sinks(event: &str, sinks: TierMap<Vec<&str>>, threshold: usize) -> TierMap<Vec<String>> {
    let total: usize = sinks.values().map(Vec::len).sum();
    if total > 0 && total >= threshold {
        let mut collapsed: TierMap<Vec<String>> = sinks.into_keys().map(|tier| (tier, Vec::new())).collect();
        collapsed.insert(PriorityTier::Normal, vec![format!("{event}_sinks")]);
        collapsed
    } else {
        sinks
            .into_iter()
            .map(|(tier, list)| (tier, list.into_iter().map(str::to_string).collect()))
            .collect()
    }
}

/// Builds the five decorated columns of one listener's table.
pub fn propagation_columns(graph: &EventGraph<'_>, listener: &str, options: &ReportOptions) -> EvpropResult<Vec<Column>> {
    let project = options.project(graph);
    let threshold = options.fan_out_collapse_threshold;

    let mut sources = Vec::new();
    let mut inputs = Vec::new();
    for events in graph.in_events(listener)?.values() {
        for event in events {
            let producers = collapse_sources(event, graph.producers(event), threshold);
            for (idx, producer) in producers.iter().enumerate() {
                sources.push(reference(project, producer));
                inputs.push(if idx == 0 { literal(event) } else { String::new() });
            }
        }
    }

    let mut outputs = Vec::new();
    let mut sinks = Vec::new();
    for event in graph.out_events(listener)? {
        let subscribers = collapse_sinks(event, graph.subscribers(event), threshold);
        let mut first = true;
        for subscriber in subscribers.values().flatten() {
            sinks.push(reference(project, subscriber));
            outputs.push(if first { literal(event) } else { String::new() });
            first = false;
        }
        if first {
            sinks.push(NO_SINK.to_string());
            outputs.push(literal(event));
        }
    }

    let rows = sources.len() + sinks.len();
    let mut this_module = vec![literal(listener)];
    for column in [&mut sources, &mut inputs, &mut this_module] {
        let missing = rows.saturating_sub(column.len());
        column.extend(std::iter::repeat(String::new()).take(missing));
    }
    for column in [&mut outputs, &mut sinks] {
        let mut padded = vec![String::new(); rows.saturating_sub(column.len())];
        padded.append(column);
        *column = padded;
    }

    let [source_h, input_h, this_h, output_h, sink_h] = COLUMN_NAMES;
    Ok(vec![
        Column::new(source_h, sources),
        Column::new(input_h, inputs),
        Column::new(this_h, this_module),
        Column::new(output_h, outputs),
        Column::new(sink_h, sinks),
    ])
}

/// Renders one listener's propagation table, without trailing newline.
pub fn render_listener_table(graph: &EventGraph<'_>, listener: &str, options: &ReportOptions) -> EvpropResult<String> {
    let columns = propagation_columns(graph, listener, options)?;
    let mut table = render_grid(listener, columns)?;
    // Close the merged cells under the last source row.
    table.close_rule_below_last(":ref:", 2);
    Ok(table.into_string())
}

/// Renders the propagation document: one bracketed table per listener.
pub fn render_propagation_document(graph: &EventGraph<'_>, options: &ReportOptions) -> EvpropResult<String> {
    let title = options
        .propagation_title
        .clone()
        .unwrap_or_else(|| format!("{} event propagation", options.project(graph)));

    let mut doc = String::new();
    doc.push_str(":orphan:\n\n");
    doc.push_str(&title);
    doc.push('\n');
    doc.push_str(&"#".repeat(title.chars().count()));
    doc.push_str("\n\n");

    let listeners = graph.all_listeners();
    for listener in &listeners {
        let table = render_listener_table(graph, listener, options)?;
        doc.push_str(&format!(".. table_{listener}_start\n\n"));
        doc.push_str(&table);
        doc.push_str(&format!("\n\n.. table_{listener}_end\n\n\n"));
    }

    debug!(listeners = listeners.len(), bytes = doc.len(), "Propagation document rendered");
    Ok(trim_trailing_blank(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CorpusModel, Listener};

    fn model() -> CorpusModel {
        let mut m = CorpusModel {
            project_name: "p".into(),
            ..CorpusModel::default()
        };
        let mut leds = Listener::new("leds");
        leds.in_events.get_mut(&PriorityTier::Normal).unwrap().insert("btn_event".into());
        leds.out_events.insert("led_event".into());
        let mut buttons = Listener::new("buttons");
        buttons.out_events.insert("btn_event".into());
        m.listeners.insert("leds".into(), leds);
        m.listeners.insert("buttons".into(), buttons);
        m
    }

    #[test]
    fn test_collapse_sources_boundary() {
        let six = vec!["a", "b", "c", "d", "e", "f"];
        assert_eq!(collapse_sources("x_event", six.clone(), 7).len(), 6);
        let mut seven = six;
        seven.push("g");
        assert_eq!(collapse_sources("x_event", seven, 7), vec!["x_event_sources".to_string()]);
        assert!(collapse_sources("x_event", Vec::new(), 0).is_empty());
    }

    #[test]
    fn test_collapse_sinks_sums_tiers() {
        let mut sinks: TierMap<Vec<&str>> = crate::model::empty_tier_map();
        sinks.insert(PriorityTier::Early, vec!["a", "b", "c"]);
        sinks.insert(PriorityTier::Final, vec!["d", "e", "f", "g"]);
        let collapsed = collapse_sinks("x_event", sinks, 7);
        assert!(collapsed[&PriorityTier::Early].is_empty());
        assert!(collapsed[&PriorityTier::Final].is_empty());
        assert_eq!(collapsed[&PriorityTier::Normal], vec!["x_event_sinks".to_string()]);
    }

    #[test]
    fn test_six_sinks_stay_listed() {
        let mut sinks: TierMap<Vec<&str>> = crate::model::empty_tier_map();
        sinks.insert(PriorityTier::Early, vec!["a", "b", "c"]);
        sinks.insert(PriorityTier::Final, vec!["d", "e", "f"]);
        let kept = collapse_sinks("x_event", sinks, 7);
        assert_eq!(kept[&PriorityTier::Early], vec!["a", "b", "c"]);
        assert_eq!(kept[&PriorityTier::Final], vec!["d", "e", "f"]);
        assert!(kept[&PriorityTier::Normal].is_empty());
    }

    #[test]
    fn test_listener_table() {
        let m = model();
        let g = EventGraph::build(&m);
        let table = render_listener_table(&g, "leds", &ReportOptions::default()).unwrap();
        let expected = "\
+------------------+---------------+-------------+---------------+-------------+
| Source Module    | Input Event   | This Module | Output Event  | Sink Module |
+==================+===============+=============+===============+=============+
| :ref:`p_buttons` | ``btn_event`` | ``leds``    |               |             |
+------------------+---------------+             +---------------+-------------+
|                  |               |             | ``led_event`` | None        |
+------------------+---------------+-------------+---------------+-------------+";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_listener_without_events() {
        let mut m = model();
        m.listeners.insert("idle".into(), Listener::new("idle"));
        let g = EventGraph::build(&m);
        let table = render_listener_table(&g, "idle", &ReportOptions::default()).unwrap();
        assert_eq!(table.lines().count(), 5);
        assert!(table.contains("| ``idle``    |"));
    }

    #[test]
    fn test_unknown_listener_is_lookup_error() {
        let m = model();
        let g = EventGraph::build(&m);
        let err = render_listener_table(&g, "ghost", &ReportOptions::default()).unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_document_framing() {
        let m = model();
        let g = EventGraph::build(&m);
        let doc = render_propagation_document(&g, &ReportOptions::default()).unwrap();
        let header = format!(":orphan:\n\np event propagation\n{}\n\n", "#".repeat(19));
        assert!(doc.starts_with(&format!("{header}.. table_buttons_start\n\n+---")));
        assert!(doc.ends_with(".. table_leds_end\n"));
        assert!(doc.contains("\n\n.. table_buttons_end\n\n\n.. table_leds_start\n\n"));
    }
}
