//! Source and sink module lists for heavily connected events.
//!
//! Collapsed table cells (`<event>_sources`, `<event>_sinks`) point at the
//! labelled sections of this document.

use tracing::debug;

use super::{reference, trim_trailing_blank, ReportOptions};
use crate::graph::EventGraph;

const INTRO: &str = "This page includes lists of source and sink modules for events that have many listeners or sources.\n\
These were gathered on a single page to simplify the event propagation tables.\n\n";

fn section(doc: &mut String, project: &str, label: &str, title: &str, modules: &[&str]) {
    doc.push_str(&format!(".. _{project}_{label}:\n\n"));
    doc.push_str(title);
    doc.push('\n');
    doc.push_str(&"=".repeat(title.chars().count()));
    doc.push_str("\n\n");
    for module in modules {
        doc.push_str(&format!("* {}\n", reference(project, module)));
    }
}

/// Renders the index document.
///
/// With a threshold, an event is listed only when its producer count or its
/// subscriber count reaches it. Subscribers are concatenated in tier order.
pub fn render_index_document(graph: &EventGraph<'_>, options: &ReportOptions) -> String {
    let project = options.project(graph);

    let mut doc = format!(
        ".. _{project}_event_rel_modules:\n\n\
         Source and sink module lists\n\
         ############################\n\n\
         .. contents::\n   :local:\n   :depth: 2\n\n{INTRO}"
    );

    let mut listed = 0usize;
    for event in graph.all_events() {
        let sources = graph.producers(event);
        let sinks: Vec<&str> = graph.subscribers(event).into_values().flatten().collect();

        if let Some(threshold) = options.index_module_count_threshold {
            if sources.len() < threshold && sinks.len() < threshold {
                continue;
            }
        }
        listed += 1;

        section(
            &mut doc,
            project,
            &format!("{event}_sources"),
            &format!("Source modules for {event}"),
            &sources,
        );
        doc.push('\n');
        section(
            &mut doc,
            project,
            &format!("{event}_sinks"),
            &format!("Sink modules for {event}"),
            &sinks,
        );
        doc.push_str("\n\n");
    }

    debug!(events = listed, bytes = doc.len(), "Index document rendered");
    trim_trailing_blank(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CorpusModel, Listener, PriorityTier};

    fn model() -> CorpusModel {
        let mut m = CorpusModel {
            project_name: "desk".into(),
            ..CorpusModel::default()
        };
        let mut a = Listener::new("a");
        a.out_events.insert("x_event".into());
        let mut b = Listener::new("b");
        b.in_events.get_mut(&PriorityTier::Final).unwrap().insert("x_event".into());
        let mut c = Listener::new("c");
        c.in_events.get_mut(&PriorityTier::Early).unwrap().insert("x_event".into());
        c.out_events.insert("y_event".into());
        for l in [a, b, c] {
            m.listeners.insert(l.name.clone(), l);
        }
        m
    }

    #[test]
    fn test_full_index() {
        let m = model();
        let g = EventGraph::build(&m);
        let doc = render_index_document(&g, &ReportOptions::default());

        assert!(doc.starts_with(".. _desk_event_rel_modules:\n\nSource and sink module lists\n############################\n\n.. contents::\n   :local:\n   :depth: 2\n\nThis page"));
        let x_section = "\
.. _desk_x_event_sources:

Source modules for x_event
==========================

* :ref:`desk_a`

.. _desk_x_event_sinks:

Sink modules for x_event
========================

* :ref:`desk_c`
* :ref:`desk_b`
";
        assert!(doc.contains(x_section));
        assert!(doc.ends_with(&format!("Sink modules for y_event\n{}\n\n", "=".repeat(24))));
    }

    #[test]
    fn test_threshold_filters_quiet_events() {
        let m = model();
        let g = EventGraph::build(&m);
        let options = ReportOptions {
            index_module_count_threshold: Some(2),
            ..ReportOptions::default()
        };
        let doc = render_index_document(&g, &options);
        assert!(doc.contains("Sink modules for x_event"));
        assert!(!doc.contains("y_event"));
    }
}
