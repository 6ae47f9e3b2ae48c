//! reStructuredText documents rendered from the event graph.
//!
//! - [`propagation`]: one grid table per listener (sources, inputs, the
//!   listener itself, outputs, sinks)
//! - [`index`]: full source/sink module lists for heavily connected events
//!
//! Rendering is pure: documents are returned as strings and the caller
//! decides where they go.

pub mod index;
pub mod propagation;
pub mod table;

use crate::error::EvpropResult;
use crate::graph::EventGraph;

pub use index::render_index_document;
pub use propagation::{render_listener_table, render_propagation_document};

/// File name of the propagation document.
pub const PROPAGATION_FILE: &str = "event_propagation.rst";
/// File name of the module index document.
pub const INDEX_FILE: &str = "event_rel_modules.rst";

/// Producer or subscriber lists at least this long are collapsed.
pub const DEFAULT_FAN_OUT_COLLAPSE_THRESHOLD: usize = 7;

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Label prefix; defaults to the model's project name
    pub project_name: Option<String>,
    pub fan_out_collapse_threshold: usize,
    /// `None` puts every event in the index document
    pub index_module_count_threshold: Option<usize>,
    /// Defaults to `<project> event propagation`
    pub propagation_title: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            project_name: None,
            fan_out_collapse_threshold: DEFAULT_FAN_OUT_COLLAPSE_THRESHOLD,
            index_module_count_threshold: None,
            propagation_title: None,
        }
    }
}

impl ReportOptions {
    pub(crate) fn project<'g>(&'g self, graph: &'g EventGraph<'_>) -> &'g str {
        self.project_name.as_deref().unwrap_or(graph.project_name())
    }
}

/// Both documents of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocuments {
    pub propagation: String,
    pub index: String,
}

impl RenderedDocuments {
    /// `(file name, contents)` pairs in a stable order.
    pub fn files(&self) -> [(&'static str, &str); 2] {
        [(PROPAGATION_FILE, &self.propagation), (INDEX_FILE, &self.index)]
    }
}

/// Renders both documents.
pub fn render_documents(graph: &EventGraph<'_>, options: &ReportOptions) -> EvpropResult<RenderedDocuments> {
    Ok(RenderedDocuments {
        propagation: render_propagation_document(graph, options)?,
        index: render_index_document(graph, options),
    })
}

/// Inline literal: ``` ``name`` ```.
pub(crate) fn literal(item: &str) -> String {
    format!("``{item}``")
}

/// Cross-reference to a documentation label: ``:ref:`<project>_<item>` ``.
pub(crate) fn reference(project: &str, item: &str) -> String {
    format!(":ref:`{project}_{item}`")
}

/// Drops the trailing two characters the writers always leave behind.
pub(crate) fn trim_trailing_blank(mut text: String) -> String {
    let keep = text.len().saturating_sub(2);
    text.truncate(keep);
    text
}
