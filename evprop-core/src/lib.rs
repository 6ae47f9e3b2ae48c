//! evprop-core: static event propagation analysis for event-driven firmware
//!
//! Reads the C sources of an application built on an event manager, finds
//! every listener together with the events it subscribes to and creates,
//! and renders reStructuredText documents describing how events travel
//! between modules.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use evprop_core::prelude::*;
//!
//! let result = Evprop::new("/path/to/app")
//!     .framework_root("/path/to/ncs/nrf")
//!     .analyze()?;
//!
//! let graph = EventGraph::build(&result.model);
//! let docs = render_documents(&graph, &ReportOptions::default())?;
//! ```
//!
//! # Module Organization
//!
//! - [`scan`]: parallel, deterministic source discovery
//! - [`extract`]: per-file lexing and pattern extraction
//! - [`aggregate`]: corpus-wide model building
//! - [`model`]: listeners, submit callables and priority tiers
//! - [`graph`]: event graph queries
//! - [`rst`]: propagation tables and the module index
//! - [`builder`]: fluent builder API
//! - [`error`]: typed error handling
//!
//! # Cargo Features
//!
//! - `dot` (default): Graphviz DOT export of the event graph

pub mod aggregate;
pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod logging;
pub mod model;
pub mod prelude;
pub mod report;
pub mod rst;
pub mod scan;

#[cfg(feature = "dot")]
pub mod visualize;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{EvpropError, EvpropResult, IoResultExt};

// Builder API
pub use builder::{AnalysisResult, Evprop, DEFAULT_APP_DIR};

// Configuration
pub use config::{load_config, load_config_file, EvpropConfig, ReportConfig, SourcesConfig, CONFIG_FILE};

// Model
pub use model::{empty_tier_map, CallableKind, CorpusModel, Listener, PriorityTier, SubmitCallable, TierMap};

// Extraction and aggregation
pub use aggregate::{build_model, SourceCorpus};
pub use extract::{event_name, ExtractOptions, DEFAULT_DEFINITIONS_SUFFIX};

// Graph queries
pub use graph::{EventGraph, GraphEdge, GraphNode, GraphStats};

// Logging
pub use logging::init_structured_logging;

// Documents
pub use rst::{
    render_documents, render_index_document, render_listener_table, render_propagation_document,
    RenderedDocuments, ReportOptions, DEFAULT_FAN_OUT_COLLAPSE_THRESHOLD, INDEX_FILE, PROPAGATION_FILE,
};

// Reporting
pub use report::{format_plain, model_json, print_model_json, print_plain};

// File scanning
pub use scan::{gather_app_corpus, gather_framework_corpus, gather_source_files, FrameworkLayout};

#[cfg(feature = "dot")]
pub use visualize::generate_dot;
