//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use evprop_core::prelude::*;
//! ```

// Errors
pub use crate::error::{EvpropError, EvpropResult};

// Model
pub use crate::model::{CorpusModel, Listener, PriorityTier, SubmitCallable, TierMap};

// Aggregation and querying
pub use crate::aggregate::{build_model, SourceCorpus};
pub use crate::graph::{EventGraph, GraphStats};

// Documents
pub use crate::rst::{render_documents, RenderedDocuments, ReportOptions};

// Configuration
pub use crate::config::{load_config, EvpropConfig};

// Builder API
pub use crate::builder::{AnalysisResult, Evprop};
