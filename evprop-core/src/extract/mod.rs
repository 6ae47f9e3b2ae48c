//! Per-file pattern extraction.
//!
//! - [`lexer`]: comment/string aware tokenizer
//! - [`callables`]: submit callable discovery in non-listener files
//! - [`listener`]: listener registration, subscriptions and emissions
//!
//! Every function here looks at a single file. Nothing in this module knows
//! about the rest of the corpus.

pub mod callables;
pub mod lexer;
pub mod listener;

pub use callables::{extract_submit_callables, CallableDef};
pub use lexer::{lex, LexedSource};
pub use listener::{extract_listener, is_listener_candidate, ListenerFragment};

/// Default suffix of event definition headers.
pub const DEFAULT_DEFINITIONS_SUFFIX: &str = "_def.h";

/// Knobs for the per-file extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Included headers ending with this suffix are recorded as definition files
    pub definitions_suffix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            definitions_suffix: DEFAULT_DEFINITIONS_SUFFIX.to_string(),
        }
    }
}

/// Event created by an identifier of the form `new_<x>_event`.
///
/// The event name is the identifier without `new_`, so it keeps the
/// `_event` suffix. `<x>` must not be empty.
pub fn event_name(ident: &str) -> Option<&str> {
    let name = ident.strip_prefix("new_")?;
    (name.len() > "_event".len() && name.ends_with("_event")).then_some(name)
}
