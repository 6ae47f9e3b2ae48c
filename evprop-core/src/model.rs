//! Corpus model: submit callables, listeners and the events that link them.
//!
//! Everything is held in ordered collections so every traversal of the
//! model, and every document rendered from it, is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Delivery order class of a subscription.
///
/// Ordering follows delivery: `Early < Normal < Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityTier {
    Early,
    Normal,
    Final,
}

impl PriorityTier {
    /// All tiers in delivery order.
    pub const ALL: [PriorityTier; 3] = [PriorityTier::Early, PriorityTier::Normal, PriorityTier::Final];

    /// Suffix the subscription macro carries for this tier (`EVENT_SUBSCRIBE_EARLY`).
    pub fn macro_suffix(self) -> &'static str {
        match self {
            PriorityTier::Early => "_EARLY",
            PriorityTier::Normal => "",
            PriorityTier::Final => "_FINAL",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Early => "EARLY",
            PriorityTier::Normal => "NORMAL",
            PriorityTier::Final => "FINAL",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One set per tier. Every tier key is always present.
pub type TierMap<T> = BTreeMap<PriorityTier, T>;

/// Creates a [`TierMap`] with a default value for every tier.
pub fn empty_tier_map<T: Default>() -> TierMap<T> {
    PriorityTier::ALL.iter().map(|t| (*t, T::default())).collect()
}

/// How a submit callable is defined, which decides how an invocation looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    /// C function definition, invoked as `name(`
    Function,
    /// Function-like `#define NAME(...)`, invoked as `name(`
    FunctionMacro,
    /// Object-like `#define NAME ...`, invoked by naming it
    ObjectMacro,
}

impl CallableKind {
    /// Whether an invocation needs an opening parenthesis after the name.
    pub fn needs_call_syntax(self) -> bool {
        !matches!(self, CallableKind::ObjectMacro)
    }
}

/// A function or macro that creates at least one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCallable {
    pub name: String,
    pub kind: CallableKind,
    /// Source file defining the callable
    pub file: String,
    /// Events created by the body (never empty)
    pub emits: BTreeSet<String>,
}

/// A module registered with the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    /// Events subscribed to, per tier, as declared in the sources
    pub in_events: TierMap<BTreeSet<String>>,
    /// Events created directly or through submit callables
    pub out_events: BTreeSet<String>,
    /// Included event-definition headers
    pub def_files: BTreeSet<String>,
    /// Source files contributing to this listener
    pub files: BTreeSet<String>,
}

impl Listener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_events: empty_tier_map(),
            out_events: BTreeSet::new(),
            def_files: BTreeSet::new(),
            files: BTreeSet::new(),
        }
    }

    /// Unions another record for the same listener into this one.
    pub fn merge(&mut self, other: Listener) {
        debug_assert_eq!(self.name, other.name);
        for (tier, events) in other.in_events {
            self.in_events.entry(tier).or_default().extend(events);
        }
        self.out_events.extend(other.out_events);
        self.def_files.extend(other.def_files);
        self.files.extend(other.files);
    }

    /// Subscriptions after tier exclusion: an event subscribed at more than
    /// one tier is reported only at the earliest one.
    pub fn effective_in_events(&self) -> TierMap<BTreeSet<&str>> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut out = TierMap::new();
        for tier in PriorityTier::ALL {
            let events: BTreeSet<&str> = self
                .in_events
                .get(&tier)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|e| !seen.contains(e))
                .collect();
            seen.extend(events.iter().copied());
            out.insert(tier, events);
        }
        out
    }

    /// Every event this listener touches, inbound or outbound.
    pub fn all_events(&self) -> BTreeSet<&str> {
        self.in_events
            .values()
            .flatten()
            .chain(self.out_events.iter())
            .map(String::as_str)
            .collect()
    }
}

/// The immutable result of aggregating a whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusModel {
    /// Prefix for cross-reference labels in rendered documents
    pub project_name: String,
    pub submit_callables: BTreeMap<String, SubmitCallable>,
    pub listeners: BTreeMap<String, Listener>,
}

impl CorpusModel {
    /// Union of every event mentioned by any listener.
    pub fn events(&self) -> BTreeSet<&str> {
        self.listeners.values().flat_map(|l| l.all_events()).collect()
    }
}
