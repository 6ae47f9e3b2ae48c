//! Listener fragment extraction for one C source file.
//!
//! A fragment records what a single file says about its listener: the
//! registration name, subscriptions per tier, directly created events and
//! every identifier that could invoke a submit callable. Resolution against
//! the corpus-wide callable table happens later, in the aggregator.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::callables::{define_replacement, parse_define};
use super::lexer::{bare_argument, matching_close, split_args, LexedSource, Token};
use super::{event_name, ExtractOptions};
use crate::error::{EvpropError, EvpropResult};
use crate::model::{empty_tier_map, PriorityTier, TierMap};

/// Base name of the registration macro.
pub const LISTENER_MARKER: &str = "EVENT_LISTENER";
/// Base name of the subscription macros; tiers append `_EARLY` / `_FINAL`.
pub const SUBSCRIBE_MARKER: &str = "EVENT_SUBSCRIBE";

/// What one listener file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFragment {
    pub file: String,
    /// Listener name after alias resolution
    pub name: String,
    pub in_events: TierMap<BTreeSet<String>>,
    /// Events created directly in this file
    pub direct_out: BTreeSet<String>,
    /// Identifiers followed by `(`
    pub calls: BTreeSet<String>,
    /// Every identifier in the file
    pub idents: BTreeSet<String>,
    pub def_files: BTreeSet<String>,
}

fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^#\s*include\s*[<"]([^>"]+)[>"]"#).expect("valid include regex"))
}

/// `EVENT_LISTENER`, or a namespaced variant such as `APP_EVENT_LISTENER`.
fn matches_marker(ident: &str, base: &str) -> bool {
    ident
        .strip_suffix(base)
        .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('_'))
}

fn subscription_tier(ident: &str) -> Option<PriorityTier> {
    PriorityTier::ALL.into_iter().find(|tier| {
        ident
            .strip_suffix(tier.macro_suffix())
            .is_some_and(|stem| matches_marker(stem, SUBSCRIBE_MARKER))
    })
}

/// True when a file mentions the listener registration macro anywhere.
pub fn is_listener_candidate(lexed: &LexedSource<'_>) -> bool {
    lexed.identifiers().any(|ident| matches_marker(ident, LISTENER_MARKER))
}

/// Arguments of the invocation `name(...)` whose name is at `name_idx`.
fn invocation<'t, 'a>(tokens: &'t [Token<'a>], name_idx: usize) -> Option<Vec<&'t [Token<'a>]>> {
    let open = name_idx + 1;
    if !tokens.get(open)?.is_punct('(') {
        return None;
    }
    let close = matching_close(tokens, open)?;
    Some(split_args(tokens, open, close))
}

/// Resolves the listener name through a single object-like `#define`.
fn resolve_alias(file: &str, lexed: &LexedSource<'_>, raw: String) -> EvpropResult<String> {
    let replacements: Vec<&str> = lexed
        .directives
        .iter()
        .filter(|d| parse_define(&d.text).is_some_and(|(name, _)| name == raw))
        .filter_map(|d| define_replacement(&d.text))
        .collect();

    match replacements.as_slice() {
        [] => Ok(raw),
        [replacement] => Ok(replacement
            .split_whitespace()
            .last()
            .map(str::to_string)
            .unwrap_or(raw)),
        many => Err(EvpropError::listener_alias(file, raw, many.len())),
    }
}

/// Extracts the listener fragment of one C file.
///
/// Returns `Ok(None)` for files that never mention the registration macro.
/// A candidate must contain exactly one well-formed registration.
pub fn extract_listener(
    file: &str,
    lexed: &LexedSource<'_>,
    options: &ExtractOptions,
) -> EvpropResult<Option<ListenerFragment>> {
    if !is_listener_candidate(lexed) {
        return Ok(None);
    }

    let code = lexed.code_tokens();
    let mut registrations: Vec<String> = Vec::new();
    let mut in_events: TierMap<BTreeSet<String>> = empty_tier_map();

    for (idx, tok) in code.iter().enumerate() {
        if !tok.is_ident() {
            continue;
        }
        if matches_marker(tok.text, LISTENER_MARKER) {
            if let Some(args) = invocation(&code, idx) {
                if args.len() == 2 && args.iter().all(|a| !a.is_empty()) {
                    registrations.push(bare_argument(args[0]));
                }
            }
        } else if let Some(tier) = subscription_tier(tok.text) {
            let event = invocation(&code, idx)
                .and_then(|args| args.last().map(|arg| bare_argument(arg)))
                .filter(|event| !event.is_empty());
            if let Some(event) = event {
                in_events.entry(tier).or_default().insert(event);
            }
        }
    }

    let raw_name = match registrations.len() {
        1 => registrations.remove(0),
        found => return Err(EvpropError::listener_marker(file, found)),
    };
    let name = resolve_alias(file, lexed, raw_name)?;

    let mut direct_out = BTreeSet::new();
    let mut calls = BTreeSet::new();
    let mut idents = BTreeSet::new();
    for (idx, tok) in lexed.tokens.iter().enumerate() {
        if !tok.is_ident() {
            continue;
        }
        if let Some(event) = event_name(tok.text) {
            direct_out.insert(event.to_string());
        }
        let next = lexed.tokens.get(idx + 1);
        if next.is_some_and(|n| n.is_punct('(') && n.directive == tok.directive) {
            calls.insert(tok.text.to_string());
        }
        idents.insert(tok.text.to_string());
    }

    let def_files: BTreeSet<String> = lexed
        .directives
        .iter()
        .filter_map(|d| include_regex().captures(&d.text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|target| target.ends_with(&options.definitions_suffix))
        .collect();

    Ok(Some(ListenerFragment {
        file: file.to_string(),
        name,
        in_events,
        direct_out,
        calls,
        idents,
        def_files,
    }))
}
