//! Corpus aggregation: per-file extraction results merged into one model.
//!
//! Files are lexed and extracted in parallel, then reduced sequentially in
//! file name order so the outcome, including which error is reported first,
//! does not depend on scheduling.
//!
//! The run has two passes. The first collects every submit callable in the
//! corpus and checks name uniqueness. The second resolves each listener's
//! indirect emissions against the complete callable table.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::{EvpropError, EvpropResult};
use crate::extract::{
    extract_listener, extract_submit_callables, is_listener_candidate, lex, CallableDef, ExtractOptions, LexedSource,
    ListenerFragment,
};
use crate::model::{CorpusModel, Listener, SubmitCallable};

/// File name to content maps, split by file kind.
///
/// Keys are bare file names (no directories).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCorpus {
    pub c_sources: BTreeMap<String, String>,
    pub h_sources: BTreeMap<String, String>,
}

impl SourceCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.c_sources.len() + self.h_sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c_sources.is_empty() && self.h_sources.is_empty()
    }

    /// Overlays `other` on top of this corpus; `other` wins on name clashes.
    pub fn overlay(&mut self, other: SourceCorpus) {
        self.c_sources.extend(other.c_sources);
        self.h_sources.extend(other.h_sources);
    }

    /// Every file in name order, C sources first.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.c_sources
            .iter()
            .chain(self.h_sources.iter())
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }
}

struct LexedFile<'a> {
    name: &'a str,
    is_c: bool,
    lexed: LexedSource<'a>,
}

/// Builds the corpus model.
///
/// Fails on the first integrity error in file name order: a callable name
/// defined in more than one place, or a listener file without exactly one
/// registration or with an ambiguous name alias.
pub fn build_model(project_name: &str, corpus: &SourceCorpus, options: &ExtractOptions) -> EvpropResult<CorpusModel> {
    let c_names: BTreeSet<&str> = corpus.c_sources.keys().map(String::as_str).collect();
    let inputs: Vec<(&str, &str)> = corpus.files().collect();

    let mut files: Vec<LexedFile<'_>> = inputs
        .par_iter()
        .map(|&(name, text)| LexedFile {
            name,
            is_c: c_names.contains(name),
            lexed: lex(text),
        })
        .collect();
    files.sort_by(|a, b| a.name.cmp(b.name));

    let submit_callables = collect_callables(&files)?;
    let fragments = collect_fragments(&files, options)?;

    let mut listeners: BTreeMap<String, Listener> = BTreeMap::new();
    for fragment in fragments {
        let listener = resolve_fragment(fragment, &submit_callables);
        match listeners.get_mut(&listener.name) {
            Some(existing) => existing.merge(listener),
            None => {
                listeners.insert(listener.name.clone(), listener);
            }
        }
    }

    info!(
        files = files.len(),
        callables = submit_callables.len(),
        listeners = listeners.len(),
        "Corpus model built"
    );

    Ok(CorpusModel {
        project_name: project_name.to_string(),
        submit_callables,
        listeners,
    })
}

/// First pass: submit callables from every non-listener file.
fn collect_callables(files: &[LexedFile<'_>]) -> EvpropResult<BTreeMap<String, SubmitCallable>> {
    let results: Vec<EvpropResult<(&str, Vec<CallableDef>)>> = files
        .par_iter()
        .filter(|f| !is_listener_candidate(&f.lexed))
        .map(|f| extract_submit_callables(f.name, &f.lexed).map(|defs| (f.name, defs)))
        .collect();

    // Parallel collect keeps order, so the first error is the first file by name.
    let per_file = results.into_iter().collect::<EvpropResult<Vec<_>>>()?;

    let mut by_name: BTreeMap<String, Vec<(&str, CallableDef)>> = BTreeMap::new();
    for (file, defs) in per_file {
        for def in defs {
            by_name.entry(def.name.clone()).or_default().push((file, def));
        }
    }

    let mut table = BTreeMap::new();
    for (name, mut defs) in by_name {
        if defs.len() > 1 {
            let files = defs.iter().map(|(file, _)| file.to_string());
            return Err(EvpropError::duplicate_callable(name, files));
        }
        if let Some((file, def)) = defs.pop() {
            debug!(callable = %name, file, kind = ?def.kind, "Submit callable");
            table.insert(
                name,
                SubmitCallable {
                    name: def.name,
                    kind: def.kind,
                    file: file.to_string(),
                    emits: def.emits,
                },
            );
        }
    }
    Ok(table)
}

/// Listener fragments from every C source, in file name order.
fn collect_fragments(files: &[LexedFile<'_>], options: &ExtractOptions) -> EvpropResult<Vec<ListenerFragment>> {
    let results: Vec<EvpropResult<Option<ListenerFragment>>> = files
        .par_iter()
        .filter(|f| f.is_c)
        .map(|f| extract_listener(f.name, &f.lexed, options))
        .collect();

    let fragments = results.into_iter().collect::<EvpropResult<Vec<_>>>()?;
    Ok(fragments.into_iter().flatten().collect())
}

/// Second pass: adds events emitted through submit callables.
fn resolve_fragment(fragment: ListenerFragment, callables: &BTreeMap<String, SubmitCallable>) -> Listener {
    let mut out_events = fragment.direct_out;
    for callable in callables.values() {
        let invoked = if callable.kind.needs_call_syntax() {
            fragment.calls.contains(&callable.name)
        } else {
            fragment.idents.contains(&callable.name)
        };
        if invoked {
            out_events.extend(callable.emits.iter().cloned());
        }
    }

    let mut listener = Listener::new(fragment.name);
    listener.in_events = fragment.in_events;
    listener.out_events = out_events;
    listener.def_files = fragment.def_files;
    listener.files.insert(fragment.file);
    listener
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallableKind, PriorityTier};

    fn corpus(c: &[(&str, &str)], h: &[(&str, &str)]) -> SourceCorpus {
        SourceCorpus {
            c_sources: c.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            h_sources: h.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_indirect_emission_across_files() {
        let c = corpus(
            &[
                ("a.c", "EVENT_LISTENER(a, h);\nvoid f(void) { send_x(); SEND_Y; }\n"),
                ("util.c", "void send_x(void) { new_x_event(); }\n"),
            ],
            &[("util.h", "#define SEND_Y new_y_event()\n")],
        );
        let model = build_model("p", &c, &ExtractOptions::default()).unwrap();
        assert_eq!(model.listeners["a"].out_events, set(&["x_event", "y_event"]));
        assert_eq!(model.submit_callables["send_x"].kind, CallableKind::Function);
        assert_eq!(model.submit_callables["SEND_Y"].file, "util.h");
    }

    #[test]
    fn test_function_macro_needs_parenthesis() {
        let c = corpus(
            &[("a.c", "EVENT_LISTENER(a, h);\nint x = SEND_Z;\n")],
            &[("z.h", "#define SEND_Z(v) new_z_event()\n")],
        );
        let model = build_model("p", &c, &ExtractOptions::default()).unwrap();
        assert!(model.listeners["a"].out_events.is_empty());
    }

    #[test]
    fn test_fragments_with_same_name_merge() {
        let c = corpus(
            &[
                ("m1.c", "EVENT_LISTENER(m, h);\nEVENT_SUBSCRIBE(m, a_event);\n"),
                ("m2.c", "#define MODULE m\nEVENT_LISTENER(MODULE, h);\nEVENT_SUBSCRIBE_EARLY(MODULE, b_event);\n"),
            ],
            &[],
        );
        let model = build_model("p", &c, &ExtractOptions::default()).unwrap();
        assert_eq!(model.listeners.len(), 1);
        let m = &model.listeners["m"];
        assert_eq!(m.in_events[&PriorityTier::Normal], set(&["a_event"]));
        assert_eq!(m.in_events[&PriorityTier::Early], set(&["b_event"]));
        assert_eq!(m.files, set(&["m1.c", "m2.c"]));
    }

    #[test]
    fn test_duplicate_across_files_reports_smallest_name() {
        let c = corpus(
            &[
                ("b.c", "void zz(void) { new_a_event(); }\nvoid aa(void) { new_a_event(); }\n"),
                ("a.c", "void zz(void) { new_b_event(); }\n"),
            ],
            &[("c.h", "#define aa new_c_event()\n")],
        );
        let err = build_model("p", &c, &ExtractOptions::default()).unwrap_err();
        match err {
            EvpropError::DuplicateCallable { name, files } => {
                assert_eq!(name, "aa");
                assert_eq!(files, vec!["b.c".to_string(), "c.h".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_listener_files_are_not_callable_sources() {
        let c = corpus(
            &[
                ("a.c", "EVENT_LISTENER(a, h);\nstatic void send(void) { new_a_event(); }\n"),
                ("b.c", "EVENT_LISTENER(b, h);\nvoid g(void) { send(); }\n"),
            ],
            &[],
        );
        let model = build_model("p", &c, &ExtractOptions::default()).unwrap();
        assert!(model.submit_callables.is_empty());
        assert!(model.listeners["b"].out_events.is_empty());
        assert_eq!(model.listeners["a"].out_events, set(&["a_event"]));
    }
}
