//! Submit callable discovery for one non-listener file.
//!
//! A file contributes every function definition and `#define` whose body
//! creates at least one event (`new_<x>_event`).

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use super::event_name;
use super::lexer::{matching_close, LexedSource, Token, TokenKind};
use crate::error::{EvpropError, EvpropResult};
use crate::model::CallableKind;

/// A callable found in a single file, before corpus-wide checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableDef {
    pub name: String,
    pub kind: CallableKind,
    pub emits: BTreeSet<String>,
    /// Line of the definition
    pub line: usize,
}

/// Identifiers that can precede `(` at file scope without naming a function.
const NON_FUNCTION_WORDS: &[&str] = &[
    "if", "while", "for", "switch", "return", "sizeof", "defined", "__attribute__", "alignof",
    "_Alignof", "_Static_assert", "static_assert", "typeof", "__typeof__", "do", "else",
];

fn define_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)(\()?").expect("valid define regex")
    })
}

/// Parses a `#define` directive into its name and whether it is function-like.
pub(crate) fn parse_define(text: &str) -> Option<(&str, bool)> {
    let caps = define_regex().captures(text)?;
    let name = caps.get(1)?.as_str();
    Some((name, caps.get(2).is_some()))
}

/// Replacement text of an object-like `#define`, if any.
pub(crate) fn define_replacement(text: &str) -> Option<&str> {
    let caps = define_regex().captures(text)?;
    if caps.get(2).is_some() {
        return None;
    }
    let rest = text[caps.get(0)?.end()..].trim();
    (!rest.is_empty()).then_some(rest)
}

fn events_in<'a>(tokens: &[Token<'a>]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| t.is_ident())
        .filter_map(|t| event_name(t.text))
        .map(str::to_string)
        .collect()
}

/// File-scope function definitions: `name ( ... ) { ... }` at brace depth 0.
///
/// `extern "C" { ... }` wrappers do not count as nesting.
fn function_definitions<'a>(code: &[Token<'a>]) -> Vec<(String, usize, BTreeSet<String>)> {
    let mut found = Vec::new();
    let mut braces: Vec<bool> = Vec::new();
    let depth = |braces: &[bool]| braces.iter().filter(|transparent| !**transparent).count();

    let mut i = 0;
    while i < code.len() {
        let tok = code[i];
        match tok.kind {
            TokenKind::Punct('{') => {
                let transparent = i >= 2 && code[i - 1].kind == TokenKind::Str && code[i - 2].is_keyword("extern");
                braces.push(transparent);
            }
            TokenKind::Punct('}') => {
                braces.pop();
            }
            TokenKind::Ident
                if depth(&braces) == 0
                    && !NON_FUNCTION_WORDS.contains(&tok.text)
                    && code.get(i + 1).is_some_and(|t| t.is_punct('(')) =>
            {
                if let Some(params_end) = matching_close(code, i + 1) {
                    if code.get(params_end + 1).is_some_and(|t| t.is_punct('{')) {
                        if let Some(body_end) = matching_close(code, params_end + 1) {
                            let body = &code[params_end + 2..body_end];
                            found.push((tok.text.to_string(), tok.line, events_in(body)));
                            i = body_end + 1;
                            continue;
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    found
}

/// Extracts the submit callables defined in one file.
///
/// A name may have at most one definition that creates events. Any second
/// one, whatever its kind, is an integrity error.
pub fn extract_submit_callables(file: &str, lexed: &LexedSource<'_>) -> EvpropResult<Vec<CallableDef>> {
    let mut defs: Vec<CallableDef> = function_definitions(&lexed.code_tokens())
        .into_iter()
        .map(|(name, line, emits)| CallableDef {
            name,
            kind: CallableKind::Function,
            emits,
            line,
        })
        .collect();

    for directive in &lexed.directives {
        let Some((name, function_like)) = parse_define(&directive.text) else {
            continue;
        };
        // `#`, `define` and the macro name come first.
        let body = lexed.directive_tokens(directive).get(3..).unwrap_or_default();
        defs.push(CallableDef {
            name: name.to_string(),
            kind: if function_like {
                CallableKind::FunctionMacro
            } else {
                CallableKind::ObjectMacro
            },
            emits: events_in(body),
            line: directive.line,
        });
    }

    defs.retain(|def| !def.emits.is_empty());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for def in &defs {
        *counts.entry(def.name.as_str()).or_default() += 1;
    }
    if let Some((name, _)) = counts.iter().find(|(_, count)| **count > 1) {
        return Err(EvpropError::duplicate_callable(*name, [file.to_string()]));
    }

    defs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::lexer::lex;

    fn names(defs: &[CallableDef]) -> Vec<&str> {
        defs.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_function_definition_emitting_event() {
        let src = r#"
static void send_led(int x)
{
    struct led_event *e = new_led_event();
    if (x) {
        helper();
    }
    APP_EVENT_SUBMIT(e);
}

static int quiet(void) { return 0; }
"#;
        let lexed = lex(src);
        let defs = extract_submit_callables("leds_util.c", &lexed).unwrap();
        assert_eq!(names(&defs), vec!["send_led"]);
        assert_eq!(defs[0].kind, CallableKind::Function);
        assert!(defs[0].emits.contains("led_event"));
        assert_eq!(defs[0].line, 2);
    }

    #[test]
    fn test_prototype_and_calls_are_not_definitions() {
        let src = "void send_led(void);\nint x = f(new_led_event());\n";
        let lexed = lex(src);
        assert!(extract_submit_callables("a.h", &lexed).unwrap().is_empty());
    }

    #[test]
    fn test_extern_c_block_is_transparent() {
        let src = "extern \"C\" {\nvoid submit(void) { new_power_event(); }\n}\n";
        let lexed = lex(src);
        let defs = extract_submit_callables("a.h", &lexed).unwrap();
        assert_eq!(names(&defs), vec!["submit"]);
    }

    #[test]
    fn test_macros_of_both_shapes() {
        let src = "#define SEND_CLICK(x) \\\n  do { new_click_event(); } while (0)\n#define POWER_DOWN new_power_down_event()\n#define UNRELATED 3\n";
        let lexed = lex(src);
        let defs = extract_submit_callables("click.h", &lexed).unwrap();
        assert_eq!(names(&defs), vec!["POWER_DOWN", "SEND_CLICK"]);
        assert_eq!(defs[0].kind, CallableKind::ObjectMacro);
        assert_eq!(defs[1].kind, CallableKind::FunctionMacro);
        assert!(defs[1].emits.contains("click_event"));
    }

    #[test]
    fn test_event_mentions_in_comments_and_strings_ignored() {
        let src = "void f(void) { /* new_a_event() */ log(\"new_b_event\"); }\n";
        let lexed = lex(src);
        assert!(extract_submit_callables("a.c", &lexed).unwrap().is_empty());
    }

    #[test]
    fn test_function_and_macro_with_same_name_fails() {
        let src = "#define submit() new_a_event()\nvoid submit(void) { new_b_event(); }\n";
        let lexed = lex(src);
        let err = extract_submit_callables("dup.c", &lexed).unwrap_err();
        match err {
            EvpropError::DuplicateCallable { name, files } => {
                assert_eq!(name, "submit");
                assert_eq!(files, vec!["dup.c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_macro_redefined_in_same_file_fails() {
        let src = "#ifdef A\n#define SEND_X new_x_event()\n#else\n#define SEND_X new_y_event()\n#endif\n";
        let lexed = lex(src);
        let err = extract_submit_callables("send.h", &lexed).unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(err, EvpropError::DuplicateCallable { ref name, .. } if name == "SEND_X"));
    }

    #[test]
    fn test_function_redefined_in_same_file_fails() {
        let src = "void send(void) { new_a_event(); }\nvoid send(void) { new_b_event(); }\n";
        let lexed = lex(src);
        let err = extract_submit_callables("util.c", &lexed).unwrap_err();
        match err {
            EvpropError::DuplicateCallable { name, files } => {
                assert_eq!(name, "send");
                assert_eq!(files, vec!["util.c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_quiet_redefinition_is_ignored() {
        let src = "#ifdef A\n#define SEND_X new_x_event()\n#else\n#define SEND_X 0\n#endif\n";
        let lexed = lex(src);
        let defs = extract_submit_callables("send.h", &lexed).unwrap();
        assert_eq!(names(&defs), vec!["SEND_X"]);
    }

    #[test]
    fn test_define_helpers() {
        assert_eq!(parse_define("#define FOO(x) x"), Some(("FOO", true)));
        assert_eq!(parse_define("# define FOO (x)"), Some(("FOO", false)));
        assert_eq!(parse_define("#include \"a.h\""), None);
        assert_eq!(define_replacement("#define MODULE leds"), Some("leds"));
        assert_eq!(define_replacement("#define MODULE"), None);
        assert_eq!(define_replacement("#define F(x) x"), None);
    }
}
