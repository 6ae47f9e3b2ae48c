//! Surface tokenizer for C-like firmware sources.
//!
//! This is not a C lexer in the compiler sense. It recognises just enough
//! structure for the extraction rules to stay well defined on malformed input:
//!
//! - comments are dropped (`//` and `/* */`)
//! - string and character literals become single opaque tokens
//! - preprocessor lines (including `\` continuations) are kept as
//!   [`Directive`]s, and their tokens are tagged with the directive index
//! - everything else becomes identifier, number or punctuation tokens
//!
//! Non-ASCII bytes outside literals are skipped. Token text always borrows
//! from the input text.

use std::ops::Range;

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct(char),
}

/// A single token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// 1-indexed line where the token starts
    pub line: usize,
    /// Index into [`LexedSource::directives`] for tokens on a preprocessor line
    pub directive: Option<usize>,
}

impl<'a> Token<'a> {
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.is_ident() && self.text == word
    }
}

/// One logical preprocessor line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive text with comments removed, continuations joined and
    /// whitespace runs collapsed to a single space
    pub text: String,
    /// 1-indexed line of the `#`
    pub line: usize,
    /// Range of this directive's tokens in [`LexedSource::tokens`]
    pub tokens: Range<usize>,
}

/// Token stream plus preprocessor lines of one source file.
#[derive(Debug, Clone, Default)]
pub struct LexedSource<'a> {
    pub tokens: Vec<Token<'a>>,
    pub directives: Vec<Directive>,
}

impl<'a> LexedSource<'a> {
    /// Tokens outside preprocessor lines, in source order.
    pub fn code_tokens(&self) -> Vec<Token<'a>> {
        self.tokens
            .iter()
            .filter(|t| t.directive.is_none())
            .copied()
            .collect()
    }

    /// Tokens belonging to one directive.
    pub fn directive_tokens(&self, directive: &Directive) -> &[Token<'a>] {
        &self.tokens[directive.tokens.clone()]
    }

    /// All identifier tokens, code and preprocessor alike.
    pub fn identifiers(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tokens.iter().filter(|t| t.is_ident()).map(|t| t.text)
    }
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Length of a line continuation (`\` + newline, optionally `\r\n`) at `i`.
#[inline]
fn continuation_len(bytes: &[u8], i: usize) -> Option<usize> {
    if bytes.get(i) != Some(&b'\\') {
        return None;
    }
    match (bytes.get(i + 1), bytes.get(i + 2)) {
        (Some(b'\n'), _) => Some(2),
        (Some(b'\r'), Some(b'\n')) => Some(3),
        _ => None,
    }
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    line_start: bool,
    directive: Option<usize>,
    out: LexedSource<'a>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            line_start: true,
            directive: None,
            out: LexedSource {
                tokens: Vec::with_capacity(src.len() / 4),
                directives: Vec::new(),
            },
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Whitespace or a comment inside a directive separates words.
    fn directive_space(&mut self) {
        if let Some(idx) = self.directive {
            let text = &mut self.out.directives[idx].text;
            if !text.ends_with(' ') {
                text.push(' ');
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        let text = &self.src[start..self.pos];
        if let Some(idx) = self.directive {
            let directive = &mut self.out.directives[idx];
            directive.text.push_str(text);
            directive.tokens.end = self.out.tokens.len() + 1;
        }
        self.out.tokens.push(Token {
            kind,
            text,
            line,
            directive: self.directive,
        });
        self.line_start = false;
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            if self.bytes[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    /// Scans a quoted literal. Unterminated literals end at the newline.
    fn scan_literal(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            if let Some(len) = continuation_len(self.bytes, self.pos) {
                self.pos += len;
                self.line += 1;
                continue;
            }
            match b {
                b'\\' => self.pos += 2,
                b'\n' => return,
                _ if b == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn run(mut self) -> LexedSource<'a> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];

            if let Some(len) = continuation_len(self.bytes, self.pos) {
                self.pos += len;
                self.line += 1;
                self.directive_space();
                continue;
            }

            match b {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = true;
                    self.directive = None;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => {
                    self.pos += 1;
                    self.directive_space();
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    self.skip_line_comment();
                    self.directive_space();
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.skip_block_comment();
                    self.directive_space();
                }
                b'#' if self.line_start && self.directive.is_none() => {
                    let idx = self.out.directives.len();
                    let first = self.out.tokens.len();
                    self.out.directives.push(Directive {
                        text: String::new(),
                        line: self.line,
                        tokens: first..first,
                    });
                    self.directive = Some(idx);
                    let start = self.pos;
                    self.pos += 1;
                    self.push(TokenKind::Punct('#'), start, self.line);
                }
                b'"' | b'\'' => {
                    let (start, line) = (self.pos, self.line);
                    self.scan_literal(b);
                    let kind = if b == b'"' { TokenKind::Str } else { TokenKind::Char };
                    self.push(kind, start, line);
                }
                _ if is_ident_start(b) => {
                    let start = self.pos;
                    while self.peek(0).is_some_and(is_ident_continue) {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Ident, start, self.line);
                }
                _ if b.is_ascii_digit() => {
                    let start = self.pos;
                    while self
                        .peek(0)
                        .is_some_and(|c| is_ident_continue(c) || c == b'.')
                    {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Number, start, self.line);
                }
                _ if b.is_ascii_punctuation() => {
                    let start = self.pos;
                    self.pos += 1;
                    self.push(TokenKind::Punct(b as char), start, self.line);
                }
                _ => {
                    // Non-ASCII outside literals carries no structure.
                    self.pos += 1;
                }
            }
        }

        for directive in &mut self.out.directives {
            let trimmed = directive.text.trim_end().len();
            directive.text.truncate(trimmed);
        }
        self.out
    }
}

/// Tokenizes one source file.
pub fn lex(source: &str) -> LexedSource<'_> {
    Lexer::new(source).run()
}

/// Finds the token closing the group opened at `open`.
///
/// `tokens[open]` must be `(`, `[` or `{`. Only the bracket kind that opened
/// the group is counted. Returns `None` when the group is never closed.
pub fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let (open_c, close_c) = match tokens.get(open)?.kind {
        TokenKind::Punct('(') => ('(', ')'),
        TokenKind::Punct('[') => ('[', ']'),
        TokenKind::Punct('{') => ('{', '}'),
        _ => return None,
    };

    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_punct(open_c) {
            depth += 1;
        } else if tok.is_punct(close_c) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Splits the tokens strictly between `open` and `close` on top-level commas.
///
/// An empty group yields no arguments; `f(a,)` yields `a` and an empty slice.
pub fn split_args<'t, 'a>(tokens: &'t [Token<'a>], open: usize, close: usize) -> Vec<&'t [Token<'a>]> {
    let inner = &tokens[open + 1..close];
    if inner.is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, tok) in inner.iter().enumerate() {
        match tok.kind {
            TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => depth += 1,
            TokenKind::Punct(')') | TokenKind::Punct(']') | TokenKind::Punct('}') => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Punct(',') if depth == 0 => {
                args.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    args.push(&inner[start..]);
    args
}

/// Joins an argument's tokens into a bare name: parentheses and whitespace
/// around and between the tokens are dropped.
pub fn bare_argument(arg: &[Token<'_>]) -> String {
    arg.iter()
        .filter(|t| !t.is_punct('(') && !t.is_punct(')'))
        .map(|t| t.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_comments_are_dropped() {
        let lexed = lex("a /* new_x_event */ b // c\nd");
        assert_eq!(texts(&lexed.tokens), vec!["a", "b", "d"]);
        assert_eq!(lexed.tokens[2].line, 2);
    }

    #[test]
    fn test_string_literal_is_opaque() {
        let lexed = lex(r#"log("new_led_event \" x"); y"#);
        let kinds: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Punct('('),
                TokenKind::Str,
                TokenKind::Punct(')'),
                TokenKind::Punct(';'),
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_directive_with_continuation() {
        let src = "#define SEND(x) \\\n\tnew_foo_event(x) /* c */\nint a;";
        let lexed = lex(src);
        assert_eq!(lexed.directives.len(), 1);
        let d = &lexed.directives[0];
        assert_eq!(d.text, "#define SEND(x) new_foo_event(x)");
        assert_eq!(d.line, 1);
        assert!(texts(lexed.directive_tokens(d)).contains(&"new_foo_event"));

        let code = lexed.code_tokens();
        assert_eq!(texts(&code), vec!["int", "a", ";"]);
        assert_eq!(code[0].line, 3);
    }

    #[test]
    fn test_hash_not_at_line_start_is_punct() {
        let lexed = lex("x = a # b;\n  #include \"leds_def.h\"\n");
        assert!(lexed.tokens[0].directive.is_none());
        assert_eq!(lexed.directives.len(), 1);
        assert_eq!(lexed.directives[0].text, "#include \"leds_def.h\"");
    }

    #[test]
    fn test_matching_close_and_split_args() {
        let lexed = lex("EVENT_SUBSCRIBE(MODULE, f(a, b), (c));");
        let toks = lexed.code_tokens();
        let close = matching_close(&toks, 1).unwrap();
        assert!(toks[close + 1].is_punct(';'));

        let args = split_args(&toks, 1, close);
        assert_eq!(args.len(), 3);
        assert_eq!(bare_argument(args[0]), "MODULE");
        assert_eq!(bare_argument(args[2]), "c");
    }

    #[test]
    fn test_unbalanced_group() {
        let lexed = lex("foo(a, b");
        let toks = lexed.code_tokens();
        assert_eq!(matching_close(&toks, 1), None);
    }

    #[test]
    fn test_non_ascii_is_skipped() {
        let lexed = lex("é a ü");
        assert_eq!(texts(&lexed.tokens), vec!["a"]);
    }
}
