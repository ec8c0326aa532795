//! Tokenizer for bundled build scripts.
//!
//! Produces the whole token stream up front. Regular expression literals are
//! told apart from division by the previous significant token, and template
//! literals are scanned as a single token.

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    /// Identifier or keyword
    Word(String),
    Str(String),
    Num(f64),
    /// Template literal, with its cooked text when it has no substitutions
    Template(Option<String>),
    Regex,
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    /// A line terminator separates this token from the previous one
    pub newline_before: bool,
}

/// Longest first, so the first prefix match is the right one
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

/// Keywords after which a `/` starts a regular expression
const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

pub(super) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer { src, pos: 0 };
    if lexer.rest().starts_with("#!") {
        lexer.skip_line();
    }

    let mut tokens: Vec<Token> = Vec::new();
    let mut parens = HeaderParens::default();
    loop {
        let prev = tokens.last().map(|t| &t.kind);
        let token = lexer.next_token(parens.regex_allowed(prev))?;
        parens.track(prev, &token.kind);
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}'
}

/// Keywords whose parenthesized header is followed by a statement
const HEADER_WORDS: &[&str] = &["if", "while", "for", "with"];

/// Open parentheses, remembering which ones start a statement header.
///
/// A `/` after `if (x)` begins a regular expression, after `f(x)` a division.
#[derive(Debug, Default)]
struct HeaderParens {
    open: Vec<bool>,
    closed_header: bool,
}

impl HeaderParens {
    fn regex_allowed(&self, prev: Option<&TokenKind>) -> bool {
        match prev {
            None => true,
            Some(TokenKind::Word(w)) => REGEX_PRECEDING_WORDS.contains(&w.as_str()),
            Some(TokenKind::Punct(")")) => self.closed_header,
            Some(TokenKind::Punct(p)) => !matches!(*p, "]" | "++" | "--"),
            Some(_) => false,
        }
    }

    fn track(&mut self, prev: Option<&TokenKind>, kind: &TokenKind) {
        self.closed_header = false;
        match kind {
            TokenKind::Punct("(") => {
                let header = matches!(
                    prev,
                    Some(TokenKind::Word(w)) if HEADER_WORDS.contains(&w.as_str())
                );
                self.open.push(header);
            }
            TokenKind::Punct(")") => self.closed_header = self.open.pop().unwrap_or(false),
            _ => {}
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_line(&mut self) {
        let rest = self.rest();
        self.pos += rest.find(is_line_terminator).unwrap_or(rest.len());
    }

    /// Skip whitespace and comments, reporting whether a line break was crossed
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                self.skip_line();
            } else if let Some(inner) = rest.strip_prefix("/*") {
                let end = inner.find("*/").ok_or(ParseError::Unterminated {
                    what: "comment",
                    offset: self.pos,
                })?;
                newline |= inner[..end].contains(is_line_terminator);
                self.pos += end + 4;
            } else {
                match self.peek() {
                    Some(c) if is_line_terminator(c) => {
                        newline = true;
                        self.bump();
                    }
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                        self.bump();
                    }
                    _ => return Ok(newline),
                }
            }
        }
    }

    fn next_token(&mut self, regex_ok: bool) -> Result<Token, ParseError> {
        let newline_before = self.skip_trivia()?;
        let offset = self.pos;

        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(q @ ('"' | '\'')) => TokenKind::Str(self.string(q)?),
            Some('`') => TokenKind::Template(self.template()?),
            Some(c) if c.is_ascii_digit() => TokenKind::Num(self.number()?),
            Some('.') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                TokenKind::Num(self.number()?)
            }
            Some('/') if regex_ok => {
                self.regex()?;
                TokenKind::Regex
            }
            Some(c) if is_ident_start(c) => TokenKind::Word(self.take_while(is_ident_part).to_string()),
            Some(c) => TokenKind::Punct(self.punct(c)?),
        };

        Ok(Token {
            kind,
            offset,
            newline_before,
        })
    }

    fn punct(&mut self, c: char) -> Result<&'static str, ParseError> {
        let rest = self.rest();
        let found = PUNCTUATORS.iter().copied().find(|p| {
            // `a?.5:b` is a conditional, not optional chaining
            rest.starts_with(p)
                && !(*p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()))
        });

        match found {
            Some(p) => {
                self.pos += p.len();
                Ok(p)
            }
            None => Err(ParseError::UnexpectedChar {
                ch: c,
                offset: self.pos,
            }),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out, start)?,
                Some(c) if c != '\n' && c != '\r' => out.push(c),
                _ => {
                    return Err(ParseError::Unterminated {
                        what: "string",
                        offset: start,
                    })
                }
            }
        }
    }

    fn template(&mut self) -> Result<Option<String>, ParseError> {
        let start = self.pos;
        self.bump();
        let mut cooked = String::new();
        let mut substitutions = false;
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::Unterminated {
                        what: "template",
                        offset: start,
                    })
                }
                Some('`') => return Ok((!substitutions).then_some(cooked)),
                Some('\\') => self.escape(&mut cooked, start)?,
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    substitutions = true;
                    self.skip_substitution(start)?;
                }
                Some(c) => cooked.push(c),
            }
        }
    }

    /// Skip a `${...}` body, which may nest strings, templates and braces
    fn skip_substitution(&mut self, start: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut prev = TokenKind::Punct("{");
        let mut parens = HeaderParens::default();
        loop {
            let token = self.next_token(parens.regex_allowed(Some(&prev)))?;
            parens.track(Some(&prev), &token.kind);
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::Unterminated {
                        what: "template",
                        offset: start,
                    })
                }
                TokenKind::Punct("{") => depth += 1,
                TokenKind::Punct("}") if depth == 0 => return Ok(()),
                TokenKind::Punct("}") => depth -= 1,
                _ => {}
            }
            prev = token.kind;
        }
    }

    fn escape(&mut self, out: &mut String, start: usize) -> Result<(), ParseError> {
        let c = self.bump().ok_or(ParseError::Unterminated {
            what: "string",
            offset: start,
        })?;

        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            'x' => match self.hex_digits(2) {
                Some(code) => push_code_point(out, code),
                None => out.push('x'),
            },
            'u' => self.unicode_escape(out),
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn unicode_escape(&mut self, out: &mut String) {
        if self.peek() == Some('{') {
            let rest = self.rest();
            if let Some(end) = rest.find('}') {
                if let Ok(code) = u32::from_str_radix(&rest[1..end], 16) {
                    self.pos += end + 1;
                    push_code_point(out, code);
                    return;
                }
            }
            out.push('u');
            return;
        }

        let Some(unit) = self.hex_digits(4) else {
            out.push('u');
            return;
        };

        // Surrogate pair spelled as two escapes
        if (0xD800..0xDC00).contains(&unit) && self.rest().starts_with("\\u") {
            let save = self.pos;
            self.pos += 2;
            match self.hex_digits(4) {
                Some(low) if (0xDC00..0xE000).contains(&low) => {
                    push_code_point(out, 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00));
                    return;
                }
                _ => self.pos = save,
            }
        }
        push_code_point(out, unit);
    }

    fn hex_digits(&mut self, count: usize) -> Option<u32> {
        let digits = self.rest().get(..count)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        self.pos += count;
        Some(value)
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let radix = match self.rest().get(..2) {
            Some("0x" | "0X") => 16,
            Some("0o" | "0O") => 8,
            Some("0b" | "0B") => 2,
            _ => 10,
        };

        if radix != 10 {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let mut value = 0f64;
            for c in digits.trim_end_matches('n').chars().filter(|&c| c != '_') {
                let digit = c.to_digit(radix).ok_or(ParseError::UnexpectedChar {
                    ch: c,
                    offset: start,
                })?;
                value = value * f64::from(radix) + f64::from(digit);
            }
            return Ok(value);
        }

        let is_digit = |c: char| c.is_ascii_digit() || c == '_';
        let mut text: String = self.take_while(is_digit).to_string();
        if self.peek() == Some('.') {
            self.bump();
            text.push('.');
            text.push_str(self.take_while(is_digit));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let rest = &self.rest()[1..];
            let signed = rest.starts_with(|c: char| c == '+' || c == '-');
            let digits_at = usize::from(signed);
            if rest[digits_at..].starts_with(|c: char| c.is_ascii_digit()) {
                self.pos += 1 + digits_at;
                text.push('e');
                if signed {
                    text.push_str(&rest[..1]);
                }
                text.push_str(self.take_while(is_digit));
            }
        }
        // BigInt suffix
        if self.peek() == Some('n') {
            self.bump();
        }

        text.retain(|c| c != '_');
        text.parse::<f64>().map_err(|_| ParseError::UnexpectedChar {
            ch: self.src[start..].chars().next().unwrap_or('0'),
            offset: start,
        })
    }

    fn regex(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                Some('\\') => {
                    if self.peek().is_some_and(|c| !is_line_terminator(c)) {
                        self.bump();
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(c) if !is_line_terminator(c) => {}
                _ => {
                    return Err(ParseError::Unterminated {
                        what: "regular expression",
                        offset: start,
                    })
                }
            }
        }
        self.take_while(is_ident_part);
        Ok(())
    }
}

fn push_code_point(out: &mut String, code: u32) {
    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_punctuators_longest_match() {
        assert_eq!(
            kinds("a>>>=b=>c"),
            vec![
                TokenKind::Word("a".into()),
                TokenKind::Punct(">>>="),
                TokenKind::Word("b".into()),
                TokenKind::Punct("=>"),
                TokenKind::Word("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_optional_chain_vs_conditional_decimal() {
        let tokens = kinds("a?.5:b");
        assert_eq!(tokens[1], TokenKind::Punct("?"));
        assert_eq!(tokens[2], TokenKind::Num(0.5));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r#"'it\'s' "\x41B\u{43}\n" '😀'"#);
        assert_eq!(tokens[0], TokenKind::Str("it's".into()));
        assert_eq!(tokens[1], TokenKind::Str("ABC\n".into()));
        assert_eq!(tokens[2], TokenKind::Str("\u{1F600}".into()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0x1F 0b101 0o17 1_000 1.5e3 .25 7n"),
            vec![
                TokenKind::Num(31.0),
                TokenKind::Num(5.0),
                TokenKind::Num(15.0),
                TokenKind::Num(1000.0),
                TokenKind::Num(1500.0),
                TokenKind::Num(0.25),
                TokenKind::Num(7.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_regex_versus_division() {
        let division = kinds("a / b / c");
        assert!(division.contains(&TokenKind::Punct("/")));
        assert!(!division.contains(&TokenKind::Regex));

        let regex = kinds("x = /[/]+\\//g.test(y)");
        assert_eq!(regex[2], TokenKind::Regex);
        assert_eq!(regex[3], TokenKind::Punct("."));
    }

    #[test]
    fn test_regex_after_statement_header() {
        let tokens = kinds("if (f(x)) /re/.test(y); while (a) /b/g.exec(c)");
        assert_eq!(tokens[7], TokenKind::Regex);
        assert_eq!(tokens.iter().filter(|k| **k == TokenKind::Regex).count(), 2);
        assert!(!tokens.contains(&TokenKind::Punct("/")));

        let division = kinds("g(x) / 2 / (y) / 3");
        assert_eq!(division.iter().filter(|k| **k == TokenKind::Punct("/")).count(), 3);
        assert!(!division.contains(&TokenKind::Regex));
    }

    #[test]
    fn test_template_with_nested_substitution() {
        let tokens = kinds("`a${ {b: `c${d}`}.b }e` + `plain`");
        assert_eq!(tokens[0], TokenKind::Template(None));
        assert_eq!(tokens[1], TokenKind::Punct("+"));
        assert_eq!(tokens[2], TokenKind::Template(Some("plain".into())));
    }

    #[test]
    fn test_comments_and_newline_flag() {
        let tokens = tokenize("a /* x\n */ b // tail\nc").expect("tokenize");
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(tokens[2].newline_before);
        assert_eq!(tokens[2].kind, TokenKind::Word("c".into()));
    }

    #[test]
    fn test_unterminated_inputs() {
        assert!(matches!(
            tokenize("'abc"),
            Err(ParseError::Unterminated { what: "string", .. })
        ));
        assert!(matches!(
            tokenize("/* open"),
            Err(ParseError::Unterminated { what: "comment", .. })
        ));
        assert!(matches!(
            tokenize("`x${y"),
            Err(ParseError::Unterminated { what: "template", .. })
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("a \\ b"),
            Err(ParseError::UnexpectedChar { ch: '\\', offset: 2 })
        );
    }
}
