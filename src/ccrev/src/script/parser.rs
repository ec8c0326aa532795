//! Recursive-descent parser for the script subset found in web builds.
//!
//! Statements are parsed by keyword dispatch and expressions by precedence
//! climbing. The parser is tolerant where bundles are sloppy (automatic
//! semicolons, trailing commas) but never guesses past a syntax error.
//! Minifier spellings `!0`, `!1` and signed numbers fold into literals.

use super::lexer::{tokenize, Token, TokenKind};
use super::{
    format_number, Function, Literal, MemberProperty, Node, ObjectEntry, ParseError, PropertyKey,
    ScriptParser, SyntaxTree,
};

/// Default nesting limit of [`LiteParser`]
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Words that never act as a binding, label or arrow parameter
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with",
];

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||=",
    "??=",
];

type PResult<T> = Result<T, ParseError>;

/// Built-in tolerant parser
#[derive(Debug, Clone)]
pub struct LiteParser {
    max_depth: usize,
}

impl Default for LiteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteParser {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit syntactic nesting, failing with [`ParseError::TooDeep`] beyond it
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl ScriptParser for LiteParser {
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let mut parser = Parser {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
            max_depth: self.max_depth,
        };

        let mut body = Vec::new();
        while !parser.at_eof() {
            body.push(parser.statement()?);
        }
        Ok(SyntaxTree { body })
    }
}

struct Parser {
    /// Always ends with an `Eof` token
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    // --- token helpers ---

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn punct_at(&self, n: usize) -> Option<&'static str> {
        match self.peek_at(n).kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn punct(&self) -> Option<&'static str> {
        self.punct_at(0)
    }

    fn is_punct(&self, p: &str) -> bool {
        self.punct() == Some(p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        let hit = self.is_punct(p);
        if hit {
            self.advance();
        }
        hit
    }

    fn expect_punct(&mut self, p: &'static str) -> PResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(p))
        }
    }

    fn word_at(&self, n: usize) -> Option<&str> {
        match &self.peek_at(n).kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    fn word(&self) -> Option<&str> {
        self.word_at(0)
    }

    fn is_word(&self, w: &str) -> bool {
        self.word() == Some(w)
    }

    fn eat_word(&mut self, w: &str) -> bool {
        let hit = self.is_word(w);
        if hit {
            self.advance();
        }
        hit
    }

    fn expect_word(&mut self, w: &'static str) -> PResult<()> {
        if self.eat_word(w) {
            Ok(())
        } else {
            Err(self.unexpected(w))
        }
    }

    fn take_word(&mut self) -> Option<String> {
        let word = self.word().map(str::to_string);
        if word.is_some() {
            self.advance();
        }
        word
    }

    fn expect_string(&mut self) -> PResult<()> {
        if matches!(self.peek().kind, TokenKind::Str(_)) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("string"))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Word(w) => format!("'{}'", w),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Num(_) => "number".to_string(),
            TokenKind::Template(_) => "template".to_string(),
            TokenKind::Regex => "regular expression".to_string(),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Eof => "end of input".to_string(),
        };
        ParseError::UnexpectedToken {
            found,
            expected,
            offset: token.offset,
        }
    }

    /// Run one level of recursion under the depth limit
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// The current token cannot continue the statement
    fn statement_ends(&self) -> bool {
        self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before
    }

    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat_punct(";") || self.statement_ends() {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    /// Index of the `)` closing the `(` at token index `open`
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    // --- statements ---

    fn statement(&mut self) -> PResult<Node> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> PResult<Node> {
        if self.is_punct("{") {
            return self.block();
        }
        if self.eat_punct(";") {
            return Ok(Node::other("EmptyStatement", Vec::new()));
        }
        let Some(word) = self.word().map(str::to_string) else {
            return self.expression_statement();
        };

        match word.as_str() {
            "var" | "const" => self.variable_statement(),
            "let" if self.starts_binding(1) => self.variable_statement(),
            "function" => Ok(Node::Function(self.function()?)),
            "async" if self.is_async_function() => Ok(Node::Function(self.function()?)),
            "class" => self.class("ClassDeclaration"),
            "if" => {
                self.advance();
                let mut children = vec![self.paren_expression()?, self.statement()?];
                if self.eat_word("else") {
                    children.push(self.statement()?);
                }
                Ok(Node::other("IfStatement", children))
            }
            "for" => self.for_statement(),
            "while" | "with" => {
                self.advance();
                let kind = if word == "while" {
                    "WhileStatement"
                } else {
                    "WithStatement"
                };
                let children = vec![self.paren_expression()?, self.statement()?];
                Ok(Node::other(kind, children))
            }
            "do" => {
                self.advance();
                let body = self.statement()?;
                self.expect_word("while")?;
                let test = self.paren_expression()?;
                self.eat_punct(";");
                Ok(Node::other("DoWhileStatement", vec![body, test]))
            }
            "return" | "throw" => {
                self.advance();
                let mut children = Vec::new();
                if word == "throw" || !self.statement_ends() {
                    children.push(self.expression(false)?);
                }
                self.consume_semicolon()?;
                let kind = if word == "return" {
                    "ReturnStatement"
                } else {
                    "ThrowStatement"
                };
                Ok(Node::other(kind, children))
            }
            "break" | "continue" => {
                self.advance();
                if self.word().is_some() && !self.peek().newline_before {
                    self.advance();
                }
                self.consume_semicolon()?;
                let kind = if word == "break" {
                    "BreakStatement"
                } else {
                    "ContinueStatement"
                };
                Ok(Node::other(kind, Vec::new()))
            }
            "debugger" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Node::other("DebuggerStatement", Vec::new()))
            }
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "import" if !matches!(self.punct_at(1), Some("(" | ".")) => self.import_declaration(),
            "export" => self.export_declaration(),
            _ if self.punct_at(1) == Some(":") && !RESERVED.contains(&word.as_str()) => {
                self.advance();
                self.advance();
                Ok(Node::other("LabeledStatement", vec![self.statement()?]))
            }
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> PResult<Node> {
        let expr = self.expression(false)?;
        self.consume_semicolon()?;
        Ok(Node::other("ExpressionStatement", vec![expr]))
    }

    fn block_body(&mut self) -> PResult<Vec<Node>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn block(&mut self) -> PResult<Node> {
        Ok(Node::other("BlockStatement", self.block_body()?))
    }

    fn paren_expression(&mut self) -> PResult<Node> {
        self.expect_punct("(")?;
        let expr = self.expression(false)?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    /// `let` followed by something that can only be a declaration
    fn starts_binding(&self, n: usize) -> bool {
        self.word_at(n).is_some_and(|w| w != "in" && w != "instanceof")
            || matches!(self.punct_at(n), Some("[" | "{"))
    }

    fn is_async_function(&self) -> bool {
        self.is_word("async") && self.word_at(1) == Some("function") && !self.peek_at(1).newline_before
    }

    fn variable_statement(&mut self) -> PResult<Node> {
        let declaration = self.variable_declaration(false)?;
        self.consume_semicolon()?;
        Ok(declaration)
    }

    fn variable_declaration(&mut self, no_in: bool) -> PResult<Node> {
        self.advance();
        let mut children = Vec::new();
        loop {
            children.push(self.binding_target()?);
            if self.eat_punct("=") {
                children.push(self.assignment(no_in)?);
            }
            if !self.eat_punct(",") {
                return Ok(Node::other("VariableDeclaration", children));
            }
        }
    }

    /// Identifier or destructuring pattern
    fn binding_target(&mut self) -> PResult<Node> {
        if self.is_punct("[") || self.is_punct("{") {
            // patterns share the literal syntax
            return self.nested(|p| p.primary());
        }
        self.take_word()
            .map(Node::ident)
            .ok_or_else(|| self.unexpected("binding name"))
    }

    fn for_statement(&mut self) -> PResult<Node> {
        self.advance();
        self.eat_word("await");
        self.expect_punct("(")?;

        let mut kind = "ForStatement";
        let mut children = Vec::new();
        if !self.is_punct(";") {
            let is_declaration = self.is_word("var")
                || self.is_word("const")
                || (self.is_word("let") && self.starts_binding(1));
            let init = if is_declaration {
                self.variable_declaration(true)?
            } else {
                self.expression(true)?
            };
            children.push(init);

            if self.eat_word("in") {
                kind = "ForInStatement";
                children.push(self.expression(false)?);
            } else if self.eat_word("of") {
                kind = "ForOfStatement";
                children.push(self.assignment(false)?);
            }
        }

        if kind == "ForStatement" {
            self.expect_punct(";")?;
            if !self.is_punct(";") {
                children.push(self.expression(false)?);
            }
            self.expect_punct(";")?;
            if !self.is_punct(")") {
                children.push(self.expression(false)?);
            }
        }
        self.expect_punct(")")?;
        children.push(self.statement()?);
        Ok(Node::other(kind, children))
    }

    fn try_statement(&mut self) -> PResult<Node> {
        self.advance();
        let mut children = vec![self.block()?];
        if self.eat_word("catch") {
            if self.eat_punct("(") {
                children.push(self.binding_target()?);
                self.expect_punct(")")?;
            }
            children.push(self.block()?);
        }
        if self.eat_word("finally") {
            children.push(self.block()?);
        }
        Ok(Node::other("TryStatement", children))
    }

    fn switch_statement(&mut self) -> PResult<Node> {
        self.advance();
        let mut children = vec![self.paren_expression()?];
        self.expect_punct("{")?;
        while !self.eat_punct("}") {
            if self.eat_word("case") {
                children.push(self.expression(false)?);
            } else if !self.eat_word("default") {
                return Err(self.unexpected("'case' or 'default'"));
            }
            self.expect_punct(":")?;
            while !(self.is_word("case")
                || self.is_word("default")
                || self.is_punct("}")
                || self.at_eof())
            {
                children.push(self.statement()?);
            }
        }
        Ok(Node::other("SwitchStatement", children))
    }

    fn import_declaration(&mut self) -> PResult<Node> {
        self.advance();
        while !matches!(self.peek().kind, TokenKind::Str(_)) {
            if self.at_eof() {
                return Err(self.unexpected("module specifier"));
            }
            self.advance();
        }
        self.advance();
        if (self.is_word("assert") || self.is_word("with")) && !self.peek().newline_before {
            self.advance();
            self.object_literal()?;
        }
        self.consume_semicolon()?;
        Ok(Node::other("ImportDeclaration", Vec::new()))
    }

    fn export_declaration(&mut self) -> PResult<Node> {
        self.advance();

        if self.eat_word("default") {
            let child = if self.is_word("function") || self.is_async_function() {
                Node::Function(self.function()?)
            } else if self.is_word("class") {
                self.class("ClassDeclaration")?
            } else {
                let expr = self.assignment(false)?;
                self.consume_semicolon()?;
                expr
            };
            return Ok(Node::other("ExportDefaultDeclaration", vec![child]));
        }

        if self.eat_punct("*") {
            if self.eat_word("as") {
                self.property_word()?;
            }
            self.expect_word("from")?;
            self.expect_string()?;
            self.consume_semicolon()?;
            return Ok(Node::other("ExportAllDeclaration", Vec::new()));
        }

        if self.eat_punct("{") {
            while !self.eat_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("'}'"));
                }
                self.advance();
            }
            if self.eat_word("from") {
                self.expect_string()?;
            }
            self.consume_semicolon()?;
            return Ok(Node::other("ExportNamedDeclaration", Vec::new()));
        }

        let declaration = self.statement()?;
        Ok(Node::other("ExportNamedDeclaration", vec![declaration]))
    }

    // --- functions and classes ---

    /// `[async] function [*] [name] (params) { body }`
    fn function(&mut self) -> PResult<Function> {
        self.eat_word("async");
        self.expect_word("function")?;
        self.eat_punct("*");
        let name = self.take_word();
        let params = self.formal_parameters()?;
        let body = self.function_body()?;
        Ok(Function {
            name,
            params,
            arrow: false,
            body,
        })
    }

    fn formal_parameters(&mut self) -> PResult<Vec<Node>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.parameter()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    fn parameter(&mut self) -> PResult<Node> {
        if self.eat_punct("...") {
            return Ok(Node::other("RestElement", vec![self.binding_target()?]));
        }
        let target = self.binding_target()?;
        if self.eat_punct("=") {
            let default = self.assignment(false)?;
            return Ok(Node::other("AssignmentPattern", vec![target, default]));
        }
        Ok(target)
    }

    fn function_body(&mut self) -> PResult<Vec<Node>> {
        self.nested(|p| p.block_body())
    }

    /// Arrow function starting at the current token, if there is one
    fn try_arrow(&mut self, no_in: bool) -> PResult<Option<Node>> {
        let is_async = self.is_word("async")
            && !self.peek_at(1).newline_before
            && (self.word_at(1).is_some() || self.punct_at(1) == Some("("));
        let start = usize::from(is_async);

        let arrow_at = match &self.peek_at(start).kind {
            TokenKind::Word(w) if !RESERVED.contains(&w.as_str()) => start + 1,
            TokenKind::Punct("(") => match self.matching_paren(self.pos + start) {
                Some(close) => close - self.pos + 1,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let arrow = self.peek_at(arrow_at);
        if arrow.kind != TokenKind::Punct("=>") || arrow.newline_before {
            return Ok(None);
        }

        if is_async {
            self.advance();
        }
        let params = if self.is_punct("(") {
            self.formal_parameters()?
        } else {
            self.take_word().map(Node::ident).into_iter().collect()
        };
        self.expect_punct("=>")?;

        let body = if self.is_punct("{") {
            self.function_body()?
        } else {
            vec![self.assignment(no_in)?]
        };
        Ok(Some(Node::Function(Function {
            name: None,
            params,
            arrow: true,
            body,
        })))
    }

    fn class(&mut self, kind: &'static str) -> PResult<Node> {
        self.expect_word("class")?;
        if self.word().is_some_and(|w| w != "extends") {
            self.advance();
        }

        let mut children = Vec::new();
        if self.eat_word("extends") {
            children.push(self.nested(|p| p.call_member())?);
        }

        self.expect_punct("{")?;
        while !self.eat_punct("}") {
            if self.eat_punct(";") {
                continue;
            }
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            children.push(self.class_member()?);
        }
        Ok(Node::other(kind, children))
    }

    /// The token at `n` ends a member name, so the word before it is the name
    fn ends_member_name(&self, n: usize) -> bool {
        matches!(self.punct_at(n), Some("(" | "=" | ";" | "}" | ":" | ","))
    }

    fn class_member(&mut self) -> PResult<Node> {
        if self.is_word("static") && self.punct_at(1) == Some("{") {
            self.advance();
            return self.block();
        }
        if self.is_word("static") && !self.ends_member_name(1) {
            self.advance();
        }

        let modified = matches!(self.word(), Some("get" | "set" | "async")) && !self.ends_member_name(1);
        if modified {
            self.advance();
        }
        let generator = self.eat_punct("*");
        let key = self.property_key()?;

        if modified || generator || self.is_punct("(") {
            return self.method(key);
        }

        let mut children = Vec::new();
        if let PropertyKey::Computed(expr) = key {
            children.push(*expr);
        }
        if self.eat_punct("=") {
            children.push(self.assignment(false)?);
        }
        self.consume_semicolon()?;
        Ok(Node::other("PropertyDefinition", children))
    }

    fn method(&mut self, key: PropertyKey) -> PResult<Node> {
        let params = self.formal_parameters()?;
        let body = self.function_body()?;
        Ok(Node::Function(Function {
            name: key.name().map(str::to_string),
            params,
            arrow: false,
            body,
        }))
    }

    // --- expressions ---

    fn expression(&mut self, no_in: bool) -> PResult<Node> {
        let first = self.assignment(no_in)?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.assignment(no_in)?);
        }
        Ok(Node::other("SequenceExpression", items))
    }

    fn assignment(&mut self, no_in: bool) -> PResult<Node> {
        self.nested(|p| p.assignment_inner(no_in))
    }

    fn assignment_inner(&mut self, no_in: bool) -> PResult<Node> {
        if let Some(arrow) = self.try_arrow(no_in)? {
            return Ok(arrow);
        }

        if self.is_word("yield") {
            self.advance();
            self.eat_punct("*");
            let mut children = Vec::new();
            if !self.statement_ends()
                && !matches!(self.punct(), Some(")" | "]" | "," | ":"))
                && !self.is_word("in")
            {
                children.push(self.assignment(no_in)?);
            }
            return Ok(Node::other("YieldExpression", children));
        }

        let target = self.conditional(no_in)?;
        match self.punct() {
            Some(op) if ASSIGN_OPS.contains(&op) => {
                self.advance();
                let value = self.assignment(no_in)?;
                Ok(Node::other("AssignmentExpression", vec![target, value]))
            }
            _ => Ok(target),
        }
    }

    fn conditional(&mut self, no_in: bool) -> PResult<Node> {
        let test = self.binary(0, no_in)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment(false)?;
        self.expect_punct(":")?;
        let alternate = self.assignment(no_in)?;
        Ok(Node::other(
            "ConditionalExpression",
            vec![test, consequent, alternate],
        ))
    }

    /// Precedence of the binary operator at the current token
    fn binary_precedence(&self, no_in: bool) -> Option<u8> {
        match &self.peek().kind {
            TokenKind::Punct(op) => match *op {
                "??" => Some(1),
                "||" => Some(2),
                "&&" => Some(3),
                "|" => Some(4),
                "^" => Some(5),
                "&" => Some(6),
                "==" | "!=" | "===" | "!==" => Some(7),
                "<" | ">" | "<=" | ">=" => Some(8),
                "<<" | ">>" | ">>>" => Some(9),
                "+" | "-" => Some(10),
                "*" | "/" | "%" => Some(11),
                "**" => Some(12),
                _ => None,
            },
            TokenKind::Word(w) if w == "instanceof" || (w == "in" && !no_in) => Some(8),
            _ => None,
        }
    }

    fn binary(&mut self, min_precedence: u8, no_in: bool) -> PResult<Node> {
        let mut left = self.unary()?;
        while let Some(precedence) = self.binary_precedence(no_in) {
            if precedence < min_precedence {
                break;
            }
            let right_assoc = self.is_punct("**");
            self.advance();
            let next = if right_assoc { precedence } else { precedence + 1 };
            let right = self.nested(|p| p.binary(next, no_in))?;
            let kind = if precedence <= 3 {
                "LogicalExpression"
            } else {
                "BinaryExpression"
            };
            left = Node::other(kind, vec![left, right]);
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Node> {
        self.nested(|p| p.unary_inner())
    }

    fn unary_inner(&mut self) -> PResult<Node> {
        let (kind, op) = match &self.peek().kind {
            TokenKind::Punct(p) if matches!(*p, "++" | "--") => ("UpdateExpression", *p),
            TokenKind::Punct(p) if matches!(*p, "!" | "~" | "+" | "-") => ("UnaryExpression", *p),
            TokenKind::Word(w) if matches!(w.as_str(), "typeof" | "void" | "delete") => {
                ("UnaryExpression", "")
            }
            TokenKind::Word(w) if w == "await" && self.await_has_operand() => ("AwaitExpression", ""),
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;

        Ok(match (op, operand) {
            ("-", Node::Literal {
                value: Literal::Number(n),
            }) => Node::literal(Literal::Number(-n)),
            ("+", Node::Literal {
                value: Literal::Number(n),
            }) => Node::literal(Literal::Number(n)),
            ("!", Node::Literal {
                value: Literal::Number(n),
            }) => Node::literal(Literal::Bool(n == 0.0)),
            (_, operand) => Node::other(kind, vec![operand]),
        })
    }

    fn await_has_operand(&self) -> bool {
        let next = self.peek_at(1);
        match &next.kind {
            TokenKind::Word(w) => !matches!(w.as_str(), "in" | "of" | "instanceof"),
            TokenKind::Str(_) | TokenKind::Num(_) | TokenKind::Template(_) | TokenKind::Regex => true,
            TokenKind::Punct(p) => matches!(*p, "(" | "[" | "{" | "!" | "~" | "++" | "--"),
            TokenKind::Eof => false,
        }
    }

    fn postfix(&mut self) -> PResult<Node> {
        let expr = self.call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.peek().newline_before {
            self.advance();
            return Ok(Node::other("UpdateExpression", vec![expr]));
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> PResult<Node> {
        let mut expr = if self.is_word("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };

        loop {
            if let TokenKind::Template(_) = self.peek().kind {
                self.advance();
                expr = Node::other("TaggedTemplateExpression", vec![expr]);
                continue;
            }
            expr = match self.punct() {
                Some(".") => {
                    self.advance();
                    self.named_member(expr)?
                }
                Some("?.") => {
                    self.advance();
                    match self.punct() {
                        Some("(") => self.call(expr)?,
                        Some("[") => self.computed_member(expr)?,
                        _ => self.named_member(expr)?,
                    }
                }
                Some("[") => self.computed_member(expr)?,
                Some("(") => self.call(expr)?,
                _ => return Ok(expr),
            };
        }
    }

    fn new_expression(&mut self) -> PResult<Node> {
        self.advance();
        if self.eat_punct(".") {
            self.property_word()?;
            return Ok(Node::other("MetaProperty", Vec::new()));
        }

        let mut callee = if self.is_word("new") {
            self.nested(|p| p.new_expression())?
        } else {
            self.primary()?
        };
        loop {
            callee = match self.punct() {
                Some(".") => {
                    self.advance();
                    self.named_member(callee)?
                }
                Some("[") => self.computed_member(callee)?,
                _ => break,
            };
        }

        let mut children = vec![callee];
        if self.is_punct("(") {
            children.extend(self.arguments()?);
        }
        Ok(Node::other("NewExpression", children))
    }

    fn call(&mut self, callee: Node) -> PResult<Node> {
        Ok(Node::Call {
            callee: Box::new(callee),
            arguments: self.arguments()?,
        })
    }

    fn named_member(&mut self, object: Node) -> PResult<Node> {
        let name = self.property_word()?;
        Ok(Node::Member {
            object: Box::new(object),
            property: MemberProperty::Named(name),
        })
    }

    fn computed_member(&mut self, object: Node) -> PResult<Node> {
        self.expect_punct("[")?;
        let property = self.expression(false)?;
        self.expect_punct("]")?;
        Ok(Node::Member {
            object: Box::new(object),
            property: MemberProperty::Computed(Box::new(property)),
        })
    }

    /// Name after `.`, keywords included
    fn property_word(&mut self) -> PResult<String> {
        if self.eat_punct("#") {
            return Ok(format!("#{}", self.property_word()?));
        }
        self.take_word()
            .ok_or_else(|| self.unexpected("property name"))
    }

    fn arguments(&mut self) -> PResult<Vec<Node>> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.eat_punct(")") {
            arguments.push(self.spread_or_assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(arguments)
    }

    fn spread_or_assignment(&mut self) -> PResult<Node> {
        if self.eat_punct("...") {
            return Ok(Node::other("SpreadElement", vec![self.assignment(false)?]));
        }
        self.assignment(false)
    }

    fn primary(&mut self) -> PResult<Node> {
        let node = match &self.peek().kind {
            TokenKind::Num(n) => Node::literal(Literal::Number(*n)),
            TokenKind::Str(s) | TokenKind::Template(Some(s)) => {
                Node::literal(Literal::String(s.clone()))
            }
            TokenKind::Template(None) => Node::other("TemplateLiteral", Vec::new()),
            TokenKind::Regex => Node::other("RegExpLiteral", Vec::new()),
            TokenKind::Word(w) => {
                let word = w.clone();
                return self.word_primary(word);
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.expression(false)?;
                self.expect_punct(")")?;
                return Ok(expr);
            }
            TokenKind::Punct("[") => return self.array_literal(),
            TokenKind::Punct("{") => return self.object_literal(),
            TokenKind::Punct("#") => {
                self.advance();
                return Ok(Node::ident(format!("#{}", self.property_word()?)));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(node)
    }

    fn word_primary(&mut self, word: String) -> PResult<Node> {
        let node = match word.as_str() {
            "true" => Node::literal(Literal::Bool(true)),
            "false" => Node::literal(Literal::Bool(false)),
            "null" => Node::literal(Literal::Null),
            "this" => Node::other("ThisExpression", Vec::new()),
            "super" => Node::other("Super", Vec::new()),
            "import" => Node::other("ImportExpression", Vec::new()),
            "function" => return Ok(Node::Function(self.function()?)),
            "async" if self.is_async_function() => return Ok(Node::Function(self.function()?)),
            "class" => return self.class("ClassExpression"),
            _ => Node::ident(word),
        };
        self.advance();
        Ok(node)
    }

    fn array_literal(&mut self) -> PResult<Node> {
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct("]") {
                break;
            }
            if self.eat_punct(",") {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.spread_or_assignment()?));
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(Node::Array { elements })
    }

    fn object_literal(&mut self) -> PResult<Node> {
        self.expect_punct("{")?;
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            entries.push(self.object_entry()?);
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Node::Object { entries })
    }

    fn object_entry(&mut self) -> PResult<ObjectEntry> {
        if self.eat_punct("...") {
            return Ok(ObjectEntry {
                key: PropertyKey::Spread,
                value: self.assignment(false)?,
            });
        }

        let modified = matches!(self.word(), Some("get" | "set" | "async")) && !self.ends_member_name(1);
        if modified {
            self.advance();
        }
        let generator = self.eat_punct("*");
        let key = self.property_key()?;

        if modified || generator || self.is_punct("(") {
            let value = self.method(key.clone())?;
            return Ok(ObjectEntry { key, value });
        }

        if self.eat_punct(":") {
            return Ok(ObjectEntry {
                key,
                value: self.assignment(false)?,
            });
        }

        // shorthand, possibly with a default inside a destructuring pattern
        let PropertyKey::Named(name) = &key else {
            return Err(self.unexpected("':'"));
        };
        let mut value = Node::ident(name.clone());
        if self.eat_punct("=") {
            value = Node::other("AssignmentPattern", vec![value, self.assignment(false)?]);
        }
        Ok(ObjectEntry { key, value })
    }

    fn property_key(&mut self) -> PResult<PropertyKey> {
        let key = match &self.peek().kind {
            TokenKind::Word(w) | TokenKind::Str(w) => PropertyKey::Named(w.clone()),
            TokenKind::Num(n) => PropertyKey::Named(format_number(*n)),
            TokenKind::Punct("[") => {
                self.advance();
                let expr = self.assignment(false)?;
                self.expect_punct("]")?;
                return Ok(PropertyKey::Computed(Box::new(expr)));
            }
            TokenKind::Punct("#") => {
                self.advance();
                return Ok(PropertyKey::Named(format!("#{}", self.property_word()?)));
            }
            _ => return Err(self.unexpected("property name")),
        };
        self.advance();
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxTree {
        LiteParser::new().parse(src).expect("parse")
    }

    /// Dotted callee names of every call in the tree, in traversal order
    fn callees(tree: &SyntaxTree) -> Vec<String> {
        let mut out = Vec::new();
        tree.walk(&mut |node| {
            if let Node::Call { callee, .. } = node {
                if let Some(chain) = callee.member_chain() {
                    out.push(chain.join("."));
                }
            }
        });
        out
    }

    fn find_object(tree: &SyntaxTree) -> Option<&Vec<ObjectEntry>> {
        let mut found = None;
        tree.walk(&mut |node| {
            if found.is_none() {
                if let Node::Object { entries } = node {
                    found = Some(entries);
                }
            }
        });
        found
    }

    #[test]
    fn test_regex_statement_after_if_header() {
        let tree = parse(
            r"if (ready) /^\d+$/.test(id) && cc.Class({ name: 'Late' }); var half = (n) / 2;",
        );
        assert_eq!(callees(&tree), vec!["cc.Class"]);
    }

    #[test]
    fn test_factory_call_shape() {
        let tree = parse(
            "cc.Class({ name: 'Player', extends: cc.Component, properties: { speed: 10 } });",
        );
        let mut call = None;
        tree.walk(&mut |node| {
            if let Node::Call { callee, arguments } = node {
                call = Some((callee.member_chain(), arguments.len()));
            }
        });
        assert_eq!(call, Some((Some(vec!["cc", "Class"]), 1)));
    }

    #[test]
    fn test_minified_literals_fold() {
        let tree = parse("x({a: !0, b: !1, c: -5, d: +2.5, e: -y})");
        let entries = find_object(&tree).expect("object literal");
        let values: Vec<_> = entries.iter().map(|e| e.value.clone()).collect();
        assert_eq!(values[0], Node::literal(Literal::Bool(true)));
        assert_eq!(values[1], Node::literal(Literal::Bool(false)));
        assert_eq!(values[2], Node::literal(Literal::Number(-5.0)));
        assert_eq!(values[3], Node::literal(Literal::Number(2.5)));
        assert_eq!(values[4].kind(), "UnaryExpression");
    }

    #[test]
    fn test_calls_found_in_nested_positions() {
        let src = r#"
            (function (require, module) {
                var a = [0, { inner: cc.Class({ name: "A" }) }];
                if (ready) { for (var i = 0; i < n; i++) { queue.push(i) } }
                module.exports = cond ? make() : other.make();
            })(r, m);
        "#;
        assert_eq!(
            callees(&parse(src)),
            vec!["cc.Class", "queue.push", "make", "other.make"]
        );
    }

    #[test]
    fn test_regex_and_division() {
        let tree = parse("var a = b / c / 2; var ok = /ab+c/gi.test(s);");
        assert_eq!(tree.body.len(), 2);

        let mut regex_receivers = 0;
        tree.walk(&mut |node| {
            if let Node::Call { callee, .. } = node {
                if let Node::Member { object, .. } = callee.as_ref() {
                    if object.kind() == "RegExpLiteral" {
                        regex_receivers += 1;
                    }
                }
            }
        });
        assert_eq!(regex_receivers, 1);
    }

    #[test]
    fn test_arrows_and_async() {
        let tree = parse(
            "const f = async (a, {b}, ...rest) => { return a }; const g = x => x * 2; let h = async y => await y;",
        );
        let mut arrows = 0;
        tree.walk(&mut |node| {
            if let Node::Function(f) = node {
                if f.arrow {
                    arrows += 1;
                }
            }
        });
        assert_eq!(arrows, 3);
    }

    #[test]
    fn test_automatic_semicolons() {
        let tree = parse("var a = 1\nvar b = a\nb++\nreturn_value = b\n");
        assert_eq!(tree.body.len(), 4);

        let tree = parse("function f() { return\n42 }");
        let Node::Function(f) = &tree.body[0] else {
            panic!("expected function");
        };
        assert_eq!(f.body.len(), 2);
        assert_eq!(f.body[0], Node::other("ReturnStatement", Vec::new()));
    }

    #[test]
    fn test_control_flow_statements() {
        let src = r#"
            outer: for (var k in obj) { continue outer }
            for (const v of list) { try { use(v) } catch (e) { log(e) } finally { done() } }
            switch (mode) { case 1: one(); break; default: other() }
            do { tick() } while (running)
            while (false) {}
            throw new Error("x");
        "#;
        let tree = parse(src);
        assert_eq!(tree.body.len(), 6);
        assert_eq!(
            callees(&tree),
            vec!["use", "log", "done", "one", "other", "tick"]
        );
    }

    #[test]
    fn test_class_syntax() {
        let src = r#"
            class Hero extends cc.Component {
                static count = 0;
                #secret = 1;
                get level() { return 1 }
                static create() { return cc.Class({ name: "Inner" }) }
                async *stream() {}
            }
        "#;
        let tree = parse(src);
        assert_eq!(callees(&tree), vec!["cc.Class"]);
    }

    #[test]
    fn test_object_keys() {
        let tree = parse(
            "x = { 'quoted': 1, 2: 'two', [k]: 3, ...rest, short, get g() { return 1 }, m() {}, async a() {} }",
        );
        let entries = find_object(&tree).expect("object literal");
        let names: Vec<_> = entries.iter().map(|e| e.key.name()).collect();
        assert_eq!(
            names,
            vec![
                Some("quoted"),
                Some("2"),
                None,
                None,
                Some("short"),
                Some("g"),
                Some("m"),
                Some("a")
            ]
        );
        assert_eq!(entries[4].value, Node::ident("short"));
        assert_eq!(entries[7].value.kind(), "FunctionExpression");
    }

    #[test]
    fn test_array_holes() {
        let tree = parse("x = [1, , 3,]");
        let mut elements = None;
        tree.walk(&mut |node| {
            if let Node::Array { elements: e } = node {
                elements = Some(e.len());
            }
        });
        assert_eq!(elements, Some(3));
    }

    #[test]
    fn test_modules() {
        let src = r#"
            import cc from 'cc';
            import { a as b } from "./b";
            export default cc.Class({ name: "M" });
            export { b };
            export * from './c';
            export const z = make();
        "#;
        assert_eq!(callees(&parse(src)), vec!["cc.Class", "make"]);
    }

    #[test]
    fn test_syntax_error() {
        let err = LiteParser::new().parse("var = ;").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken {
                expected: "binding name",
                ..
            }
        ));

        assert!(LiteParser::new().parse("cc.Class({ name: 'x' ").is_err());
        assert!(LiteParser::new().parse("a b").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let src = format!("x = {}1{}", "[".repeat(40), "]".repeat(40));
        assert_eq!(
            LiteParser::with_max_depth(16).parse(&src),
            Err(ParseError::TooDeep(16))
        );
        assert!(LiteParser::new().parse(&src).is_ok());
    }
}
