//! Sandboxed expression language for button conditions and `{{ }}` values.
//!
//! Supported: number/string/`true`/`false`/`null`/`undefined` literals,
//! identifiers resolved against the supplied scope only, `.`/`?.`/`[]`
//! member access, `!` `-` `+` prefix operators, `* / %`, `+ -`,
//! `< <= > >=`, `== != === !==`, `&&`, `||`, `??` and `? :`.
//! Function calls are rejected at compile time. Coercions follow the
//! script semantics the tag authors write against.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::LazyLock;

use log::warn;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::value::{self, number_to_string, parse_number};

const MAX_DEPTH: usize = 64;

static EMPTY_OBJECT: LazyLock<Json> = LazyLock::new(|| Json::Object(Map::new()));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number literal '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("function calls are not supported (offset {offset})")]
    CallNotAllowed { offset: usize },

    #[error("expression nests or chains deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("'{name}' is not defined")]
    UnknownIdentifier { name: String },

    #[error("cannot read property '{property}' of {target}")]
    NullAccess {
        property: String,
        target: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Names visible to an expression. Nothing outside the scope is reachable.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<&Json>;
}

impl Scope for Json {
    fn lookup(&self, name: &str) -> Option<&Json> {
        self.as_object()?.get(name)
    }
}

impl Scope for Map<String, Json> {
    fn lookup(&self, name: &str) -> Option<&Json> {
        self.get(name)
    }
}

impl Scope for [(&str, &Json)] {
    fn lookup(&self, name: &str) -> Option<&Json> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: Property,
        optional: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl Expr {
    /// Parse source text into an expression tree.
    pub fn compile(src: &str) -> Result<Expr, ExprError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.parse_conditional()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken {
                found: tok.kind.describe(),
                expected: "end of expression",
                offset: tok.offset,
            }),
        }
    }

    /// Evaluate; `Ok(None)` is `undefined`.
    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<Option<Json>, ExprError> {
        Ok(eval(self, scope)?.into_json())
    }

    /// Evaluate and reduce to truthiness.
    pub fn test<S: Scope + ?Sized>(&self, scope: &S) -> Result<bool, ExprError> {
        Ok(eval(self, scope)?.truthy())
    }

    /// Top-level names the expression reads from its scope, in first-use order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_identifiers(self, &mut names);
        names
    }
}

fn collect_identifiers<'e>(expr: &'e Expr, names: &mut Vec<&'e str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Identifier(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Expr::Member {
            object, property, ..
        } => {
            collect_identifiers(object, names);
            if let Property::Computed(key) = property {
                collect_identifiers(key, names);
            }
        }
        Expr::Unary { operand, .. } => collect_identifiers(operand, names),
        Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
            collect_identifiers(lhs, names);
            collect_identifiers(rhs, names);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            collect_identifiers(test, names);
            collect_identifiers(consequent, names);
            collect_identifiers(alternate, names);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points used by the rest of the crate
// ---------------------------------------------------------------------------

/// Compile and evaluate in one step.
pub fn evaluate<S: Scope + ?Sized>(src: &str, scope: &S) -> Result<Option<Json>, ExprError> {
    Expr::compile(src)?.eval(scope)
}

/// Interior of a `{{ ... }}` value, trimmed. `None` for anything else.
pub fn template_body(s: &str) -> Option<&str> {
    s.strip_prefix("{{")?.strip_suffix("}}").map(str::trim)
}

/// Delimited form. Non-template strings come back unchanged as literals;
/// templates evaluate against `scope`; failures are logged and give `None`.
pub fn evaluate_template<S: Scope + ?Sized>(s: &str, scope: &S) -> Option<Json> {
    let Some(body) = template_body(s) else {
        return Some(Json::String(s.to_string()));
    };
    if body.is_empty() {
        return None;
    }
    match evaluate(body, scope) {
        Ok(v) => v,
        Err(e) => {
            warn!("expression {body:?} failed: {e}");
            None
        }
    }
}

/// Bare form for button visibility, evaluated against `{row}`. A blank
/// condition or any failure yields `true`. `{{ }}` delimiters are tolerated.
pub fn evaluate_condition(condition: &str, row: Option<&Json>) -> bool {
    let condition = template_body(condition.trim()).unwrap_or(condition);
    if condition.trim().is_empty() {
        return true;
    }
    let row = row.unwrap_or(&EMPTY_OBJECT);
    let scope: [(&str, &Json); 1] = [("row", row)];
    match Expr::compile(condition).and_then(|expr| expr.test(&scope[..])) {
        Ok(shown) => shown,
        Err(e) => {
            warn!("condition {condition:?} failed, showing button: {e}");
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "(", ")", "[", "]", ".", "?",
    ":", "!", "<", ">", "+", "-", "*", "/", "%", ",",
];

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => number_to_string(*n),
            TokenKind::Str(s) => format!("\"{s}\""),
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Punct(p) => (*p).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let char_at = |i: usize| chars.get(i).map(|(_, c)| *c);

    while let Some(&(offset, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Number literal
        if c.is_ascii_digit() || (c == '.' && char_at(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            while char_at(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if char_at(i) == Some('.') {
                i += 1;
                while char_at(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
            }
            if matches!(char_at(i), Some('e' | 'E')) {
                let sign = usize::from(matches!(char_at(i + 1), Some('+' | '-')));
                if char_at(i + 1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1 + sign;
                    while char_at(i).is_some_and(|c| c.is_ascii_digit()) {
                        i += 1;
                    }
                }
            }
            let end = chars.get(i).map_or(src.len(), |(o, _)| *o);
            let text = &src[offset..end];
            let n = parse_number(text).ok_or_else(|| ExprError::InvalidNumber {
                text: text.to_string(),
                offset,
            })?;
            if char_at(i).is_some_and(is_ident_char) {
                return Err(ExprError::InvalidNumber {
                    text: src[chars[start].0..].chars().take_while(|c| is_ident_char(*c) || *c == '.').collect(),
                    offset,
                });
            }
            tokens.push(Token {
                kind: TokenKind::Number(n),
                offset,
            });
            continue;
        }

        // String literal
        if c == '"' || c == '\'' {
            let quote = c;
            let mut s = String::new();
            i += 1;
            loop {
                match char_at(i) {
                    None => return Err(ExprError::UnterminatedString { offset }),
                    Some(ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = char_at(i + 1)
                            .ok_or(ExprError::UnterminatedString { offset })?;
                        s.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                        i += 2;
                    }
                    Some(ch) => {
                        s.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Str(s),
                offset,
            });
            continue;
        }

        // Identifier or keyword
        if is_ident_start(c) {
            let mut name = String::new();
            while let Some(ch) = char_at(i).filter(|c| is_ident_char(*c)) {
                name.push(ch);
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(name),
                offset,
            });
            continue;
        }

        // Punctuator, longest match first
        let rest = &src[offset..];
        let punct = PUNCTUATORS.iter().find(|p| {
            rest.starts_with(**p)
                // `a?.5:1` is a conditional, not optional chaining
                && !(**p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()))
        });
        match punct {
            Some(p) => {
                tokens.push(Token {
                    kind: TokenKind::Punct(p),
                    offset,
                });
                i += p.chars().count();
            }
            None => return Err(ExprError::UnexpectedChar { ch: c, offset }),
        }
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// ---------------------------------------------------------------------------
// Parser (precedence climbing)
// ---------------------------------------------------------------------------

enum BinaryKind {
    Arith(BinaryOp),
    Logic(LogicalOp),
}

fn binary_precedence(p: &str) -> Option<(u8, BinaryKind)> {
    use BinaryKind::*;
    Some(match p {
        "??" => (1, Logic(LogicalOp::Nullish)),
        "||" => (2, Logic(LogicalOp::Or)),
        "&&" => (3, Logic(LogicalOp::And)),
        "==" => (4, Arith(BinaryOp::LooseEq)),
        "!=" => (4, Arith(BinaryOp::LooseNe)),
        "===" => (4, Arith(BinaryOp::StrictEq)),
        "!==" => (4, Arith(BinaryOp::StrictNe)),
        "<" => (5, Arith(BinaryOp::Lt)),
        "<=" => (5, Arith(BinaryOp::Le)),
        ">" => (5, Arith(BinaryOp::Gt)),
        ">=" => (5, Arith(BinaryOp::Ge)),
        "+" => (6, Arith(BinaryOp::Add)),
        "-" => (6, Arith(BinaryOp::Sub)),
        "*" => (7, Arith(BinaryOp::Mul)),
        "/" => (7, Arith(BinaryOp::Div)),
        "%" => (7, Arith(BinaryOp::Rem)),
        _ => return None,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<&'static str> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Punct(p),
                ..
            }) => Some(p),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek_punct() == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &'static str) -> Result<(), ExprError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Punct(p),
                ..
            }) if p == punct => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken {
                found: tok.kind.describe(),
                expected: punct,
                offset: tok.offset,
            }),
            None => Err(ExprError::UnexpectedEnd { expected: punct }),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        self.enter()?;
        let test = self.parse_binary(1)?;
        let expr = if self.eat("?") {
            let consequent = self.parse_conditional()?;
            self.expect(":")?;
            let alternate = self.parse_conditional()?;
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };
        self.depth -= 1;
        Ok(expr)
    }

    // Every operator folded into `lhs` adds a tree level, so chains count
    // against the same depth budget as nesting.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.parse_unary()?;
        while let Some((prec, kind)) = self.peek_punct().and_then(binary_precedence) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            self.enter()?;
            let rhs = Box::new(self.parse_binary(prec + 1)?);
            let lhs_box = Box::new(lhs);
            lhs = match kind {
                BinaryKind::Arith(op) => Expr::Binary {
                    op,
                    lhs: lhs_box,
                    rhs,
                },
                BinaryKind::Logic(op) => Expr::Logical {
                    op,
                    lhs: lhs_box,
                    rhs,
                },
            };
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek_punct() {
            Some("!") => UnaryOp::Not,
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            let optional = match self.peek_punct() {
                Some(".") => false,
                Some("?.") => true,
                Some("[") => {
                    self.pos += 1;
                    self.enter()?;
                    let key = self.parse_conditional()?;
                    self.expect("]")?;
                    expr = member(expr, Property::Computed(Box::new(key)), false);
                    continue;
                }
                Some("(") => {
                    let offset = self.peek().map_or(0, |t| t.offset);
                    return Err(ExprError::CallNotAllowed { offset });
                }
                _ => break,
            };
            self.pos += 1;
            self.enter()?;

            if optional && self.eat("[") {
                let key = self.parse_conditional()?;
                self.expect("]")?;
                expr = member(expr, Property::Computed(Box::new(key)), true);
                continue;
            }

            match self.next() {
                Some(Token {
                    kind: TokenKind::Ident(name),
                    ..
                }) => expr = member(expr, Property::Named(name), optional),
                Some(tok) => {
                    return Err(ExprError::UnexpectedToken {
                        found: tok.kind.describe(),
                        expected: "property name",
                        offset: tok.offset,
                    })
                }
                None => {
                    return Err(ExprError::UnexpectedEnd {
                        expected: "property name",
                    })
                }
            }
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let Some(tok) = self.next() else {
            return Err(ExprError::UnexpectedEnd {
                expected: "expression",
            });
        };
        match tok.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                _ => Expr::Identifier(name),
            }),
            TokenKind::Punct("(") => {
                let inner = self.parse_conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            other => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                expected: "expression",
                offset: tok.offset,
            }),
        }
    }
}

fn member(object: Expr, property: Property, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property,
        optional,
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Runtime value. Arrays and objects stay borrowed from the scope.
#[derive(Debug, Clone)]
enum Val<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Ref(&'a Json),
}

impl<'a> Val<'a> {
    fn from_json(v: &'a Json) -> Self {
        match v {
            Json::Null => Val::Null,
            Json::Bool(b) => Val::Bool(*b),
            Json::Number(n) => Val::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Val::Str(Cow::Borrowed(s)),
            Json::Array(_) | Json::Object(_) => Val::Ref(v),
        }
    }

    fn into_json(self) -> Option<Json> {
        Some(match self {
            Val::Undefined => return None,
            Val::Null => Json::Null,
            Val::Bool(b) => Json::Bool(b),
            Val::Number(n) => value::number_to_json(n),
            Val::Str(s) => Json::String(s.into_owned()),
            Val::Ref(v) => v.clone(),
        })
    }

    fn is_nullish(&self) -> bool {
        matches!(self, Val::Undefined | Val::Null)
    }

    fn truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Number(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            Val::Ref(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Val::Undefined => f64::NAN,
            Val::Null => 0.0,
            Val::Bool(b) => f64::from(u8::from(*b)),
            Val::Number(n) => *n,
            Val::Str(s) if s.trim().is_empty() => 0.0,
            Val::Str(s) => parse_number(s).unwrap_or(f64::NAN),
            Val::Ref(v) => value::to_number(v).unwrap_or(f64::NAN),
        }
    }

    fn to_text(&self) -> Cow<'a, str> {
        match self {
            Val::Undefined => Cow::Borrowed("undefined"),
            Val::Null => Cow::Borrowed("null"),
            Val::Bool(b) => Cow::Owned(b.to_string()),
            Val::Number(n) => Cow::Owned(number_to_string(*n)),
            Val::Str(s) => s.clone(),
            Val::Ref(Json::Array(_)) => Cow::Owned(self.array_text()),
            Val::Ref(_) => Cow::Borrowed("[object Object]"),
        }
    }

    fn array_text(&self) -> String {
        match self {
            Val::Ref(v) => value::to_display_string(v),
            _ => String::new(),
        }
    }

    /// Arrays and objects collapse to their string form.
    fn to_primitive(self) -> Val<'a> {
        match self {
            Val::Ref(_) => Val::Str(self.to_text()),
            other => other,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Val::Undefined => "undefined",
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Number(_) => "number",
            Val::Str(_) => "string",
            Val::Ref(_) => "object",
        }
    }
}

fn eval<'a, S: Scope + ?Sized>(expr: &Expr, scope: &'a S) -> Result<Val<'a>, ExprError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Undefined => Val::Undefined,
            Literal::Null => Val::Null,
            Literal::Bool(b) => Val::Bool(*b),
            Literal::Number(n) => Val::Number(*n),
            Literal::String(s) => Val::Str(Cow::Owned(s.clone())),
        }),
        Expr::Identifier(name) => scope
            .lookup(name)
            .map(Val::from_json)
            .ok_or_else(|| ExprError::UnknownIdentifier { name: name.clone() }),
        Expr::Member { .. } => Ok(eval_chain(expr, scope)?.unwrap_or(Val::Undefined)),
        Expr::Unary { op, operand } => {
            let v = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Val::Bool(!v.truthy()),
                UnaryOp::Neg => Val::Number(-v.to_number()),
                UnaryOp::Plus => Val::Number(v.to_number()),
            })
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, scope)?;
            let r = eval(rhs, scope)?;
            Ok(binary(*op, l, r))
        }
        Expr::Logical { op, lhs, rhs } => {
            let l = eval(lhs, scope)?;
            let take_left = match op {
                LogicalOp::And => !l.truthy(),
                LogicalOp::Or => l.truthy(),
                LogicalOp::Nullish => !l.is_nullish(),
            };
            if take_left {
                Ok(l)
            } else {
                eval(rhs, scope)
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if eval(test, scope)?.truthy() {
                eval(consequent, scope)
            } else {
                eval(alternate, scope)
            }
        }
    }
}

/// Member access; `Ok(None)` means an optional link short-circuited the chain.
fn eval_chain<'a, S: Scope + ?Sized>(
    expr: &Expr,
    scope: &'a S,
) -> Result<Option<Val<'a>>, ExprError> {
    let Expr::Member {
        object,
        property,
        optional,
    } = expr
    else {
        return eval(expr, scope).map(Some);
    };

    let Some(target) = eval_chain(object, scope)? else {
        return Ok(None);
    };
    if *optional && target.is_nullish() {
        return Ok(None);
    }

    let key = match property {
        Property::Named(name) => Cow::Borrowed(name.as_str()),
        Property::Computed(key_expr) => Cow::Owned(eval(key_expr, scope)?.to_text().into_owned()),
    };
    get_property(target, &key).map(Some)
}

fn get_property<'a>(target: Val<'a>, key: &str) -> Result<Val<'a>, ExprError> {
    let index = || {
        key.chars()
            .all(|c| c.is_ascii_digit())
            .then(|| key.parse::<usize>().ok())
            .flatten()
    };

    match target {
        Val::Undefined | Val::Null => Err(ExprError::NullAccess {
            property: key.to_string(),
            target: target.type_name(),
        }),
        Val::Ref(Json::Object(map)) => Ok(map.get(key).map_or(Val::Undefined, Val::from_json)),
        Val::Ref(Json::Array(items)) => {
            if key == "length" {
                return Ok(Val::Number(items.len() as f64));
            }
            Ok(index()
                .and_then(|i| items.get(i))
                .map_or(Val::Undefined, Val::from_json))
        }
        Val::Str(s) => {
            if key == "length" {
                return Ok(Val::Number(s.encode_utf16().count() as f64));
            }
            Ok(index()
                .and_then(|i| s.chars().nth(i))
                .map_or(Val::Undefined, |c| Val::Str(Cow::Owned(c.to_string()))))
        }
        _ => Ok(Val::Undefined),
    }
}

fn binary<'a>(op: BinaryOp, l: Val<'a>, r: Val<'a>) -> Val<'a> {
    match op {
        BinaryOp::Add => {
            let (l, r) = (l.to_primitive(), r.to_primitive());
            if matches!(l, Val::Str(_)) || matches!(r, Val::Str(_)) {
                Val::Str(Cow::Owned(format!("{}{}", l.to_text(), r.to_text())))
            } else {
                Val::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Val::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Val::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Val::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Val::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => Val::Bool(compare(l, r).is_some_and(Ordering::is_lt)),
        BinaryOp::Le => Val::Bool(compare(l, r).is_some_and(Ordering::is_le)),
        BinaryOp::Gt => Val::Bool(compare(l, r).is_some_and(Ordering::is_gt)),
        BinaryOp::Ge => Val::Bool(compare(l, r).is_some_and(Ordering::is_ge)),
        BinaryOp::LooseEq => Val::Bool(loose_eq(l, r)),
        BinaryOp::LooseNe => Val::Bool(!loose_eq(l, r)),
        BinaryOp::StrictEq => Val::Bool(strict_eq(&l, &r)),
        BinaryOp::StrictNe => Val::Bool(!strict_eq(&l, &r)),
    }
}

/// Strings compare lexically, everything else numerically; `None` when
/// either side is `NaN`.
fn compare(l: Val<'_>, r: Val<'_>) -> Option<Ordering> {
    let (l, r) = (l.to_primitive(), r.to_primitive());
    if let (Val::Str(a), Val::Str(b)) = (&l, &r) {
        return Some(a.as_ref().cmp(b.as_ref()));
    }
    l.to_number().partial_cmp(&r.to_number())
}

fn strict_eq(l: &Val<'_>, r: &Val<'_>) -> bool {
    match (l, r) {
        (Val::Undefined, Val::Undefined) | (Val::Null, Val::Null) => true,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Number(a), Val::Number(b)) => a == b,
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::Ref(a), Val::Ref(b)) => std::ptr::eq(*a, *b),
        _ => false,
    }
}

fn loose_eq(l: Val<'_>, r: Val<'_>) -> bool {
    match (&l, &r) {
        _ if l.is_nullish() || r.is_nullish() => l.is_nullish() && r.is_nullish(),
        (Val::Number(a), Val::Str(_)) => *a == r.to_number(),
        (Val::Str(_), Val::Number(b)) => l.to_number() == *b,
        (Val::Bool(_), _) => loose_eq(Val::Number(l.to_number()), r),
        (_, Val::Bool(_)) => loose_eq(l, Val::Number(r.to_number())),
        (Val::Ref(_), Val::Number(_) | Val::Str(_)) => loose_eq(l.to_primitive(), r),
        (Val::Number(_) | Val::Str(_), Val::Ref(_)) => loose_eq(l, r.to_primitive()),
        _ => strict_eq(&l, &r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_str(src: &str, ctx: &Json) -> Option<Json> {
        evaluate(src, ctx).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        let ctx = json!({});
        assert_eq!(eval_str("1 + 2 * 3", &ctx), Some(json!(7)));
        assert_eq!(eval_str("(1 + 2) * 3", &ctx), Some(json!(9)));
        assert_eq!(eval_str("10 % 4 - -1", &ctx), Some(json!(3)));
        assert_eq!(eval_str("7 / 2", &ctx), Some(json!(3.5)));
    }

    #[test]
    fn string_concatenation_coerces() {
        let ctx = json!({"row": {"n": 3}});
        assert_eq!(eval_str("'n=' + row.n", &ctx), Some(json!("n=3")));
        assert_eq!(eval_str("\"a\" + 1 + 2", &ctx), Some(json!("a12")));
    }

    #[test]
    fn member_access_and_comparison() {
        let ctx = json!({"row": {"status": 1, "dept": {"name": "Tech"}}});
        assert_eq!(eval_str("row.status === 1", &ctx), Some(json!(true)));
        assert_eq!(eval_str("row.dept.name == 'Tech'", &ctx), Some(json!(true)));
        assert_eq!(eval_str("row['dept']['name']", &ctx), Some(json!("Tech")));
        assert_eq!(eval_str("row.status >= 2", &ctx), Some(json!(false)));
    }

    #[test]
    fn missing_property_is_undefined() {
        let ctx = json!({"row": {}});
        assert_eq!(eval_str("row.nonexistent", &ctx), None);
    }

    #[test]
    fn reading_through_undefined_fails() {
        let ctx = json!({"row": {}});
        let err = evaluate("row.nonexistent.x", &ctx).unwrap_err();
        assert!(matches!(err, ExprError::NullAccess { ref property, .. } if property == "x"));
    }

    #[test]
    fn optional_chaining_short_circuits() {
        let ctx = json!({"row": {}});
        assert_eq!(eval_str("row.dept?.name", &ctx), None);
        assert_eq!(eval_str("row.dept?.name.first", &ctx), None);
        assert_eq!(eval_str("row.dept?.['name']", &ctx), None);
    }

    #[test]
    fn question_dot_digit_is_conditional() {
        let ctx = json!({"x": true});
        assert_eq!(eval_str("x?.5:1", &ctx), Some(json!(0.5)));
    }

    #[test]
    fn arrays_expose_length_and_index() {
        let ctx = json!({"row": {"tags": ["a", "b"]}});
        assert_eq!(eval_str("row.tags.length", &ctx), Some(json!(2)));
        assert_eq!(eval_str("row.tags[1]", &ctx), Some(json!("b")));
        assert_eq!(eval_str("row.tags[5]", &ctx), None);
    }

    #[test]
    fn logical_operators_return_operands() {
        let ctx = json!({"row": {"name": "", "nick": "bob", "age": null}});
        assert_eq!(eval_str("row.name || row.nick", &ctx), Some(json!("bob")));
        assert_eq!(eval_str("row.name && row.nick", &ctx), Some(json!("")));
        assert_eq!(eval_str("row.age ?? 18", &ctx), Some(json!(18)));
        assert_eq!(eval_str("!row.name", &ctx), Some(json!(true)));
    }

    #[test]
    fn ternary_is_right_associative() {
        let ctx = json!({"s": 2});
        assert_eq!(
            eval_str("s === 1 ? 'a' : s === 2 ? 'b' : 'c'", &ctx),
            Some(json!("b"))
        );
    }

    #[test]
    fn loose_equality_coerces() {
        let ctx = json!({"row": {"status": "1", "flag": null}});
        assert_eq!(eval_str("row.status == 1", &ctx), Some(json!(true)));
        assert_eq!(eval_str("row.status === 1", &ctx), Some(json!(false)));
        assert_eq!(eval_str("row.flag == undefined", &ctx), Some(json!(true)));
        assert_eq!(eval_str("row.flag === undefined", &ctx), Some(json!(false)));
        assert_eq!(eval_str("true == 1", &ctx), Some(json!(true)));
    }

    #[test]
    fn nan_comparisons_are_false() {
        let ctx = json!({"row": {"v": "abc"}});
        assert_eq!(eval_str("row.v > 1", &ctx), Some(json!(false)));
        assert_eq!(eval_str("row.v <= 1", &ctx), Some(json!(false)));
    }

    #[test]
    fn string_comparison_is_lexical() {
        let ctx = json!({});
        assert_eq!(eval_str("'10' < '9'", &ctx), Some(json!(true)));
        assert_eq!(eval_str("'10' < 9", &ctx), Some(json!(false)));
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let err = evaluate("window.location", &json!({"row": {}})).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownIdentifier {
                name: "window".into()
            }
        );
    }

    #[test]
    fn calls_are_rejected() {
        let err = Expr::compile("row.name.toUpperCase()").unwrap_err();
        assert!(matches!(err, ExprError::CallNotAllowed { .. }));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(
            Expr::compile("row.status ==="),
            Err(ExprError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            Expr::compile("'open"),
            Err(ExprError::UnterminatedString { .. })
        ));
        assert!(matches!(
            Expr::compile("a # b"),
            Err(ExprError::UnexpectedChar { ch: '#', .. })
        ));
        assert!(matches!(
            Expr::compile("1 2"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let src = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(Expr::compile(&src), Err(ExprError::TooDeep));
        let bangs = format!("{}true", "!".repeat(200));
        assert_eq!(Expr::compile(&bangs), Err(ExprError::TooDeep));
    }

    #[test]
    fn long_chains_are_bounded() {
        let sum = format!("row.a{}", " + 1".repeat(20_000));
        assert_eq!(Expr::compile(&sum), Err(ExprError::TooDeep));
        let ands = format!("row.a{}", " && true".repeat(20_000));
        assert_eq!(Expr::compile(&ands), Err(ExprError::TooDeep));
        let path = format!("row{}", ".a".repeat(20_000));
        assert_eq!(Expr::compile(&path), Err(ExprError::TooDeep));
        let index = format!("row{}", "[0]".repeat(20_000));
        assert_eq!(Expr::compile(&index), Err(ExprError::TooDeep));

        // Fail open rather than abort.
        assert!(evaluate_condition(&sum, Some(&json!({"a": 1}))));

        // Short chains still compile.
        let short = format!("row.a{}", " + 1".repeat(20));
        assert_eq!(eval_str(&short, &json!({"row": {"a": 1}})), Some(json!(21)));
    }

    #[test]
    fn integral_results_serialize_as_integers() {
        let ctx = json!({});
        assert_eq!(eval_str("1 + 1", &ctx).unwrap().to_string(), "2");
        assert_eq!(eval_str("-4 / 2", &ctx).unwrap().to_string(), "-2");
        assert_eq!(eval_str("1 / 4", &ctx).unwrap().to_string(), "0.25");
        assert_eq!(eval_str("1 / 0", &ctx), Some(json!(null)));
    }

    #[test]
    fn string_escapes() {
        let ctx = json!({});
        assert_eq!(eval_str(r#"'it\'s'"#, &ctx), Some(json!("it's")));
        assert_eq!(eval_str(r#""a\nb""#, &ctx), Some(json!("a\nb")));
    }

    #[test]
    fn identifiers_are_collected_once() {
        let expr = Expr::compile("row.a > 1 && formData[row.k] || row.b").unwrap();
        assert_eq!(expr.identifiers(), vec!["row", "formData"]);
    }

    #[test]
    fn slice_scope_exposes_only_listed_names() {
        let row = json!({"id": 5});
        let scope: [(&str, &Json); 1] = [("row", &row)];
        assert_eq!(evaluate("row.id * 2", &scope[..]).unwrap(), Some(json!(10)));
        assert!(evaluate("formData", &scope[..]).is_err());
    }

    #[test]
    fn template_passes_literals_through() {
        let ctx = json!({});
        assert_eq!(evaluate_template("hello", &ctx), Some(json!("hello")));
        assert_eq!(evaluate_template("{{ }}", &ctx), None);
    }

    #[test]
    fn template_evaluates_interior() {
        let ctx = json!({"formData": {"type": 2}});
        assert_eq!(
            evaluate_template("{{ formData.type === 2 }}", &ctx),
            Some(json!(true))
        );
    }

    #[test]
    fn template_failure_is_undefined() {
        let ctx = json!({"formData": {}});
        assert_eq!(evaluate_template("{{ formData.a.b }}", &ctx), None);
        assert_eq!(evaluate_template("{{ ((( }}", &ctx), None);
    }

    #[test]
    fn condition_fails_open() {
        let row = json!({});
        assert!(evaluate_condition("row.nonexistent.x", Some(&row)));
        assert!(evaluate_condition("not valid ((", Some(&row)));
        assert!(evaluate_condition("", Some(&row)));
    }

    #[test]
    fn condition_uses_truthiness() {
        let row = json!({"status": 0, "name": "x"});
        assert!(!evaluate_condition("row.status", Some(&row)));
        assert!(evaluate_condition("row.name", Some(&row)));
        assert!(!evaluate_condition("row.missing", Some(&row)));
        assert!(evaluate_condition("row.status === 0", Some(&row)));
    }

    #[test]
    fn condition_accepts_delimited_form() {
        let row = json!({"status": 1});
        assert!(evaluate_condition("{{ row.status === 1 }}", Some(&row)));
        assert!(!evaluate_condition("{{ row.status === 2 }}", Some(&row)));
    }

    #[test]
    fn condition_without_row_sees_empty_object() {
        assert!(!evaluate_condition("row.status === 1", None));
    }
}
