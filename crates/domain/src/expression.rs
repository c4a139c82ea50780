//! Guard expressions.
//!
//! A guard gates switch actuation on the live values of other entities, e.g.
//! `Sensor[2]>=40.0` or the templated form `["{}>10 and {}==1", "Sensor[1]",
//! "Switch[2]"]`. Resolution (fetching live values) happens in the app layer;
//! this module owns the reference syntax, the placeholder substitution, and a
//! deliberately small comparison/boolean grammar: numeric comparisons,
//! `and`/`or`/`not`, parentheses, numeric and boolean literals. Nothing else
//! is evaluable, so a guard can never execute arbitrary host code.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value as Json;

use crate::error::ConfigError;
use crate::time::Timestamp;

/// Entity kinds addressable from a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Sensor,
    Switch,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor => f.write_str("Sensor"),
            Self::Switch => f.write_str("Switch"),
        }
    }
}

/// A reference to another entity's live value, e.g. `Sensor[2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ExpressionError::new(format!("bad entity reference {s:?}"));
        let (kind, rest) = s.split_once('[').ok_or_else(err)?;
        let id = rest.strip_suffix(']').ok_or_else(err)?;
        let kind = match kind {
            "Sensor" => EntityKind::Sensor,
            "Switch" => EntityKind::Switch,
            _ => return Err(err()),
        };
        let id = id.parse().map_err(|_| err())?;
        Ok(Self { kind, id })
    }
}

/// One slot of a templated guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRef {
    Entity(EntityRef),
    /// The literal token `now`: substituted with the current unix timestamp.
    Now,
}

/// A guard as written in an init payload, before live values are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardSource {
    /// Inline form with refs embedded in the text: `Sensor[2]>=40.0`.
    Simple(String),
    /// Format string plus an ordered list of refs filling `{}` placeholders.
    Template {
        format: String,
        refs: Vec<TemplateRef>,
    },
}

impl GuardSource {
    /// Parse the `"if"` key of an init payload: either a plain string or an
    /// array of `[format, ref, ref, …]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on any other JSON shape or a malformed ref.
    pub fn from_json(value: &Json) -> Result<Self, ConfigError> {
        match value {
            Json::String(s) => Ok(Self::Simple(s.clone())),
            Json::Array(parts) => {
                let mut iter = parts.iter();
                let format = iter
                    .next()
                    .and_then(Json::as_str)
                    .ok_or_else(|| ConfigError::new("template guard missing format string"))?
                    .to_string();
                let mut refs = Vec::new();
                for part in iter {
                    let text = part
                        .as_str()
                        .ok_or_else(|| ConfigError::new("template ref must be a string"))?;
                    if text == "now" {
                        refs.push(TemplateRef::Now);
                    } else {
                        let entity_ref = text
                            .parse()
                            .map_err(|err: ExpressionError| ConfigError::new(err.reason))?;
                        refs.push(TemplateRef::Entity(entity_ref));
                    }
                }
                if format.matches("{}").count() != refs.len() {
                    return Err(ConfigError::new(
                        "template placeholder count does not match ref count",
                    ));
                }
                Ok(Self::Template { format, refs })
            }
            _ => Err(ConfigError::new("guard must be a string or an array")),
        }
    }

    /// Every entity reference whose live value is needed before evaluation.
    #[must_use]
    pub fn references(&self) -> Vec<EntityRef> {
        match self {
            Self::Simple(text) => scan_refs(text)
                .into_iter()
                .map(|(_, entity_ref)| entity_ref)
                .collect(),
            Self::Template { refs, .. } => refs
                .iter()
                .filter_map(|r| match r {
                    TemplateRef::Entity(entity_ref) => Some(*entity_ref),
                    TemplateRef::Now => None,
                })
                .collect(),
        }
    }

    /// Substitute live values into the guard, producing evaluable source
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] when a referenced value is missing from
    /// `values`; the caller maps that to `UnresolvedReference`.
    pub fn substitute(
        &self,
        values: &HashMap<EntityRef, f64>,
        now: Timestamp,
    ) -> Result<String, ExpressionError> {
        let lookup = |entity_ref: EntityRef| {
            values.get(&entity_ref).copied().ok_or_else(|| {
                ExpressionError::new(format!("no value for reference {entity_ref}"))
            })
        };
        match self {
            Self::Simple(text) => {
                let mut out = String::with_capacity(text.len());
                let mut cursor = 0;
                for ((start, end), entity_ref) in scan_refs(text) {
                    out.push_str(&text[cursor..start]);
                    out.push_str(&format_value(lookup(entity_ref)?));
                    cursor = end;
                }
                out.push_str(&text[cursor..]);
                Ok(out)
            }
            Self::Template { format, refs } => {
                let mut out = String::with_capacity(format.len());
                let mut parts = format.split("{}");
                if let Some(first) = parts.next() {
                    out.push_str(first);
                }
                for (part, slot) in parts.zip(refs) {
                    let substituted = match slot {
                        TemplateRef::Entity(entity_ref) => format_value(lookup(*entity_ref)?),
                        TemplateRef::Now => now.timestamp().to_string(),
                    };
                    out.push_str(&substituted);
                    out.push_str(part);
                }
                Ok(out)
            }
        }
    }
}

/// Render a float so that whole numbers stay comparable to integer literals.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Find `Kind[id]` references embedded in simple-form guard text.
/// Returns `((start, end), ref)` pairs in left-to-right order.
fn scan_refs(text: &str) -> Vec<((usize, usize), EntityRef)> {
    let mut found = Vec::new();
    for (open, _) in text.match_indices('[') {
        // Walk back over the kind identifier, staying on char boundaries.
        let start = text[..open]
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_alphabetic())
            .last()
            .map_or(open, |(i, _)| i);
        if start == open {
            continue;
        }
        let Some(close) = text[open..].find(']').map(|i| open + i) else {
            continue;
        };
        if let Ok(entity_ref) = text[start..=close].parse::<EntityRef>() {
            found.push(((start, close + 1), entity_ref));
        }
    }
    found
}

/// Malformed or unevaluable expression text.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct ExpressionError {
    pub reason: String,
}

impl ExpressionError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalValue {
    Bool(bool),
    Number(f64),
}

// ── Tokenizer ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Bool(bool),
    And,
    Or,
    Not,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '<' | '>' | '=' | '!' => {
                let two = bytes.get(i + 1).copied() == Some(b'=');
                let token = match (c, two) {
                    ('<', true) => Token::Le,
                    ('<', false) => Token::Lt,
                    ('>', true) => Token::Ge,
                    ('>', false) => Token::Gt,
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::Ne,
                    _ => {
                        return Err(ExpressionError::new(format!(
                            "unexpected character {c:?}"
                        )));
                    }
                };
                tokens.push(token);
                i += if two { 2 } else { 1 };
            }
            '0'..='9' | '.' | '-' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && matches!(bytes[i] as char, '0'..='9' | '.' | 'e' | 'E')
                {
                    i += 1;
                }
                let text = &source[start..i];
                let number = text.parse().map_err(|_| {
                    ExpressionError::new(format!("bad number literal {text:?}"))
                })?;
                tokens.push(Token::Number(number));
            }
            'a'..='z' | 'A'..='Z' => {
                let start = i;
                while i < bytes.len() && (bytes[i] as char).is_ascii_alphabetic() {
                    i += 1;
                }
                let word = &source[start..i];
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => {
                        return Err(ExpressionError::new(format!("unknown word {word:?}")));
                    }
                };
                tokens.push(token);
            }
            _ => {
                return Err(ExpressionError::new(format!("unexpected character {c:?}")));
            }
        }
    }
    Ok(tokens)
}

// ── Recursive-descent parser / evaluator ───────────────────────────

/// A parsed guard expression over already-substituted text.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(EvalValue),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Compare {
        op: Comparator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(Token::Or) {
            self.bump();
            let right = self.and_expr()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.unary()?;
        while self.peek() == Some(Token::And) {
            self.bump();
            let right = self.unary()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ExpressionError> {
        if self.peek() == Some(Token::Not) {
            self.bump();
            return Ok(Expression::Not(Box::new(self.unary()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expression, ExpressionError> {
        let left = self.primary()?;
        let op = match self.peek() {
            Some(Token::Lt) => Comparator::Lt,
            Some(Token::Le) => Comparator::Le,
            Some(Token::Gt) => Comparator::Gt,
            Some(Token::Ge) => Comparator::Ge,
            Some(Token::Eq) => Comparator::Eq,
            Some(Token::Ne) => Comparator::Ne,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.primary()?;
        Ok(Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn primary(&mut self) -> Result<Expression, ExpressionError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expression::Literal(EvalValue::Number(n))),
            Some(Token::Bool(b)) => Ok(Expression::Literal(EvalValue::Bool(b))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                if self.bump() != Some(Token::RParen) {
                    return Err(ExpressionError::new("missing closing parenthesis"));
                }
                Ok(inner)
            }
            other => Err(ExpressionError::new(format!(
                "expected a value, got {other:?}"
            ))),
        }
    }
}

impl Expression {
    /// Parse substituted guard text.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] on any token or grammar violation.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExpressionError::new("empty expression"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(ExpressionError::new("trailing tokens after expression"));
        }
        Ok(expr)
    }

    /// Evaluate to a boolean or a number.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] on type mismatches (e.g. `not 3.5`).
    pub fn eval(&self) -> Result<EvalValue, ExpressionError> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Not(inner) => Ok(EvalValue::Bool(!inner.eval_bool()?)),
            Self::And(left, right) => {
                Ok(EvalValue::Bool(left.eval_bool()? && right.eval_bool()?))
            }
            Self::Or(left, right) => {
                Ok(EvalValue::Bool(left.eval_bool()? || right.eval_bool()?))
            }
            Self::Compare { op, left, right } => {
                let left = left.eval_number()?;
                let right = right.eval_number()?;
                let result = match op {
                    Comparator::Lt => left < right,
                    Comparator::Le => left <= right,
                    Comparator::Gt => left > right,
                    Comparator::Ge => left >= right,
                    Comparator::Eq => (left - right).abs() < f64::EPSILON,
                    Comparator::Ne => (left - right).abs() >= f64::EPSILON,
                };
                Ok(EvalValue::Bool(result))
            }
        }
    }

    /// Evaluate, requiring a numeric result (comparison operands).
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] when the operand yields a boolean.
    pub fn eval_number(&self) -> Result<f64, ExpressionError> {
        match self.eval()? {
            EvalValue::Number(n) => Ok(n),
            EvalValue::Bool(b) => Err(ExpressionError::new(format!(
                "expected a number operand, got {b}"
            ))),
        }
    }

    /// Evaluate, requiring a boolean result (the switch-guard entry point).
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] when the expression yields a bare number.
    pub fn eval_bool(&self) -> Result<bool, ExpressionError> {
        match self.eval()? {
            EvalValue::Bool(b) => Ok(b),
            EvalValue::Number(n) => Err(ExpressionError::new(format!(
                "expected a boolean result, got {n}"
            ))),
        }
    }
}
