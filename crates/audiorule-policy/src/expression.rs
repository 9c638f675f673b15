//! Textual function calls and conditions
//!
//! Conditions are written as
//!
//! ```text
//! muteState(SINK, REQUESTING) EQ MS_MUTED
//! name(CLASS_OF_SINK, REQUESTING) INC name(CLASS, "Entertainment")
//! ```
//!
//! A call takes a category, a mandatory parameter and up to two optional
//! parameters. Quoted arguments are literals; unquoted arguments may hold
//! selectors, `REQ_*` macros or further calls, all resolved at evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of optional parameters of a call
pub const MAX_OPTIONAL: usize = 2;

/// Parse errors for calls and conditions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,

    #[error("expected {expected} at offset {offset}")]
    Expected { expected: &'static str, offset: usize },

    #[error("unterminated quote starting at offset {0}")]
    UnterminatedQuote(usize),

    #[error("call '{0}' needs a category and a mandatory parameter")]
    TooFewArguments(String),

    #[error("call '{0}' has too many optional parameters")]
    TooManyArguments(String),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("unexpected trailing input '{0}'")]
    Trailing(String),
}

/// One argument of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub text: String,
    /// Quoted arguments are taken literally
    pub quoted: bool,
}

impl Argument {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// A function-call descriptor: `function(CATEGORY, mandatory[, opt1[, opt2]])`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub function: String,
    pub category: String,
    pub mandatory: Argument,
    pub optional: Vec<Argument>,
}

impl FunctionCall {
    pub fn new(function: impl Into<String>, category: impl Into<String>, mandatory: Argument) -> Self {
        Self {
            function: function.into(),
            category: category.into(),
            mandatory,
            optional: Vec::new(),
        }
    }

    pub fn with_optional(mut self, argument: Argument) -> Self {
        self.optional.push(argument);
        self
    }

    /// Parse a complete call, rejecting trailing input
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(text);
        let call = cursor.call()?;
        cursor.finish()?;
        Ok(call)
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}", self.function, self.category, self.mandatory)?;
        for arg in &self.optional {
            write!(f, ", {}", arg)?;
        }
        f.write_str(")")
    }
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotEqual,
    /// Right value is a member of the left result set
    Include,
    /// Right value is not a member of the left result set
    Exclude,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "EQ" => Some(Self::Equal),
            "GT" => Some(Self::Greater),
            "GEQ" => Some(Self::GreaterEqual),
            "LT" => Some(Self::Less),
            "LEQ" => Some(Self::LessEqual),
            "NE" => Some(Self::NotEqual),
            "INC" => Some(Self::Include),
            "EXC" => Some(Self::Exclude),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Equal => "EQ",
            Self::Greater => "GT",
            Self::GreaterEqual => "GEQ",
            Self::Less => "LT",
            Self::LessEqual => "LEQ",
            Self::NotEqual => "NE",
            Self::Include => "INC",
            Self::Exclude => "EXC",
        }
    }

    pub fn is_membership(self) -> bool {
        matches!(self, Self::Include | Self::Exclude)
    }

    /// Apply an ordering/equality operator to a comparison result
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Equal => ordering == Equal,
            Self::NotEqual => ordering != Equal,
            Self::Greater => ordering == Greater,
            Self::GreaterEqual => ordering != Less,
            Self::Less => ordering == Less,
            Self::LessEqual => ordering != Greater,
            Self::Include | Self::Exclude => false,
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Call(FunctionCall),
    Literal(Argument),
}

/// A single comparison between a call result and a literal or another call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub left: FunctionCall,
    pub operator: Operator,
    pub right: Operand,
}

impl FromStr for Condition {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::new(text);
        let left = cursor.call()?;

        cursor.skip_ws();
        let op_offset = cursor.pos;
        let op_token = cursor.ident();
        if op_token.is_empty() {
            return Err(ParseError::Expected {
                expected: "operator",
                offset: op_offset,
            });
        }
        let operator =
            Operator::from_token(op_token).ok_or_else(|| ParseError::UnknownOperator(op_token.to_string()))?;

        cursor.skip_ws();
        let right = if cursor.peek() == Some('"') {
            Operand::Literal(Argument::quoted(cursor.quoted()?))
        } else if cursor.at_call() {
            Operand::Call(cursor.call()?)
        } else {
            let literal = cursor.rest().trim();
            if literal.is_empty() {
                return Err(ParseError::Expected {
                    expected: "right operand",
                    offset: cursor.pos,
                });
            }
            cursor.pos = cursor.src.len();
            Operand::Literal(Argument::plain(literal))
        };
        cursor.finish()?;

        Ok(Self {
            left,
            operator,
            right,
        })
    }
}

impl TryFrom<String> for Condition {
    type Error = ParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.left, self.operator.token())?;
        match &self.right {
            Operand::Call(call) => write!(f, "{}", call),
            Operand::Literal(arg) => write!(f, "{}", arg),
        }
    }
}

/// Whether `text` is written as a call: an identifier followed by `(`
pub fn is_call_expression(text: &str) -> bool {
    Cursor::new(text.trim_start()).at_call()
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, wanted: char, expected: &'static str) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some(wanted) {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected,
                offset: self.pos,
            })
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// An identifier immediately followed (modulo whitespace) by `(`
    fn at_call(&self) -> bool {
        let rest = self.rest();
        let ident_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        ident_len > 0 && rest[ident_len..].trim_start().starts_with('(')
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        let body_start = self.pos;
        loop {
            match self.bump() {
                Some('"') => return Ok(self.src[body_start..self.pos - 1].to_string()),
                Some(_) => {}
                None => return Err(ParseError::UnterminatedQuote(start)),
            }
        }
    }

    /// Raw argument text up to the next top-level `,` or `)`
    fn raw_argument(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '"' => {
                    self.quoted()?;
                    continue;
                }
                '(' => depth += 1,
                ')' if depth == 0 => break,
                ')' => depth -= 1,
                ',' if depth == 0 => break,
                _ => {}
            }
            self.bump();
        }
        Ok(self.src[start..self.pos].trim().to_string())
    }

    fn argument(&mut self) -> Result<Argument, ParseError> {
        self.skip_ws();
        if self.peek() == Some('"') {
            let text = self.quoted()?;
            Ok(Argument::quoted(text))
        } else {
            Ok(Argument::plain(self.raw_argument()?))
        }
    }

    fn call(&mut self) -> Result<FunctionCall, ParseError> {
        self.skip_ws();
        if self.rest().trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let name_offset = self.pos;
        let function = self.ident().to_string();
        if function.is_empty() {
            return Err(ParseError::Expected {
                expected: "function name",
                offset: name_offset,
            });
        }
        self.expect('(', "'('")?;

        let mut args = Vec::new();
        loop {
            args.push(self.argument()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => break,
                _ => {
                    return Err(ParseError::Expected {
                        expected: "',' or ')'",
                        offset: self.pos,
                    })
                }
            }
        }

        if args.len() < 2 {
            return Err(ParseError::TooFewArguments(function));
        }
        if args.len() > 2 + MAX_OPTIONAL {
            return Err(ParseError::TooManyArguments(function));
        }
        let mut args = args.into_iter();
        let category = args.next().map(|a| a.text).unwrap_or_default();
        let mandatory = args.next().unwrap_or_else(|| Argument::plain(""));

        Ok(FunctionCall {
            function,
            category,
            mandatory,
            optional: args.collect(),
        })
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(ParseError::Trailing(self.rest().to_string()))
        }
    }
}
