use std::fmt;

use thiserror::Error;

use crate::buffer::Position;

/// Indicates whether an error can be recovered from, and parsing can continue.
/// A failed attempt or a rejected guard just means "try the next rule";
/// anything else abandons the parse.
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;
}

/// Position, source excerpt and scope stack attached to a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub pos: Position,
    pub excerpt: String,
    pub trace: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{msg} at {pos} [scope: {trace}]",
            msg = self.message,
            pos = self.pos,
            trace = self.trace.join(" > ")
        )?;
        if !self.excerpt.is_empty() {
            write!(f, "\n{}", self.excerpt)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no match: {action} at {pos}")]
    NoMatch { action: &'static str, pos: Position },

    #[error("pre-check rejected match at {pos}")]
    PreCheck { pos: Position },

    #[error("post-check rejected match at {pos}")]
    PostCheck { pos: Position },

    #[error("parse error: {0}")]
    Fatal(Box<Diagnostic>),

    #[error("stuck grammar: {0}")]
    Stuck(Box<Diagnostic>),

    #[error("scope error: {message} [scope: {}]", .trace.join(" > "))]
    Scope { message: String, trace: Vec<String> },

    #[error("grammar error: {0}")]
    Grammar(String),

    #[error("bad multiplicity: {0}")]
    Multiplicity(String),

    #[error(transparent)]
    Regex(#[from] regex_automata::meta::BuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Recoverable for ParseError {
    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoMatch { .. } | Self::PreCheck { .. } | Self::PostCheck { .. }
        )
    }
}

impl ParseError {
    /// The diagnostic of a fatal or stuck-grammar error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Fatal(d) | Self::Stuck(d) => Some(d),
            _ => None,
        }
    }

    pub fn grammar(msg: impl Into<String>) -> Self {
        Self::Grammar(msg.into())
    }
}

#[inline]
pub(crate) fn no_match(action: &'static str, pos: Position) -> ParseError {
    ParseError::NoMatch { action, pos }
}
