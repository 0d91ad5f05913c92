//! Analysis errors definition.

use std::fmt;
use tf_tree::errors::TreeError;
use tf_tree::{Cursor, NodeId};
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// An alias for result that can be a [`StateError`].
pub type StateResult<T> = Result<T, StateError>;

/// Misuse of a [`ProgramState`](crate::state::ProgramState).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("pop from an empty expression stack")]
    EmptyStack,

    /// States reaching the same point must carry stacks of the same height.
    #[error("cannot join expression stacks of heights {expected} and {found}")]
    StackMismatch { expected: usize, found: usize },
}

/// Invalid [`MethodMatcher`](crate::matcher::MethodMatcher) pattern.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("malformed method pattern `{0}`")]
    Malformed(String),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

const MAX_LOCATION_TEXT: usize = 60;

/// The program point an error was raised at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location(Option<(NodeId, String)>);

impl Location {
    #[must_use]
    pub fn of(cursor: Cursor) -> Self {
        let mut text = cursor.to_string();
        if let Some((cut, _)) = text.char_indices().nth(MAX_LOCATION_TEXT) {
            text.truncate(cut);
            text.push_str("...");
        }
        Self(Some((cursor.id(), text)))
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.0.as_ref().map(|(id, _)| *id)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            Some((id, text)) => write!(f, "{id} `{text}`"),
            None => write!(f, "<unknown>"),
        }
    }
}

/// Every error aborts the running analysis; none of them is retried.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The flow graph or the transfer dispatch met a node kind it does not
    /// support.
    #[error("unhandled construct {kind} at {location}")]
    UnhandledConstruct {
        kind: &'static str,
        location: Location,
    },

    /// A transfer function broke the expression stack discipline.
    #[error("protocol violation at {location}: {source}")]
    ProtocolViolation { location: Location, source: StateError },

    /// The tree does not have the expected shape.
    #[error("invariant violation at {location}: {reason}")]
    InvariantViolation { location: Location, reason: String },

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

impl From<StateError> for AnalysisError {
    fn from(source: StateError) -> Self {
        Self::ProtocolViolation {
            location: Location::unknown(),
            source,
        }
    }
}

impl AnalysisError {
    #[must_use]
    pub fn unhandled(cursor: Cursor) -> Self {
        Self::UnhandledConstruct {
            kind: cursor.kind().name(),
            location: Location::of(cursor),
        }
    }

    pub fn invariant<S: Into<String>>(cursor: Cursor, reason: S) -> Self {
        Self::InvariantViolation {
            location: Location::of(cursor),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::UnhandledConstruct { location, .. }
            | Self::ProtocolViolation { location, .. }
            | Self::InvariantViolation { location, .. } => Some(location),
            Self::Tree(_) => None,
        }
    }

    /// Attaches `cursor` as location, unless one is already known.
    #[must_use]
    pub fn located(mut self, cursor: Cursor) -> Self {
        match &mut self {
            Self::UnhandledConstruct { location, .. }
            | Self::ProtocolViolation { location, .. }
            | Self::InvariantViolation { location, .. }
                if location.node().is_none() =>
            {
                *location = Location::of(cursor);
            }
            _ => (),
        }
        self
    }
}
