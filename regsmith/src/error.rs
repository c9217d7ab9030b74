//! Error types for building and compiling regex trees
//!
//! This module provides error handling using the `thiserror` crate.
//! Errors are categorized by the phase that raises them: node construction
//! rejects bad arguments immediately, while compilation checks properties of
//! a whole tree (group names, references, lookbehind lengths).

use thiserror::Error;

use crate::ast::{NodeId, Special};
use crate::length::LengthBounds;

/// The main error type for the crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// Errors raised by node constructors
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Errors raised while compiling or renaming a tree
    #[error("compilation error: {0}")]
    Compile(#[from] CompileError),
}

/// Errors raised when a node constructor receives invalid arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A character range or repetition count set is malformed
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A special that is not a single-character class was placed in a class
    #[error("{0:?} cannot appear inside a character class")]
    InvalidClassMember(Special),

    /// A group name that is not an identifier
    #[error("invalid group name '{0}'")]
    InvalidGroupName(String),

    /// Comment text the engine would terminate early
    #[error("comment {0:?} must not contain ')'")]
    InvalidComment(String),

    /// Inline flags that cannot be combined
    #[error("invalid flags: {0}")]
    InvalidFlags(String),
}

/// Errors raised while compiling a tree into pattern text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Two capturing groups share a name
    #[error("duplicate group name '{0}'")]
    DuplicateGroupName(String),

    /// A backreference or conditional names a group absent from the tree
    #[error("unresolved backreference to group {0}")]
    UnresolvedBackreference(NodeId),

    /// A lookbehind whose body can match strings of different lengths
    #[error("lookbehind {node} is not fixed-length (matches {bounds} characters)")]
    VariableLengthLookbehind {
        /// The offending lookaround node
        node: NodeId,
        /// The computed bounds of its body
        bounds: LengthBounds,
    },
}

/// Result type alias for regex operations
pub type Result<T> = std::result::Result<T, RegexError>;
