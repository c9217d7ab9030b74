//! Expression nodes for building regex patterns
//!
//! A [`Regex`] is an immutable, cheaply clonable handle to one node. Parents
//! own their children through `Arc`, so subtrees can be shared between trees
//! and read from several threads at once. Backreferences and conditionals do
//! not own the group they test: they hold its [`NodeId`], which the compiler
//! resolves against the tree being compiled.
//!
//! Supported constructs:
//! - Literals, character classes, anchors and shorthand classes
//! - Concatenation and alternation
//! - Repetition over arbitrary count sets
//! - Groups (capturing, named, non-capturing) and scoped inline flags
//! - Lookahead and lookbehind, positive and negative
//! - Backreferences, conditionals, atomic groups, comments

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::class::{CharClass, ClassItem};
use crate::compiler::{CompileOptions, CompiledPattern, compile};
use crate::error::{BuildError, Result};
use crate::flags::{InlineFlag, InlineFlags};
use crate::length::{LengthAnalyzer, LengthBounds};
use crate::rename::{NameMapping, drop_names, rename};
use crate::repeat::RepeatCounts;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anchors and single-character classes with fixed spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    /// `^`
    LineStart,
    /// `$`
    LineEnd,
    /// `\A`
    StringStart,
    /// `\Z`
    StringEnd,
    /// `\b`
    WordBoundary,
    /// `\B`
    NonWordBoundary,
    /// `.`
    AnyChar,
    /// `\d`
    Digit,
    /// `\D`
    NonDigit,
    /// `\s`
    Whitespace,
    /// `\S`
    NonWhitespace,
    /// `\w`
    WordChar,
    /// `\W`
    NonWordChar,
    /// `\t`
    Tab,
    /// `\n`
    Newline,
    /// `\r`
    CarriageReturn,
}

impl Special {
    /// The pattern text for this special
    pub fn as_str(self) -> &'static str {
        match self {
            Special::LineStart => "^",
            Special::LineEnd => "$",
            Special::StringStart => "\\A",
            Special::StringEnd => "\\Z",
            Special::WordBoundary => "\\b",
            Special::NonWordBoundary => "\\B",
            Special::AnyChar => ".",
            Special::Digit => "\\d",
            Special::NonDigit => "\\D",
            Special::Whitespace => "\\s",
            Special::NonWhitespace => "\\S",
            Special::WordChar => "\\w",
            Special::NonWordChar => "\\W",
            Special::Tab => "\\t",
            Special::Newline => "\\n",
            Special::CarriageReturn => "\\r",
        }
    }

    /// Anchors match a position rather than a character
    pub fn is_zero_width(self) -> bool {
        matches!(
            self,
            Special::LineStart
                | Special::LineEnd
                | Special::StringStart
                | Special::StringEnd
                | Special::WordBoundary
                | Special::NonWordBoundary
        )
    }

    /// Whether the special may appear inside `[...]`
    pub fn in_class(self) -> bool {
        !self.is_zero_width() && self != Special::AnyChar
    }
}

/// Whether a group captures, and under which name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// `(?:...)`
    NonCapturing,
    /// `(...)` or `(?P<name>...)`
    Capturing {
        /// The group name, if any
        name: Option<String>,
    },
}

/// Which side of the current position a lookaround inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Text after the current position
    Ahead,
    /// Text before the current position
    Behind,
}

/// The variant data of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Matches exactly this text
    Literal(String),

    /// Matches one character from a set
    CharClass(CharClass),

    /// Sequential composition; empty matches the empty string
    Concat(Vec<Regex>),

    /// First-match-wins choice; empty matches nothing
    Alternation(Vec<Regex>),

    /// The child repeated any count from the set
    Repetition {
        /// The repeated expression
        child: Regex,
        /// Allowed repetition counts
        counts: RepeatCounts,
    },

    /// A capturing or non-capturing group
    Group {
        /// The grouped expression
        child: Regex,
        /// Capture behaviour and name
        kind: GroupKind,
    },

    /// Matches the text last captured by the target group
    Backreference {
        /// Identity of the capturing group
        target: NodeId,
    },

    /// Zero-width assertion
    Lookaround {
        /// The asserted expression
        child: Regex,
        /// Ahead or behind
        direction: Direction,
        /// Whether the assertion succeeds when `child` does not match
        negated: bool,
    },

    /// Matches `then_branch` if the test group participated, else `else_branch`
    Conditional {
        /// Identity of the capturing group being tested
        test: NodeId,
        /// Branch taken when the group matched
        then_branch: Regex,
        /// Branch taken otherwise
        else_branch: Regex,
    },

    /// Once matched, never re-entered by backtracking
    Atomic(Regex),

    /// Zero-width annotation
    Comment(String),

    /// Anchor or single-character class
    Special(Special),

    /// Child compiled with inline flags switched on or off
    Flags {
        /// The flagged expression
        child: Regex,
        /// Flags to apply
        flags: InlineFlags,
    },
}

#[derive(Debug)]
struct Node {
    id: NodeId,
    kind: NodeKind,
}

/// An immutable regex expression node
#[derive(Debug, Clone)]
pub struct Regex(Arc<Node>);

/// Check that a group name is an identifier
pub fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

impl Regex {
    pub(crate) fn from_kind(kind: NodeKind) -> Self {
        Regex::with_id(NodeId::fresh(), kind)
    }

    pub(crate) fn with_id(id: NodeId, kind: NodeKind) -> Self {
        Regex(Arc::new(Node { id, kind }))
    }

    /// Replace this node's data, keeping its identity
    pub(crate) fn rebuild(&self, kind: NodeKind) -> Self {
        Regex::with_id(self.id(), kind)
    }

    /// This node's identity
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// This node's variant data
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Whether both handles point at the same allocation
    pub fn ptr_eq(&self, other: &Regex) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ---- constructors ----

    /// Match `text` exactly
    pub fn literal(text: impl Into<String>) -> Self {
        Regex::from_kind(NodeKind::Literal(text.into()))
    }

    /// Match one character from `items`
    pub fn char_class(items: impl IntoIterator<Item = ClassItem>) -> Result<Self> {
        Ok(Regex::class(CharClass::new(items, false)?))
    }

    /// Match one character not in `items`
    pub fn negated_class(items: impl IntoIterator<Item = ClassItem>) -> Result<Self> {
        Ok(Regex::class(CharClass::new(items, true)?))
    }

    /// Match one character in the inclusive range `start..=end`
    pub fn char_range(start: char, end: char) -> Result<Self> {
        Regex::char_class([ClassItem::Range(start, end)])
    }

    /// Match any one of the characters of `chars`
    pub fn one_of(chars: &str) -> Self {
        Regex::class(CharClass::from_chars(chars.chars()))
    }

    /// Wrap an already validated class
    pub fn class(class: CharClass) -> Self {
        Regex::from_kind(NodeKind::CharClass(class))
    }

    /// Match each child in order
    pub fn concat(children: impl IntoIterator<Item = Regex>) -> Self {
        Regex::from_kind(NodeKind::Concat(children.into_iter().collect()))
    }

    /// Match the first child that matches
    pub fn alternation(children: impl IntoIterator<Item = Regex>) -> Self {
        Regex::from_kind(NodeKind::Alternation(children.into_iter().collect()))
    }

    /// Repeat `child` any count allowed by `counts`
    pub fn repetition(child: Regex, counts: RepeatCounts) -> Self {
        Regex::from_kind(NodeKind::Repetition { child, counts })
    }

    /// Group `child`
    pub fn group(child: Regex, kind: GroupKind) -> Result<Self> {
        if let GroupKind::Capturing { name: Some(name) } = &kind {
            if !is_valid_group_name(name) {
                return Err(BuildError::InvalidGroupName(name.clone()).into());
            }
        }
        Ok(Regex::from_kind(NodeKind::Group { child, kind }))
    }

    /// Match what the capturing group `target` matched
    ///
    /// `target` should be a capturing group of the tree this reference ends
    /// up in; otherwise compilation fails with an unresolved backreference.
    pub fn backreference(target: &Regex) -> Self {
        Regex::from_kind(NodeKind::Backreference { target: target.id() })
    }

    /// Zero-width assertion on `child`
    pub fn lookaround(child: Regex, direction: Direction, negated: bool) -> Self {
        Regex::from_kind(NodeKind::Lookaround {
            child,
            direction,
            negated,
        })
    }

    /// Match `then_branch` if the capturing group `test` participated in the
    /// match so far, `else_branch` otherwise
    pub fn conditional(test: &Regex, then_branch: Regex, else_branch: Regex) -> Self {
        Regex::from_kind(NodeKind::Conditional {
            test: test.id(),
            then_branch,
            else_branch,
        })
    }

    /// Match `child` without ever backtracking into it
    pub fn atomic(child: Regex) -> Self {
        Regex::from_kind(NodeKind::Atomic(child))
    }

    /// A zero-width annotation
    pub fn comment(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.contains(')') {
            return Err(BuildError::InvalidComment(text).into());
        }
        Ok(Regex::from_kind(NodeKind::Comment(text)))
    }

    /// An anchor or shorthand class
    pub fn special(kind: Special) -> Self {
        Regex::from_kind(NodeKind::Special(kind))
    }

    /// Compile `child` with `flags` in effect
    pub fn flagged(child: Regex, flags: InlineFlags) -> Self {
        Regex::from_kind(NodeKind::Flags { child, flags })
    }

    // ---- combinators ----

    /// Repeat this expression per `counts`
    pub fn repeat(&self, counts: RepeatCounts) -> Self {
        Regex::repetition(self.clone(), counts)
    }

    /// Zero or one time
    pub fn optional(&self) -> Self {
        self.repeat(RepeatCounts::up_to(1))
    }

    /// Zero or more times
    pub fn zero_or_more(&self) -> Self {
        self.repeat(RepeatCounts::at_least(0))
    }

    /// One or more times
    pub fn one_or_more(&self) -> Self {
        self.repeat(RepeatCounts::at_least(1))
    }

    /// Exactly `n` times
    pub fn times(&self, n: u32) -> Self {
        self.repeat(RepeatCounts::exactly(n))
    }

    /// Between `min` and `max` times, inclusive
    pub fn between(&self, min: u32, max: u32) -> Result<Self> {
        Ok(self.repeat(RepeatCounts::between(min, max)?))
    }

    /// `min` or more times
    pub fn at_least(&self, min: u32) -> Self {
        self.repeat(RepeatCounts::at_least(min))
    }

    /// `start`, `start + step`, ... times, up to `stop` if given
    pub fn stepped(&self, start: u32, stop: Option<u32>, step: u32) -> Result<Self> {
        Ok(self.repeat(RepeatCounts::stepped(start, stop, step)?))
    }

    /// Wrap in an unnamed capturing group
    pub fn captured(&self) -> Self {
        Regex::from_kind(NodeKind::Group {
            child: self.clone(),
            kind: GroupKind::Capturing { name: None },
        })
    }

    /// Wrap in a named capturing group
    pub fn named(&self, name: impl Into<String>) -> Result<Self> {
        Regex::group(
            self.clone(),
            GroupKind::Capturing {
                name: Some(name.into()),
            },
        )
    }

    /// Wrap in a non-capturing group
    pub fn non_capturing(&self) -> Self {
        Regex::from_kind(NodeKind::Group {
            child: self.clone(),
            kind: GroupKind::NonCapturing,
        })
    }

    /// This expression followed by the assertion that `ahead` matches next
    pub fn followed_by(&self, ahead: Regex) -> Self {
        Regex::concat([
            self.clone(),
            Regex::lookaround(ahead, Direction::Ahead, false),
        ])
    }

    /// This expression followed by the assertion that `ahead` does not match next
    pub fn not_followed_by(&self, ahead: Regex) -> Self {
        Regex::concat([
            self.clone(),
            Regex::lookaround(ahead, Direction::Ahead, true),
        ])
    }

    /// This expression, asserting that `behind` matches just before it
    pub fn preceded_by(&self, behind: Regex) -> Self {
        Regex::concat([
            Regex::lookaround(behind, Direction::Behind, false),
            self.clone(),
        ])
    }

    /// This expression, asserting that `behind` does not match just before it
    pub fn not_preceded_by(&self, behind: Regex) -> Self {
        Regex::concat([
            Regex::lookaround(behind, Direction::Behind, true),
            self.clone(),
        ])
    }

    /// Any text that does not start with a match of this expression
    pub fn anything_but(&self) -> Self {
        Regex::concat([
            Regex::lookaround(self.clone(), Direction::Ahead, true),
            Regex::special(Special::AnyChar).zero_or_more(),
        ])
    }

    /// Make this expression atomic
    pub fn as_atomic(&self) -> Self {
        Regex::atomic(self.clone())
    }

    /// Append a comment after this expression
    pub fn with_comment(&self, text: impl Into<String>) -> Result<Self> {
        Ok(Regex::concat([self.clone(), Regex::comment(text)?]))
    }

    /// Switch `flags` on for this expression
    ///
    /// Applied to a flag group, the flags merge into it.
    pub fn with_flags(&self, flags: impl IntoIterator<Item = InlineFlag>) -> Result<Self> {
        self.merge_flags(flags, [])
    }

    /// Switch `flags` off for this expression
    pub fn without_flags(&self, flags: impl IntoIterator<Item = InlineFlag>) -> Result<Self> {
        self.merge_flags([], flags)
    }

    fn merge_flags(
        &self,
        enabled: impl IntoIterator<Item = InlineFlag>,
        disabled: impl IntoIterator<Item = InlineFlag>,
    ) -> Result<Self> {
        let (child, flags) = match self.kind() {
            NodeKind::Flags { child, flags } => (child.clone(), flags.merge(enabled, disabled)?),
            _ => (self.clone(), InlineFlags::new(enabled, disabled)?),
        };
        Ok(Regex::flagged(child, flags))
    }

    // ---- introspection ----

    /// Owned children, in emission order
    pub fn children(&self) -> Vec<&Regex> {
        match self.kind() {
            NodeKind::Concat(children) | NodeKind::Alternation(children) => {
                children.iter().collect()
            }
            NodeKind::Repetition { child, .. }
            | NodeKind::Group { child, .. }
            | NodeKind::Lookaround { child, .. }
            | NodeKind::Atomic(child)
            | NodeKind::Flags { child, .. } => vec![child],
            NodeKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => vec![then_branch, else_branch],
            NodeKind::Literal(_)
            | NodeKind::CharClass(_)
            | NodeKind::Backreference { .. }
            | NodeKind::Comment(_)
            | NodeKind::Special(_) => Vec::new(),
        }
    }

    /// Depth-first, pre-order walk over this node and its descendants
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// All capturing groups, named or not, in emission order
    pub fn capture_groups(&self) -> impl Iterator<Item = &Regex> {
        self.walk().filter(|node| node.is_capturing_group())
    }

    /// Named capturing groups, in emission order
    pub fn named_groups(&self) -> impl Iterator<Item = &Regex> {
        self.walk().filter(|node| node.group_name().is_some())
    }

    /// Backreference nodes, in emission order
    pub fn backreferences(&self) -> impl Iterator<Item = &Regex> {
        self.walk()
            .filter(|node| matches!(node.kind(), NodeKind::Backreference { .. }))
    }

    /// Whether this node is a capturing group
    pub fn is_capturing_group(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Group {
                kind: GroupKind::Capturing { .. },
                ..
            }
        )
    }

    /// The name of this node, if it is a named capturing group
    pub fn group_name(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Group {
                kind: GroupKind::Capturing { name: Some(name) },
                ..
            } => Some(name),
            _ => None,
        }
    }

    /// Matched-length bounds of this tree on its own
    pub fn bounds(&self) -> LengthBounds {
        LengthAnalyzer::new(self).bounds(self)
    }

    // ---- transformations ----

    /// Compile to pattern text
    pub fn compile(&self, options: &CompileOptions) -> Result<CompiledPattern> {
        compile(self, options)
    }

    /// Rename capture groups
    pub fn rename<M: NameMapping + ?Sized>(&self, mapping: &M) -> Result<Regex> {
        rename(self, mapping)
    }

    /// Turn every named group into an unnamed capturing group
    pub fn drop_names(&self) -> Regex {
        drop_names(self)
    }

    /// The node data with every child passed through `f`
    pub(crate) fn map_children(&self, mut f: impl FnMut(&Regex) -> Regex) -> NodeKind {
        match self.kind() {
            NodeKind::Concat(children) => NodeKind::Concat(children.iter().map(&mut f).collect()),
            NodeKind::Alternation(children) => {
                NodeKind::Alternation(children.iter().map(&mut f).collect())
            }
            NodeKind::Repetition { child, counts } => NodeKind::Repetition {
                child: f(child),
                counts: counts.clone(),
            },
            NodeKind::Group { child, kind } => NodeKind::Group {
                child: f(child),
                kind: kind.clone(),
            },
            NodeKind::Lookaround {
                child,
                direction,
                negated,
            } => NodeKind::Lookaround {
                child: f(child),
                direction: *direction,
                negated: *negated,
            },
            NodeKind::Conditional {
                test,
                then_branch,
                else_branch,
            } => NodeKind::Conditional {
                test: *test,
                then_branch: f(then_branch),
                else_branch: f(else_branch),
            },
            NodeKind::Atomic(child) => NodeKind::Atomic(f(child)),
            NodeKind::Flags { child, flags } => NodeKind::Flags {
                child: f(child),
                flags: flags.clone(),
            },
            leaf @ (NodeKind::Literal(_)
            | NodeKind::CharClass(_)
            | NodeKind::Backreference { .. }
            | NodeKind::Comment(_)
            | NodeKind::Special(_)) => leaf.clone(),
        }
    }

    /// Pass every child through `f`, sharing this node when nothing changed
    pub(crate) fn rebuild_children(&self, mut f: impl FnMut(&Regex) -> Regex) -> Regex {
        let mut changed = false;
        let kind = self.map_children(|child| {
            let mapped = f(child);
            changed |= !mapped.ptr_eq(child);
            mapped
        });
        if changed { self.rebuild(kind) } else { self.clone() }
    }
}

/// Iterator returned by [`Regex::walk`]
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Regex>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Regex;

    fn next(&mut self) -> Option<&'a Regex> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}

impl From<&str> for Regex {
    fn from(text: &str) -> Self {
        Regex::literal(text)
    }
}

impl From<Special> for Regex {
    fn from(kind: Special) -> Self {
        Regex::special(kind)
    }
}
