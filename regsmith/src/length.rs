//! Matched-length analysis
//!
//! Bounds are measured in characters. The analysis is total: a backreference
//! whose target cannot be found, or that refers to a group enclosing it,
//! yields `0..` rather than an error.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{Direction, NodeId, NodeKind, Regex};
use crate::error::CompileError;

/// Inclusive bounds on the length of a match; `max: None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Shortest possible match
    pub min: usize,
    /// Longest possible match, if finite
    pub max: Option<usize>,
}

impl LengthBounds {
    /// Bounds of a match that is always `len` characters long
    pub const fn exact(len: usize) -> Self {
        LengthBounds {
            min: len,
            max: Some(len),
        }
    }

    /// Bounds that say nothing
    pub const UNKNOWN: LengthBounds = LengthBounds { min: 0, max: None };

    /// Whether every match has the same length
    pub fn is_fixed(&self) -> bool {
        self.max == Some(self.min)
    }

    fn then(self, other: LengthBounds) -> LengthBounds {
        LengthBounds {
            min: self.min.saturating_add(other.min),
            max: self.max.zip(other.max).map(|(a, b)| a.saturating_add(b)),
        }
    }

    fn or(self, other: LengthBounds) -> LengthBounds {
        LengthBounds {
            min: self.min.min(other.min),
            max: self.max.zip(other.max).map(|(a, b)| a.max(b)),
        }
    }
}

impl fmt::Display for LengthBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..={}", self.min, max),
            None => write!(f, "{}..", self.min),
        }
    }
}

/// Computes [`LengthBounds`] for the nodes of one tree
///
/// Backreferences take the bounds of their target, so the analyzer indexes
/// the capturing groups of the tree it was created for.
#[derive(Debug)]
pub struct LengthAnalyzer<'a> {
    groups: HashMap<NodeId, &'a Regex>,
}

impl<'a> LengthAnalyzer<'a> {
    /// Index the capturing groups of `root`
    pub fn new(root: &'a Regex) -> Self {
        let mut groups = HashMap::new();
        for node in root.walk().filter(|node| node.is_capturing_group()) {
            groups.entry(node.id()).or_insert(node);
        }
        LengthAnalyzer { groups }
    }

    /// Bounds of `node`, which should belong to the analyzed tree
    pub fn bounds(&self, node: &Regex) -> LengthBounds {
        let mut active = Vec::new();
        self.measure(node, &mut active)
    }

    fn measure(&self, node: &Regex, active: &mut Vec<NodeId>) -> LengthBounds {
        match node.kind() {
            NodeKind::Literal(text) => LengthBounds::exact(text.chars().count()),
            NodeKind::CharClass(_) => LengthBounds::exact(1),
            NodeKind::Special(special) => {
                LengthBounds::exact(if special.is_zero_width() { 0 } else { 1 })
            }
            NodeKind::Lookaround { .. } | NodeKind::Comment(_) => LengthBounds::exact(0),
            NodeKind::Concat(children) => children
                .iter()
                .map(|child| self.measure(child, active))
                .fold(LengthBounds::exact(0), LengthBounds::then),
            NodeKind::Alternation(children) => children
                .iter()
                .map(|child| self.measure(child, active))
                .reduce(LengthBounds::or)
                .unwrap_or(LengthBounds::exact(0)),
            NodeKind::Repetition { child, counts } => {
                let inner = self.measure(child, active);
                let min = inner.min.saturating_mul(counts.min() as usize);
                let max = match (inner.max, counts.max()) {
                    (Some(0), _) | (_, Some(0)) => Some(0),
                    (Some(a), Some(b)) => Some(a.saturating_mul(b as usize)),
                    _ => None,
                };
                LengthBounds { min, max }
            }
            NodeKind::Group { child, .. } => {
                active.push(node.id());
                let bounds = self.measure(child, active);
                active.pop();
                bounds
            }
            NodeKind::Atomic(child) | NodeKind::Flags { child, .. } => {
                self.measure(child, active)
            }
            NodeKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => self
                .measure(then_branch, active)
                .or(self.measure(else_branch, active)),
            NodeKind::Backreference { target } => {
                if active.contains(target) {
                    return LengthBounds::UNKNOWN;
                }
                match self.groups.get(target) {
                    Some(group) => self.measure(group, active),
                    None => LengthBounds::UNKNOWN,
                }
            }
        }
    }

    /// Reject lookbehinds whose body can match different lengths
    pub fn check_lookbehinds(&self, root: &Regex) -> Result<(), CompileError> {
        for node in root.walk() {
            if let NodeKind::Lookaround {
                child,
                direction: Direction::Behind,
                ..
            } = node.kind()
            {
                let bounds = self.bounds(child);
                if !bounds.is_fixed() {
                    return Err(CompileError::VariableLengthLookbehind {
                        node: node.id(),
                        bounds,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Special;
    use crate::repeat::{Count, RepeatCounts};

    fn bounds(node: &Regex) -> LengthBounds {
        LengthAnalyzer::new(node).bounds(node)
    }

    #[test]
    fn test_literal_counts_chars() {
        assert_eq!(bounds(&Regex::literal("héllo")), LengthBounds::exact(5));
    }

    #[test]
    fn test_zero_width_nodes() {
        assert_eq!(
            bounds(&Regex::special(Special::WordBoundary)),
            LengthBounds::exact(0)
        );
        assert_eq!(bounds(&Regex::comment("x").unwrap()), LengthBounds::exact(0));
        let ahead = Regex::literal("abc").followed_by(Regex::literal("zz"));
        assert_eq!(bounds(&ahead), LengthBounds::exact(3));
    }

    #[test]
    fn test_alternation_bounds() {
        let alt = Regex::alternation([Regex::literal("a"), Regex::literal("abc")]);
        assert_eq!(bounds(&alt), LengthBounds { min: 1, max: Some(3) });
        assert_eq!(bounds(&Regex::alternation([])), LengthBounds::exact(0));
    }

    #[test]
    fn test_repetition_bounds() {
        let rep = Regex::literal("ab").between(1, 3).unwrap();
        assert_eq!(bounds(&rep), LengthBounds { min: 2, max: Some(6) });

        let star = Regex::literal("ab").zero_or_more();
        assert_eq!(bounds(&star), LengthBounds { min: 0, max: None });

        let empty_star = Regex::concat([]).zero_or_more();
        assert_eq!(bounds(&empty_star), LengthBounds::exact(0));

        let zero = Regex::literal("a").one_or_more().times(0);
        assert_eq!(bounds(&zero), LengthBounds::exact(0));
    }

    #[test]
    fn test_sparse_repetition_bounds() {
        let counts = RepeatCounts::new([Count::Finite(1), 3.into(), 5.into()]).unwrap();
        let rep = Regex::literal("foo").repeat(counts);
        assert_eq!(bounds(&rep), LengthBounds { min: 3, max: Some(15) });
    }

    #[test]
    fn test_backreference_uses_target() {
        let group = Regex::literal("abc").captured();
        let root = Regex::concat([group.clone(), Regex::backreference(&group)]);
        assert_eq!(bounds(&root), LengthBounds::exact(6));
    }

    #[test]
    fn test_unresolved_and_self_reference_are_unknown() {
        let stray = Regex::literal("x").captured();
        assert_eq!(bounds(&Regex::backreference(&stray)), LengthBounds::UNKNOWN);

        // a group containing a reference to itself
        let inner = Regex::literal("a").captured();
        let backref = Regex::backreference(&inner);
        let group = Regex::with_id(
            inner.id(),
            NodeKind::Group {
                child: Regex::concat([Regex::literal("a"), backref]),
                kind: crate::ast::GroupKind::Capturing { name: None },
            },
        );
        assert_eq!(bounds(&group), LengthBounds { min: 1, max: None });
    }

    #[test]
    fn test_check_lookbehinds() {
        let fixed = Regex::literal("b").preceded_by(Regex::literal("a"));
        let analyzer = LengthAnalyzer::new(&fixed);
        assert!(analyzer.check_lookbehinds(&fixed).is_ok());

        let variable =
            Regex::literal("b").preceded_by(Regex::literal("a").between(1, 2).unwrap());
        let analyzer = LengthAnalyzer::new(&variable);
        let err = analyzer.check_lookbehinds(&variable).unwrap_err();
        assert!(matches!(
            err,
            CompileError::VariableLengthLookbehind {
                bounds: LengthBounds { min: 1, max: Some(2) },
                ..
            }
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(LengthBounds { min: 1, max: Some(3) }.to_string(), "1..=3");
        assert_eq!(LengthBounds::UNKNOWN.to_string(), "0..");
    }
}
