//! Tree rewrites applied before groups are numbered
//!
//! Two constructs have no direct spelling in every engine:
//! - Atomic groups, when the engine lacks `(?>...)`, become
//!   `(?=(X))\N`: the lookahead matches once and is never re-entered, and the
//!   backreference consumes exactly what it captured.
//! - Repetitions whose counts are not a gap-free run are expanded into
//!   range quantifiers, copying the child where needed.
//!
//! Capturing groups the lowering inserts are internal: they take an engine
//! index but are left out of the public group table. When the child of a
//! repetition is copied, only the first copy keeps its public groups; later
//! copies demote them to non-capturing groups. Internal groups, and public
//! groups the copy itself refers to, are re-created as internal groups under
//! fresh identities.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::ast::{Direction, GroupKind, NodeId, NodeKind, Regex};
use crate::repeat::{RepeatCounts, RepeatPlan};

/// A lowered tree together with the identities of its internal groups
#[derive(Debug, Clone)]
pub struct Lowered {
    /// The rewritten tree
    pub root: Regex,
    /// Capturing groups inserted by the lowering
    pub internal: HashSet<NodeId>,
}

/// Rewrites a tree into constructs every target engine understands
#[derive(Debug)]
pub struct Lowering {
    native_atomic: bool,
    internal: HashSet<NodeId>,
}

impl Lowering {
    pub fn new(native_atomic: bool) -> Self {
        Lowering {
            native_atomic,
            internal: HashSet::new(),
        }
    }

    /// Lower `root`, sharing every subtree that needs no rewrite
    pub fn run(mut self, root: &Regex) -> Lowered {
        let root = self.lower(root);
        Lowered {
            root,
            internal: self.internal,
        }
    }

    fn lower(&mut self, node: &Regex) -> Regex {
        match node.kind() {
            NodeKind::Atomic(child) if !self.native_atomic => {
                let child = self.lower(child);
                self.emulate_atomic(node, child)
            }
            NodeKind::Repetition { child, counts } => {
                let lowered = self.lower(child);
                self.expand_repetition(node, child, lowered, counts)
            }
            _ => node.rebuild_children(|child| self.lower(child)),
        }
    }

    fn emulate_atomic(&mut self, node: &Regex, child: Regex) -> Regex {
        let capture = Regex::from_kind(NodeKind::Group {
            child,
            kind: GroupKind::Capturing { name: None },
        });
        self.internal.insert(capture.id());
        trace!(node = %node.id(), capture = %capture.id(), "emulating atomic group");

        let backref = Regex::from_kind(NodeKind::Backreference {
            target: capture.id(),
        });
        let lookahead = Regex::lookaround(capture, Direction::Ahead, false);
        node.rebuild(NodeKind::Concat(vec![lookahead, backref]))
    }

    fn expand_repetition(
        &mut self,
        node: &Regex,
        original: &Regex,
        child: Regex,
        counts: &RepeatCounts,
    ) -> Regex {
        match counts.plan() {
            RepeatPlan::Range { .. } => {
                if child.ptr_eq(original) {
                    node.clone()
                } else {
                    node.rebuild(NodeKind::Repetition {
                        child,
                        counts: counts.clone(),
                    })
                }
            }
            RepeatPlan::Stride { head, step, blocks } => {
                trace!(node = %node.id(), head, step, ?blocks, "expanding strided repetition");
                let blocks = match blocks {
                    Some(max) => RepeatCounts::up_to(max),
                    None => RepeatCounts::at_least(0),
                };
                if head == 0 {
                    let block = Regex::repetition(child, RepeatCounts::exactly(step));
                    return node.rebuild(NodeKind::Repetition {
                        child: block,
                        counts: blocks,
                    });
                }
                let shadow = self.shadow(&child);
                let block = Regex::repetition(shadow, RepeatCounts::exactly(step));
                node.rebuild(NodeKind::Concat(vec![
                    Regex::repetition(child, RepeatCounts::exactly(head)),
                    Regex::repetition(block, blocks),
                ]))
            }
            RepeatPlan::Choice { counts, tail } => {
                trace!(node = %node.id(), ?counts, ?tail, "expanding sparse repetition");
                let plans = tail
                    .map(RepeatCounts::at_least)
                    .into_iter()
                    .chain(counts.into_iter().map(RepeatCounts::exactly));
                let mut branches = Vec::new();
                for (i, plan) in plans.enumerate() {
                    let copy = if i == 0 {
                        child.clone()
                    } else {
                        self.shadow(&child)
                    };
                    branches.push(Regex::repetition(copy, plan));
                }
                node.rebuild(NodeKind::Alternation(branches))
            }
        }
    }

    /// A copy of `node` that adds no public groups and owns its internal ones
    ///
    /// Public groups referenced from inside the copy come back as internal
    /// groups, so the copy's references see what the copy captured.
    fn shadow(&mut self, node: &Regex) -> Regex {
        let referenced: HashSet<NodeId> = node
            .walk()
            .filter_map(|n| match n.kind() {
                NodeKind::Backreference { target } | NodeKind::Conditional { test: target, .. } => {
                    Some(*target)
                }
                _ => None,
            })
            .collect();
        let remap: HashMap<NodeId, NodeId> = node
            .walk()
            .filter(|n| n.is_capturing_group())
            .filter(|n| self.internal.contains(&n.id()) || referenced.contains(&n.id()))
            .map(|n| (n.id(), NodeId::fresh()))
            .collect();
        self.internal.extend(remap.values().copied());
        Self::shadow_node(node, &remap, &self.internal)
    }

    fn shadow_node(
        node: &Regex,
        remap: &HashMap<NodeId, NodeId>,
        internal: &HashSet<NodeId>,
    ) -> Regex {
        match node.kind() {
            NodeKind::Group {
                child,
                kind: GroupKind::Capturing { .. },
            } => {
                let child = Self::shadow_node(child, remap, internal);
                match remap.get(&node.id()) {
                    Some(&fresh) => Regex::with_id(
                        fresh,
                        NodeKind::Group {
                            child,
                            kind: GroupKind::Capturing { name: None },
                        },
                    ),
                    None if internal.contains(&node.id()) => node.rebuild(NodeKind::Group {
                        child,
                        kind: GroupKind::Capturing { name: None },
                    }),
                    None => node.rebuild(NodeKind::Group {
                        child,
                        kind: GroupKind::NonCapturing,
                    }),
                }
            }
            NodeKind::Backreference { target } => match remap.get(target) {
                Some(&fresh) => node.rebuild(NodeKind::Backreference { target: fresh }),
                None => node.clone(),
            },
            NodeKind::Conditional {
                test,
                then_branch,
                else_branch,
            } => node.rebuild(NodeKind::Conditional {
                test: remap.get(test).copied().unwrap_or(*test),
                then_branch: Self::shadow_node(then_branch, remap, internal),
                else_branch: Self::shadow_node(else_branch, remap, internal),
            }),
            _ => node.rebuild_children(|child| Self::shadow_node(child, remap, internal)),
        }
    }
}
