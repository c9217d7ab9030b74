//! Backreference and conditional resolution
//!
//! References hold the identity of the group they point at. Once the
//! registry has numbered the groups, each reference is mapped to the text
//! the emitter writes for it.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{NodeId, NodeKind, Regex};
use crate::error::CompileError;
use crate::groups::GroupRegistry;

/// How references to named groups are spelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceStyle {
    /// `(?P=name)` and `(?(name)...)` for named targets
    #[default]
    Named,
    /// `\N` and `(?(N)...)` for every target
    Numbered,
}

/// A resolved reference target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    /// Refer to the group by index
    Index(u32),
    /// Refer to the group by name
    Name(String),
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Index(index) => write!(f, "{index}"),
            GroupRef::Name(name) => f.write_str(name),
        }
    }
}

/// Reference text for every group a backreference or conditional of a tree
/// points at, keyed by the target group
#[derive(Debug, Clone, Default)]
pub struct ResolvedRefs {
    refs: HashMap<NodeId, GroupRef>,
}

impl ResolvedRefs {
    /// How references to the group `target` are written
    pub fn get(&self, target: NodeId) -> Option<&GroupRef> {
        self.refs.get(&target)
    }

    /// Number of distinct reference targets
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Whether the tree had no references
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Resolves group identities against a populated registry
pub struct BackrefResolver<'a> {
    registry: &'a GroupRegistry,
    style: ReferenceStyle,
}

impl<'a> BackrefResolver<'a> {
    pub fn new(registry: &'a GroupRegistry, style: ReferenceStyle) -> Self {
        BackrefResolver { registry, style }
    }

    /// Resolve one target
    ///
    /// # Errors
    /// Returns [`CompileError::UnresolvedBackreference`] if no capturing
    /// group of the tree has the identity `target`.
    pub fn resolve(&self, target: NodeId) -> Result<GroupRef, CompileError> {
        let info = self
            .registry
            .get_by_node(target)
            .ok_or(CompileError::UnresolvedBackreference(target))?;
        match (&info.name, self.style, info.internal) {
            (Some(name), ReferenceStyle::Named, false) => Ok(GroupRef::Name(name.clone())),
            _ => Ok(GroupRef::Index(info.index)),
        }
    }

    /// Resolve every backreference and conditional test of `root`
    pub fn resolve_all(&self, root: &Regex) -> Result<ResolvedRefs, CompileError> {
        let mut refs = HashMap::new();
        for node in root.walk() {
            match node.kind() {
                NodeKind::Backreference { target } | NodeKind::Conditional { test: target, .. } => {
                    if !refs.contains_key(target) {
                        refs.insert(*target, self.resolve(*target)?);
                    }
                }
                _ => {}
            }
        }
        Ok(ResolvedRefs { refs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::GroupCollector;
    use std::collections::HashSet;

    fn registry_for(root: &Regex) -> GroupRegistry {
        let mut registry = GroupRegistry::new();
        GroupCollector::collect(root, &HashSet::new(), &mut registry).unwrap();
        registry
    }

    #[test]
    fn test_named_target_resolves_to_name() {
        let group = Regex::literal("a").named("first").unwrap();
        let group_id = group.id();
        let backref = Regex::backreference(&group);
        let root = Regex::concat([group, backref]);
        let registry = registry_for(&root);

        let refs = BackrefResolver::new(&registry, ReferenceStyle::Named)
            .resolve_all(&root)
            .unwrap();
        assert_eq!(refs.get(group_id), Some(&GroupRef::Name("first".into())));

        let refs = BackrefResolver::new(&registry, ReferenceStyle::Numbered)
            .resolve_all(&root)
            .unwrap();
        assert_eq!(refs.get(group_id), Some(&GroupRef::Index(1)));
    }

    #[test]
    fn test_unnamed_target_resolves_to_index() {
        let first = Regex::literal("a").captured();
        let second = Regex::literal("b").captured();
        let second_id = second.id();
        let cond = Regex::conditional(&second, Regex::literal("x"), Regex::concat([]));
        let root = Regex::concat([first, second, cond]);
        let registry = registry_for(&root);
        let refs = BackrefResolver::new(&registry, ReferenceStyle::Named)
            .resolve_all(&root)
            .unwrap();
        assert_eq!(refs.get(second_id), Some(&GroupRef::Index(2)));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_shared_reference_node_follows_each_target() {
        let first = Regex::literal("a").captured();
        let second = Regex::literal("b").captured();
        let to_first = Regex::backreference(&first);
        let to_second = to_first.rebuild(NodeKind::Backreference {
            target: second.id(),
        });
        let root = Regex::concat([first.clone(), to_first, second.clone(), to_second]);
        let registry = registry_for(&root);
        let refs = BackrefResolver::new(&registry, ReferenceStyle::Named)
            .resolve_all(&root)
            .unwrap();
        assert_eq!(refs.get(first.id()), Some(&GroupRef::Index(1)));
        assert_eq!(refs.get(second.id()), Some(&GroupRef::Index(2)));
    }

    #[test]
    fn test_forward_reference_resolves() {
        let group = Regex::literal("a").captured();
        let root = Regex::concat([Regex::backreference(&group), group]);
        let registry = registry_for(&root);
        assert!(
            BackrefResolver::new(&registry, ReferenceStyle::Named)
                .resolve_all(&root)
                .is_ok()
        );
    }

    #[test]
    fn test_missing_target_fails() {
        let stray = Regex::literal("a").captured();
        let root = Regex::concat([Regex::literal("b"), Regex::backreference(&stray)]);
        let registry = registry_for(&root);
        let err = BackrefResolver::new(&registry, ReferenceStyle::Named)
            .resolve_all(&root)
            .unwrap_err();
        assert_eq!(err, CompileError::UnresolvedBackreference(stray.id()));
    }

    #[test]
    fn test_non_capturing_target_fails() {
        let group = Regex::literal("a").non_capturing();
        let root = Regex::concat([group.clone(), Regex::backreference(&group)]);
        let registry = registry_for(&root);
        assert!(
            BackrefResolver::new(&registry, ReferenceStyle::Named)
                .resolve_all(&root)
                .is_err()
        );
    }
}
