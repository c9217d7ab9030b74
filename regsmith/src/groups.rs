//! Group registry for tracking capture groups
//!
//! The registry assigns every capturing group of a tree its engine index, in
//! the order the groups open in the emitted pattern. It is used for:
//! - Resolving backreferences and conditionals, which point at group nodes
//! - Ensuring group names are unique
//! - Publishing the name-to-index table of a compiled pattern

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::{GroupKind, NodeId, NodeKind, Regex};
use crate::error::CompileError;

/// Information about a capture group
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupInfo {
    /// The index of the group (1-based, as in `\1`, `\2`, ...)
    pub index: u32,
    /// The name of the group, if it is a named group
    pub name: Option<String>,
    /// Identity of the group node
    pub node: NodeId,
    /// Whether the compiler inserted this group for its own use
    pub internal: bool,
}

/// Registry for tracking capture groups
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: Vec<GroupInfo>,
    name_to_index: HashMap<String, u32>,
    node_to_index: HashMap<NodeId, u32>,
    next_index: u32,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        GroupRegistry {
            groups: Vec::new(),
            name_to_index: HashMap::new(),
            node_to_index: HashMap::new(),
            next_index: 1,
        }
    }

    /// Register the next capture group
    ///
    /// When the same node is registered twice, lookups by node keep
    /// returning the first index.
    ///
    /// # Errors
    /// Returns [`CompileError::DuplicateGroupName`] if the name is in use.
    pub fn register_group(
        &mut self,
        node: NodeId,
        name: Option<String>,
        internal: bool,
    ) -> Result<u32, CompileError> {
        if let Some(group_name) = &name {
            if self.name_to_index.contains_key(group_name) {
                return Err(CompileError::DuplicateGroupName(group_name.clone()));
            }
        }

        let index = self.next_index;
        self.next_index += 1;

        if let Some(group_name) = &name {
            self.name_to_index.insert(group_name.clone(), index);
        }
        self.node_to_index.entry(node).or_insert(index);
        self.groups.push(GroupInfo {
            index,
            name,
            node,
            internal,
        });
        Ok(index)
    }

    /// Get group info by index
    pub fn get_by_index(&self, index: u32) -> Option<&GroupInfo> {
        let slot = index.checked_sub(1)? as usize;
        self.groups.get(slot)
    }

    /// Get group index by name
    pub fn get_by_name(&self, name: &str) -> Option<u32> {
        self.name_to_index.get(name).copied()
    }

    /// Get the group info of a group node
    pub fn get_by_node(&self, node: NodeId) -> Option<&GroupInfo> {
        self.node_to_index
            .get(&node)
            .and_then(|&index| self.get_by_index(index))
    }

    /// Check if a group name exists
    pub fn has_name(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get the total number of capture groups, internal ones included
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get all group infos, in index order
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Groups visible to callers, in index order
    pub fn public_groups(&self) -> impl Iterator<Item = &GroupInfo> {
        self.groups.iter().filter(|g| !g.internal)
    }

    /// Name-to-index table of the public named groups
    pub fn public_names(&self) -> BTreeMap<String, u32> {
        self.public_groups()
            .filter_map(|g| g.name.clone().map(|name| (name, g.index)))
            .collect()
    }
}

/// A visitor that collects group information from a tree
pub struct GroupCollector<'a> {
    internal: &'a HashSet<NodeId>,
}

impl<'a> GroupCollector<'a> {
    /// Collect all groups of `root`, marking the nodes in `internal`
    pub fn collect(
        root: &Regex,
        internal: &'a HashSet<NodeId>,
        registry: &mut GroupRegistry,
    ) -> Result<(), CompileError> {
        GroupCollector { internal }.visit(root, registry)
    }

    fn visit(&self, node: &Regex, registry: &mut GroupRegistry) -> Result<(), CompileError> {
        match node.kind() {
            NodeKind::Literal(_)
            | NodeKind::CharClass(_)
            | NodeKind::Backreference { .. }
            | NodeKind::Comment(_)
            | NodeKind::Special(_) => Ok(()),

            NodeKind::Concat(children) | NodeKind::Alternation(children) => {
                for child in children {
                    self.visit(child, registry)?;
                }
                Ok(())
            }

            NodeKind::Group {
                child,
                kind: GroupKind::Capturing { name },
            } => {
                let internal = self.internal.contains(&node.id());
                registry.register_group(node.id(), name.clone(), internal)?;
                self.visit(child, registry)
            }

            NodeKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                self.visit(then_branch, registry)?;
                self.visit(else_branch, registry)
            }

            NodeKind::Group { child, .. }
            | NodeKind::Repetition { child, .. }
            | NodeKind::Lookaround { child, .. }
            | NodeKind::Atomic(child)
            | NodeKind::Flags { child, .. } => self.visit(child, registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(root: &Regex) -> Result<GroupRegistry, CompileError> {
        let mut registry = GroupRegistry::new();
        GroupCollector::collect(root, &HashSet::new(), &mut registry)?;
        Ok(registry)
    }

    #[test]
    fn test_register_unnamed_group() {
        let mut registry = GroupRegistry::new();
        let index = registry.register_group(NodeId::fresh(), None, false).unwrap();
        assert_eq!(index, 1);
        assert_eq!(registry.group_count(), 1);
    }

    #[test]
    fn test_register_named_group() {
        let mut registry = GroupRegistry::new();
        let node = NodeId::fresh();
        let index = registry
            .register_group(node, Some("name".to_string()), false)
            .unwrap();
        assert_eq!(index, 1);
        assert!(registry.has_name("name"));
        assert_eq!(registry.get_by_name("name"), Some(1));
        assert_eq!(registry.get_by_node(node).map(|g| g.index), Some(1));
    }

    #[test]
    fn test_duplicate_name_error() {
        let mut registry = GroupRegistry::new();
        registry
            .register_group(NodeId::fresh(), Some("name".to_string()), false)
            .unwrap();
        let result = registry.register_group(NodeId::fresh(), Some("name".to_string()), false);
        assert!(matches!(result, Err(CompileError::DuplicateGroupName(_))));
    }

    #[test]
    fn test_get_by_index() {
        let mut registry = GroupRegistry::new();
        registry
            .register_group(NodeId::fresh(), Some("name".to_string()), false)
            .unwrap();

        let info = registry.get_by_index(1).unwrap();
        assert_eq!(info.index, 1);
        assert_eq!(info.name, Some("name".to_string()));
        assert!(registry.get_by_index(0).is_none());
        assert!(registry.get_by_index(2).is_none());
    }

    #[test]
    fn test_reused_node_keeps_first_index() {
        let mut registry = GroupRegistry::new();
        let node = NodeId::fresh();
        registry.register_group(node, None, false).unwrap();
        registry.register_group(node, None, false).unwrap();
        assert_eq!(registry.group_count(), 2);
        assert_eq!(registry.get_by_node(node).map(|g| g.index), Some(1));
    }

    #[test]
    fn test_internal_groups_hidden_from_public_names() {
        let mut registry = GroupRegistry::new();
        registry.register_group(NodeId::fresh(), None, true).unwrap();
        registry
            .register_group(NodeId::fresh(), Some("word".to_string()), false)
            .unwrap();
        assert_eq!(registry.public_groups().count(), 1);
        assert_eq!(registry.public_names().get("word"), Some(&2));
    }

    #[test]
    fn test_collector_with_simple_groups() {
        let root = Regex::concat([
            Regex::literal("a").captured(),
            Regex::literal("b").named("second").unwrap(),
        ]);
        let registry = collect(&root).unwrap();
        assert_eq!(registry.group_count(), 2);
        assert!(registry.get_by_index(1).is_some());
        assert_eq!(registry.get_by_name("second"), Some(2));
    }

    #[test]
    fn test_collector_with_nested_groups() {
        let inner = Regex::literal("b").named("inner").unwrap();
        let root = Regex::concat([Regex::literal("a"), inner])
            .named("outer")
            .unwrap();
        let registry = collect(&root).unwrap();
        assert_eq!(registry.get_by_name("outer"), Some(1));
        assert_eq!(registry.get_by_name("inner"), Some(2));
    }

    #[test]
    fn test_collector_skips_non_capturing() {
        let root = Regex::concat([
            Regex::literal("a").non_capturing(),
            Regex::literal("b").captured().followed_by(Regex::literal("c").captured()),
        ]);
        let registry = collect(&root).unwrap();
        assert_eq!(registry.group_count(), 2);
    }

    #[test]
    fn test_collector_with_duplicate_names() {
        let root = Regex::concat([
            Regex::literal("a").named("dup").unwrap(),
            Regex::literal("b").named("dup").unwrap(),
        ]);
        assert!(matches!(
            collect(&root),
            Err(CompileError::DuplicateGroupName(name)) if name == "dup"
        ));
    }

    #[test]
    fn test_collector_visits_conditional_branches() {
        let test = Regex::literal("a").captured();
        let root = Regex::concat([
            test.clone(),
            Regex::conditional(
                &test,
                Regex::literal("b").captured(),
                Regex::literal("c").captured(),
            ),
        ]);
        let registry = collect(&root).unwrap();
        assert_eq!(registry.group_count(), 3);
        assert_eq!(registry.get_by_node(test.id()).map(|g| g.index), Some(1));
    }
}
