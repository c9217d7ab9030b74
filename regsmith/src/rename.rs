//! Capture group renaming
//!
//! Renaming rebuilds only the path from the root to each renamed group.
//! A renamed group is a new group with a fresh identity, and every
//! backreference and conditional of the tree that pointed at it follows it,
//! so a tree and its renamed copy can be combined.

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::trace;

use crate::ast::{GroupKind, NodeId, NodeKind, Regex, is_valid_group_name};
use crate::error::{BuildError, Result};
use crate::groups::{GroupCollector, GroupRegistry};

/// Maps an existing group name to its replacement
///
/// `None` turns the group into an unnamed capturing group.
pub trait NameMapping {
    fn map_name(&self, name: &str) -> Option<String>;
}

impl<F> NameMapping for F
where
    F: Fn(&str) -> Option<String>,
{
    fn map_name(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// A finite rename table; names without an entry are kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    entries: HashMap<String, Option<String>>,
}

impl RenameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename `from` to `to`
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.insert(from.into(), Some(to.into()));
        self
    }

    /// Turn the group named `name` into an unnamed group
    pub fn drop_name(mut self, name: impl Into<String>) -> Self {
        self.entries.insert(name.into(), None);
        self
    }
}

impl NameMapping for RenameTable {
    fn map_name(&self, name: &str) -> Option<String> {
        match self.entries.get(name) {
            Some(entry) => entry.clone(),
            None => Some(name.to_string()),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RenameTable
where
    K: Into<String>,
    V: Into<Option<String>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RenameTable {
            entries: iter
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        }
    }
}

/// New identity and name of a group whose name changes
struct Renamed {
    id: NodeId,
    name: Option<String>,
}

/// Rename the named groups of `root` through `mapping`
///
/// # Errors
/// [`BuildError::InvalidGroupName`] if a new name is not an identifier,
/// [`crate::CompileError::DuplicateGroupName`] if two groups end up sharing
/// a name.
pub fn rename<M: NameMapping + ?Sized>(root: &Regex, mapping: &M) -> Result<Regex> {
    let mut renames = HashMap::new();
    for (id, name) in named(root) {
        if renames.contains_key(&id) {
            continue;
        }
        let new_name = mapping.map_name(name);
        if let Some(new_name) = &new_name {
            if !is_valid_group_name(new_name) {
                return Err(BuildError::InvalidGroupName(new_name.clone()).into());
            }
        }
        if new_name.as_deref() != Some(name) {
            renames.insert(
                id,
                Renamed {
                    id: NodeId::fresh(),
                    name: new_name,
                },
            );
        }
    }
    let renamed = rewrite_groups(root, &renames);

    let mut registry = GroupRegistry::new();
    GroupCollector::collect(&renamed, &HashSet::new(), &mut registry)?;
    Ok(renamed)
}

/// Turn every named group of `root` into an unnamed capturing group
pub fn drop_names(root: &Regex) -> Regex {
    let renames: HashMap<NodeId, Renamed> = named(root)
        .map(|(id, _)| {
            let renamed = Renamed {
                id: NodeId::fresh(),
                name: None,
            };
            (id, renamed)
        })
        .collect();
    rewrite_groups(root, &renames)
}

fn named(root: &Regex) -> impl Iterator<Item = (NodeId, &str)> {
    root.walk()
        .filter_map(|node| node.group_name().map(|name| (node.id(), name)))
}

fn rewrite_groups(node: &Regex, renames: &HashMap<NodeId, Renamed>) -> Regex {
    if let (Some(renamed), NodeKind::Group { child, .. }) = (renames.get(&node.id()), node.kind()) {
        trace!(node = %node.id(), fresh = %renamed.id, to = ?renamed.name, "renaming group");
        return Regex::with_id(
            renamed.id,
            NodeKind::Group {
                child: rewrite_groups(child, renames),
                kind: GroupKind::Capturing {
                    name: renamed.name.clone(),
                },
            },
        );
    }

    match node.kind() {
        NodeKind::Backreference { target } => match renames.get(target) {
            Some(renamed) => node.rebuild(NodeKind::Backreference { target: renamed.id }),
            None => node.clone(),
        },
        NodeKind::Conditional {
            test,
            then_branch,
            else_branch,
        } => match renames.get(test) {
            Some(renamed) => node.rebuild(NodeKind::Conditional {
                test: renamed.id,
                then_branch: rewrite_groups(then_branch, renames),
                else_branch: rewrite_groups(else_branch, renames),
            }),
            None => node.rebuild_children(|child| rewrite_groups(child, renames)),
        },
        _ => node.rebuild_children(|child| rewrite_groups(child, renames)),
    }
}
