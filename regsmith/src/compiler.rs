//! Compiler driver
//!
//! Runs the passes in order: lowering, group numbering, reference
//! resolution, the lookbehind length check and emission. Every call takes
//! its [`CompileOptions`] explicitly.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use tracing::debug;

use crate::ast::{Direction, GroupKind, NodeKind, Regex};
use crate::emit::Emitter;
use crate::error::Result;
use crate::groups::{GroupCollector, GroupInfo, GroupRegistry};
use crate::length::{LengthAnalyzer, LengthBounds};
use crate::lower::{Lowered, Lowering};
use crate::resolve::{BackrefResolver, ReferenceStyle};

/// Capabilities of the target engine and checks to apply
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileOptions {
    /// Emit `(?>...)` instead of the lookahead-and-backreference idiom
    pub atomic_group_native_support: bool,
    /// Reject lookbehinds that can match strings of different lengths
    pub require_fixed_length_lookbehind: bool,
    /// How references to named groups are written
    pub reference_style: ReferenceStyle,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            atomic_group_native_support: false,
            require_fixed_length_lookbehind: true,
            reference_style: ReferenceStyle::Named,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_atomic_groups(mut self, native: bool) -> Self {
        self.atomic_group_native_support = native;
        self
    }

    pub fn with_fixed_length_lookbehind(mut self, required: bool) -> Self {
        self.require_fixed_length_lookbehind = required;
        self
    }

    pub fn with_reference_style(mut self, style: ReferenceStyle) -> Self {
        self.reference_style = style;
        self
    }
}

/// Pattern text plus the table for reading match results
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompiledPattern {
    pattern: String,
    group_names: BTreeMap<String, u32>,
    groups: Vec<GroupInfo>,
    group_count: usize,
}

impl CompiledPattern {
    /// The pattern text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Public named groups and their engine indices
    pub fn group_names(&self) -> &BTreeMap<String, u32> {
        &self.group_names
    }

    /// Public capture groups, named or not, in index order
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Number of capture groups the engine sees, internal ones included
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Engine index of the named group `name`
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.group_names.get(name).copied()
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

struct Pipeline {
    lowered: Regex,
    registry: GroupRegistry,
    pattern: String,
}

fn run(root: &Regex, options: &CompileOptions) -> Result<Pipeline> {
    let Lowered {
        root: lowered,
        internal,
    } = Lowering::new(options.atomic_group_native_support).run(root);

    let mut registry = GroupRegistry::new();
    GroupCollector::collect(&lowered, &internal, &mut registry)?;

    let refs = BackrefResolver::new(&registry, options.reference_style).resolve_all(&lowered)?;

    if options.require_fixed_length_lookbehind {
        LengthAnalyzer::new(&lowered).check_lookbehinds(&lowered)?;
    }

    let pattern = Emitter::new(&refs).emit(&lowered)?.into_text();
    Ok(Pipeline {
        lowered,
        registry,
        pattern,
    })
}

/// Compile a tree into pattern text
///
/// # Example
/// ```
/// use regsmith::{CompileOptions, Regex};
///
/// let word = Regex::literal("ab").named("word").unwrap();
/// let tree = Regex::concat([word.clone(), Regex::backreference(&word)]);
/// let compiled = tree.compile(&CompileOptions::default()).unwrap();
/// assert_eq!(compiled.pattern(), "(?P<word>ab)(?P=word)");
/// assert_eq!(compiled.index_of("word"), Some(1));
/// ```
pub fn compile(root: &Regex, options: &CompileOptions) -> Result<CompiledPattern> {
    debug!(root = %root.id(), ?options, "compiling");
    let Pipeline {
        registry, pattern, ..
    } = run(root, options)?;

    debug!(
        groups = registry.group_count(),
        pattern = %pattern,
        "compiled"
    );
    Ok(CompiledPattern {
        group_names: registry.public_names(),
        groups: registry.public_groups().cloned().collect(),
        group_count: registry.group_count(),
        pattern,
    })
}

/// Compile with intermediate results for debugging
pub fn compile_debug(root: &Regex, options: &CompileOptions) -> Result<CompileReport> {
    let Pipeline {
        lowered,
        registry,
        pattern,
    } = run(root, options)?;

    Ok(CompileReport {
        tree: outline(root),
        lowered: outline(&lowered),
        bounds: LengthAnalyzer::new(&lowered).bounds(&lowered),
        groups: registry.groups().to_vec(),
        pattern,
    })
}

/// Result of a compilation with debug information
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// Outline of the input tree
    pub tree: String,
    /// Outline of the tree after lowering
    pub lowered: String,
    /// Every capture group, internal ones included
    pub groups: Vec<GroupInfo>,
    /// Matched-length bounds of the whole pattern
    pub bounds: LengthBounds,
    /// The emitted pattern text
    pub pattern: String,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "Tree:")?;
        f.write_str(&self.tree)?;
        writeln!(f, "Lowered:")?;
        f.write_str(&self.lowered)?;
        writeln!(f, "Groups:")?;
        for group in &self.groups {
            let name = group.name.as_deref().unwrap_or("-");
            let internal = if group.internal { " (internal)" } else { "" };
            writeln!(f, "  {} {} {}{}", group.index, name, group.node, internal)?;
        }
        writeln!(f, "Length:  {}", self.bounds)?;
        write!(f, "Pattern: {}", self.pattern)
    }
}

/// One line per node, indented by depth
fn outline(root: &Regex) -> String {
    fn visit(node: &Regex, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{:indent$}{} {}", "", node.id(), label(node.kind()), indent = depth * 2);
        for child in node.children() {
            visit(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    visit(root, 1, &mut out);
    out
}

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Literal(text) => format!("literal {text:?}"),
        NodeKind::CharClass(class) if class.is_negated() => {
            format!("negated class of {}", class.items().len())
        }
        NodeKind::CharClass(class) => format!("class of {}", class.items().len()),
        NodeKind::Concat(_) => "concat".to_string(),
        NodeKind::Alternation(_) => "alternation".to_string(),
        NodeKind::Repetition { counts, .. } => match counts.max() {
            Some(max) => format!("repeat {}..={}", counts.min(), max),
            None => format!("repeat {}..", counts.min()),
        },
        NodeKind::Group {
            kind: GroupKind::NonCapturing,
            ..
        } => "group".to_string(),
        NodeKind::Group {
            kind: GroupKind::Capturing { name: None },
            ..
        } => "capture".to_string(),
        NodeKind::Group {
            kind: GroupKind::Capturing { name: Some(name) },
            ..
        } => format!("capture {name:?}"),
        NodeKind::Backreference { target } => format!("backref {target}"),
        NodeKind::Lookaround {
            direction,
            negated,
            ..
        } => {
            let side = match direction {
                Direction::Ahead => "lookahead",
                Direction::Behind => "lookbehind",
            };
            if *negated {
                format!("negative {side}")
            } else {
                side.to_string()
            }
        }
        NodeKind::Conditional { test, .. } => format!("if {test}"),
        NodeKind::Atomic(_) => "atomic".to_string(),
        NodeKind::Comment(text) => format!("comment {text:?}"),
        NodeKind::Special(special) => format!("special {}", special.as_str()),
        NodeKind::Flags { flags, .. } => format!("flags {flags}"),
    }
}
