//! Pattern emission
//!
//! The emitter turns a lowered, resolved tree into pattern text. Each node
//! becomes a fragment tagged with how tightly it binds; a parent wraps a
//! child in `(?:...)` only when the child binds more loosely than the slot it
//! is placed in requires.

use tracing::trace;

use crate::ast::{Direction, GroupKind, NodeId, NodeKind, Regex};
use crate::class::CharClass;
use crate::error::CompileError;
use crate::resolve::{GroupRef, ResolvedRefs};

/// How tightly a fragment binds, loosest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    /// `a|b`
    Alternation,
    /// `ab`, `a*`
    Concatenation,
    /// Zero-width constructs such as `^` or `(?=a)`
    Assertion,
    /// A single character, class or parenthesized construct
    Atom,
}

/// Emitted text of one node
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    text: String,
    precedence: Precedence,
    /// The text ends in a numeric backreference such as `\3`
    trailing_backref: bool,
}

impl Fragment {
    fn new(text: impl Into<String>, precedence: Precedence) -> Self {
        Fragment {
            text: text.into(),
            precedence,
            trailing_backref: false,
        }
    }

    fn empty() -> Self {
        Fragment::new(String::new(), Precedence::Concatenation)
    }

    fn starts_with_digit(&self) -> bool {
        self.text.starts_with(|c: char| c.is_ascii_digit())
    }

    fn group(self) -> Fragment {
        Fragment::new(format!("(?:{})", self.text), Precedence::Atom)
    }

    /// Make the fragment fit a slot that needs at least `required`
    fn fit(self, required: Precedence) -> Fragment {
        if self.precedence < required {
            self.group()
        } else {
            self
        }
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }
}

/// Escape every metacharacter and control character of `text`
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_literal_char(&mut out, c, false);
    }
    out
}

fn push_literal_char(out: &mut String, c: char, verbose: bool) {
    match c {
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        | '#' | '&' | '-' | '~' => {
            out.push('\\');
            out.push(c);
        }
        ' ' if verbose => out.push_str("\\x20"),
        c if c.is_control() => push_control(out, c),
        c => out.push(c),
    }
}

fn push_class_char(out: &mut String, c: char) {
    match c {
        '\\' | ']' | '[' | '^' | '-' => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => push_control(out, c),
        c => out.push(c),
    }
}

fn push_control(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c => out.push_str(&format!("\\x{:02x}", c as u32)),
    }
}

/// Render a class; classes that match nothing or everything get special forms
fn render_class(class: &CharClass) -> Fragment {
    let intervals = class.intervals();
    let specials = class.specials();
    if intervals.is_empty() && specials.is_empty() {
        return if class.is_negated() {
            Fragment::new("[\\s\\S]", Precedence::Atom)
        } else {
            Fragment::new("(?!)", Precedence::Assertion)
        };
    }

    let mut out = String::from("[");
    if class.is_negated() {
        out.push('^');
    }
    for (start, end) in intervals {
        push_class_char(&mut out, start);
        match end as u32 - start as u32 {
            0 => {}
            1 => push_class_char(&mut out, end),
            _ => {
                out.push('-');
                push_class_char(&mut out, end);
            }
        }
    }
    for special in specials {
        out.push_str(special.as_str());
    }
    out.push(']');
    Fragment::new(out, Precedence::Atom)
}

fn quantifier(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, Some(1)) => "?".to_string(),
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (n, Some(m)) if n == m => format!("{{{n}}}"),
        (n, None) => format!("{{{n},}}"),
        (n, Some(m)) => format!("{{{n},{m}}}"),
    }
}

enum Branch<'t> {
    Node(&'t Regex),
    Class(CharClass),
}

/// Serializes a lowered tree whose references have been resolved
pub(crate) struct Emitter<'a> {
    refs: &'a ResolvedRefs,
    verbose: bool,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(refs: &'a ResolvedRefs) -> Self {
        Emitter {
            refs,
            verbose: false,
        }
    }

    pub(crate) fn emit(&mut self, node: &Regex) -> Result<Fragment, CompileError> {
        let fragment = match node.kind() {
            NodeKind::Literal(text) => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    push_literal_char(&mut out, c, self.verbose);
                }
                let precedence = if text.chars().count() == 1 {
                    Precedence::Atom
                } else {
                    Precedence::Concatenation
                };
                Fragment::new(out, precedence)
            }

            NodeKind::CharClass(class) => render_class(class),

            NodeKind::Concat(children) => self.emit_concat(children)?,

            NodeKind::Alternation(children) => self.emit_alternation(children)?,

            NodeKind::Repetition { child, counts } => {
                debug_assert!(counts.is_contiguous(), "repetition was not lowered");
                let inner = self.emit(child)?;
                match (counts.min(), counts.max()) {
                    (1, Some(1)) => inner,
                    (min, max) => {
                        let inner = inner.fit(Precedence::Atom);
                        Fragment::new(
                            format!("{}{}", inner.text, quantifier(min, max)),
                            Precedence::Concatenation,
                        )
                    }
                }
            }

            NodeKind::Group { child, kind } => {
                let inner = self.emit(child)?;
                let text = match kind {
                    GroupKind::NonCapturing => format!("(?:{})", inner.text),
                    GroupKind::Capturing { name: None } => format!("({})", inner.text),
                    GroupKind::Capturing { name: Some(name) } => {
                        format!("(?P<{name}>{})", inner.text)
                    }
                };
                Fragment::new(text, Precedence::Atom)
            }

            NodeKind::Backreference { target } => match self.reference(*target)? {
                GroupRef::Index(index) => Fragment {
                    text: format!("\\{index}"),
                    precedence: Precedence::Atom,
                    trailing_backref: true,
                },
                GroupRef::Name(name) => Fragment::new(format!("(?P={name})"), Precedence::Atom),
            },

            NodeKind::Lookaround {
                child,
                direction,
                negated,
            } => {
                let opener = match (direction, negated) {
                    (Direction::Ahead, false) => "(?=",
                    (Direction::Ahead, true) => "(?!",
                    (Direction::Behind, false) => "(?<=",
                    (Direction::Behind, true) => "(?<!",
                };
                let inner = self.emit(child)?;
                Fragment::new(format!("{opener}{})", inner.text), Precedence::Assertion)
            }

            NodeKind::Conditional {
                test,
                then_branch,
                else_branch,
            } => {
                let reference = self.reference(*test)?;
                let then_text = self.emit(then_branch)?.fit(Precedence::Concatenation);
                let else_text = self.emit(else_branch)?.fit(Precedence::Concatenation);
                Fragment::new(
                    format!("(?({reference}){}|{})", then_text.text, else_text.text),
                    Precedence::Atom,
                )
            }

            NodeKind::Atomic(child) => {
                let inner = self.emit(child)?;
                Fragment::new(format!("(?>{})", inner.text), Precedence::Atom)
            }

            NodeKind::Comment(text) => Fragment::new(format!("(?#{text})"), Precedence::Assertion),

            NodeKind::Special(special) => {
                let precedence = if special.is_zero_width() {
                    Precedence::Assertion
                } else {
                    Precedence::Atom
                };
                Fragment::new(special.as_str(), precedence)
            }

            NodeKind::Flags { child, flags } => {
                let outer = self.verbose;
                if let Some(verbose) = flags.verbose() {
                    self.verbose = verbose;
                }
                let inner = self.emit(child);
                self.verbose = outer;
                Fragment::new(format!("(?{flags}:{})", inner?.text), Precedence::Atom)
            }
        };
        trace!(node = %node.id(), text = %fragment.text, "emitted");
        Ok(fragment)
    }

    fn reference(&self, target: NodeId) -> Result<GroupRef, CompileError> {
        self.refs
            .get(target)
            .cloned()
            .ok_or(CompileError::UnresolvedBackreference(target))
    }

    fn emit_concat(&mut self, children: &[Regex]) -> Result<Fragment, CompileError> {
        let mut parts: Vec<Fragment> = Vec::with_capacity(children.len());
        for child in children {
            let part = self.emit(child)?;
            if part.text.is_empty() {
                continue;
            }
            if part.starts_with_digit() {
                if let Some(prev) = parts.last_mut() {
                    if prev.trailing_backref {
                        let wrapped = std::mem::replace(prev, Fragment::empty()).group();
                        *prev = wrapped;
                    }
                }
            }
            parts.push(part);
        }

        match parts.len() {
            0 => Ok(Fragment::empty()),
            1 => Ok(parts.remove(0)),
            _ => {
                let trailing_backref = parts.last().is_some_and(|p| p.trailing_backref);
                let text = parts
                    .into_iter()
                    .map(|p| p.fit(Precedence::Concatenation).text)
                    .collect::<String>();
                Ok(Fragment {
                    text,
                    precedence: Precedence::Concatenation,
                    trailing_backref,
                })
            }
        }
    }

    fn emit_alternation(&mut self, children: &[Regex]) -> Result<Fragment, CompileError> {
        let mut flat = Vec::new();
        flatten_alternation(children, &mut flat);

        let mut branches: Vec<Branch<'_>> = Vec::with_capacity(flat.len());
        let mut i = 0;
        while i < flat.len() {
            let run_end = flat[i..]
                .iter()
                .position(|node| !is_plain_class(node))
                .map_or(flat.len(), |offset| i + offset);
            if run_end - i >= 2 {
                let classes = flat[i..run_end].iter().filter_map(|node| match node.kind() {
                    NodeKind::CharClass(class) => Some(class),
                    _ => None,
                });
                branches.push(Branch::Class(CharClass::union(classes)));
                i = run_end;
            } else {
                branches.push(Branch::Node(flat[i]));
                i += 1;
            }
        }

        let mut parts = Vec::with_capacity(branches.len());
        for branch in &branches {
            let part = match branch {
                Branch::Node(node) => self.emit(node)?,
                Branch::Class(class) => render_class(class),
            };
            parts.push(part);
        }

        match parts.len() {
            0 => Ok(Fragment::new("(?!)", Precedence::Assertion)),
            1 => Ok(parts.remove(0)),
            _ => {
                let texts: Vec<String> = parts
                    .into_iter()
                    .map(|p| p.fit(Precedence::Concatenation).text)
                    .collect();
                Ok(Fragment::new(texts.join("|"), Precedence::Alternation))
            }
        }
    }
}

fn is_plain_class(node: &Regex) -> bool {
    matches!(node.kind(), NodeKind::CharClass(class) if !class.is_negated())
}

fn flatten_alternation<'t>(children: &'t [Regex], out: &mut Vec<&'t Regex>) {
    for child in children {
        match child.kind() {
            NodeKind::Alternation(nested) => flatten_alternation(nested, out),
            _ => out.push(child),
        }
    }
}
