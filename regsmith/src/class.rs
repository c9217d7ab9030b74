//! Character class members and normalization

use crate::ast::Special;
use crate::error::BuildError;

/// One member of a character class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    /// A single character
    Char(char),
    /// An inclusive character range
    Range(char, char),
    /// A shorthand class such as `\d`
    Special(Special),
}

impl From<char> for ClassItem {
    fn from(c: char) -> Self {
        ClassItem::Char(c)
    }
}

/// A validated set of class members, optionally negated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    items: Vec<ClassItem>,
    negated: bool,
}

impl CharClass {
    /// Validate class members
    ///
    /// # Errors
    /// [`BuildError::InvalidRange`] for a range whose start is after its end,
    /// [`BuildError::InvalidClassMember`] for anchors and `.`.
    pub fn new(
        items: impl IntoIterator<Item = ClassItem>,
        negated: bool,
    ) -> Result<Self, BuildError> {
        let items: Vec<_> = items.into_iter().collect();
        for item in &items {
            match *item {
                ClassItem::Range(start, end) if start > end => {
                    return Err(BuildError::InvalidRange(format!(
                        "start {start:?} is after end {end:?}"
                    )));
                }
                ClassItem::Special(special) if !special.in_class() => {
                    return Err(BuildError::InvalidClassMember(special));
                }
                _ => {}
            }
        }
        Ok(CharClass { items, negated })
    }

    /// A non-negated class of single characters
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        CharClass {
            items: chars.into_iter().map(ClassItem::Char).collect(),
            negated: false,
        }
    }

    /// Members as given at construction
    pub fn items(&self) -> &[ClassItem] {
        &self.items
    }

    /// Whether the class matches characters outside its members
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the class has no members
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members of both classes, as one non-negated class
    pub(crate) fn union<'a>(classes: impl IntoIterator<Item = &'a CharClass>) -> CharClass {
        CharClass {
            items: classes
                .into_iter()
                .flat_map(|class| class.items.iter().copied())
                .collect(),
            negated: false,
        }
    }

    /// Sorted character intervals with overlapping and adjacent ones merged
    pub(crate) fn intervals(&self) -> Vec<(char, char)> {
        let mut ranges: Vec<(char, char)> = self
            .items
            .iter()
            .filter_map(|item| match *item {
                ClassItem::Char(c) => Some((c, c)),
                ClassItem::Range(start, end) => Some((start, end)),
                ClassItem::Special(_) => None,
            })
            .collect();
        ranges.sort_unstable();

        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start as u32 <= last.1 as u32 + 1 => {
                    if end > last.1 {
                        last.1 = end;
                    }
                }
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    /// Shorthand members, deduplicated in first-seen order
    pub(crate) fn specials(&self) -> Vec<Special> {
        let mut specials = Vec::new();
        for item in &self.items {
            if let ClassItem::Special(special) = *item {
                if !specials.contains(&special) {
                    specials.push(special);
                }
            }
        }
        specials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_range() {
        let err = CharClass::new([ClassItem::Range('9', '0')], false).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRange(_)));
    }

    #[test]
    fn test_rejects_anchor_member() {
        let err = CharClass::new([ClassItem::Special(Special::WordBoundary)], false).unwrap_err();
        assert_eq!(err, BuildError::InvalidClassMember(Special::WordBoundary));
        assert!(CharClass::new([ClassItem::Special(Special::AnyChar)], true).is_err());
    }

    #[test]
    fn test_intervals_merge_overlap_and_adjacency() {
        let class = CharClass::new(
            [
                ClassItem::Range('m', 'z'),
                ClassItem::Char('b'),
                ClassItem::Range('a', 'c'),
                ClassItem::Char('d'),
                ClassItem::Range('x', 'z'),
            ],
            false,
        )
        .unwrap();
        assert_eq!(class.intervals(), vec![('a', 'd'), ('m', 'z')]);
    }

    #[test]
    fn test_specials_deduplicated() {
        let class = CharClass::new(
            [
                ClassItem::Special(Special::Digit),
                ClassItem::Char('x'),
                ClassItem::Special(Special::Digit),
                ClassItem::Special(Special::Whitespace),
            ],
            false,
        )
        .unwrap();
        assert_eq!(class.specials(), vec![Special::Digit, Special::Whitespace]);
    }

    #[test]
    fn test_union_keeps_all_members() {
        let lower = CharClass::new([ClassItem::Range('a', 'z')], false).unwrap();
        let digits = CharClass::new([ClassItem::Range('0', '9')], false).unwrap();
        let union = CharClass::union([&lower, &digits]);
        assert!(!union.is_negated());
        assert_eq!(union.intervals(), vec![('0', '9'), ('a', 'z')]);
    }
}
