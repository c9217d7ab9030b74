//! Scoped inline flags, emitted as `(?ai-m:...)`

use std::collections::BTreeSet;
use std::fmt;

use crate::error::BuildError;

/// An inline engine flag
///
/// Variants are declared in the order their letters sort, so a
/// `BTreeSet<InlineFlag>` iterates in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InlineFlag {
    /// `L`: locale-dependent matching
    Locale,
    /// `a`: ASCII-only character classes
    Ascii,
    /// `i`: case-insensitive matching
    IgnoreCase,
    /// `m`: `^` and `$` match at line boundaries
    Multiline,
    /// `s`: `.` matches newlines
    DotAll,
    /// `u`: Unicode character classes
    Unicode,
    /// `x`: whitespace and `#` comments in the pattern are ignored
    Verbose,
}

impl InlineFlag {
    /// The letter used for this flag in inline flag groups
    pub fn letter(self) -> char {
        match self {
            InlineFlag::Locale => 'L',
            InlineFlag::Ascii => 'a',
            InlineFlag::IgnoreCase => 'i',
            InlineFlag::Multiline => 'm',
            InlineFlag::DotAll => 's',
            InlineFlag::Unicode => 'u',
            InlineFlag::Verbose => 'x',
        }
    }

    /// Parse a flag from its inline letter
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(InlineFlag::Locale),
            'a' => Some(InlineFlag::Ascii),
            'i' => Some(InlineFlag::IgnoreCase),
            'm' => Some(InlineFlag::Multiline),
            's' => Some(InlineFlag::DotAll),
            'u' => Some(InlineFlag::Unicode),
            'x' => Some(InlineFlag::Verbose),
            _ => None,
        }
    }

    /// Charset flags select one of several mutually exclusive modes, so one
    /// of them is always in effect and none can be switched off.
    fn is_charset(self) -> bool {
        matches!(
            self,
            InlineFlag::Ascii | InlineFlag::Locale | InlineFlag::Unicode
        )
    }
}

/// Flags switched on and off for one scoped group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineFlags {
    enabled: BTreeSet<InlineFlag>,
    disabled: BTreeSet<InlineFlag>,
}

impl InlineFlags {
    /// Validate a flag combination
    ///
    /// A flag that is both enabled and disabled cancels out.
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidFlags`] when a charset flag is disabled or
    /// when more than one charset flag is enabled.
    pub fn new(
        enabled: impl IntoIterator<Item = InlineFlag>,
        disabled: impl IntoIterator<Item = InlineFlag>,
    ) -> Result<Self, BuildError> {
        let mut enabled: BTreeSet<_> = enabled.into_iter().collect();
        let mut disabled: BTreeSet<_> = disabled.into_iter().collect();

        let negated_charsets: Vec<_> = disabled.iter().filter(|f| f.is_charset()).collect();
        if !negated_charsets.is_empty() {
            return Err(BuildError::InvalidFlags(format!(
                "can't disable {negated_charsets:?}; one charset flag is always in effect"
            )));
        }

        let charsets: Vec<_> = enabled.iter().filter(|f| f.is_charset()).collect();
        if charsets.len() > 1 {
            return Err(BuildError::InvalidFlags(format!(
                "{charsets:?} are mutually exclusive"
            )));
        }

        let overlap: Vec<_> = enabled.intersection(&disabled).copied().collect();
        for flag in overlap {
            enabled.remove(&flag);
            disabled.remove(&flag);
        }

        Ok(InlineFlags { enabled, disabled })
    }

    /// Combine with further flags, validating the union
    pub fn merge(
        &self,
        enabled: impl IntoIterator<Item = InlineFlag>,
        disabled: impl IntoIterator<Item = InlineFlag>,
    ) -> Result<Self, BuildError> {
        InlineFlags::new(
            self.enabled.iter().copied().chain(enabled),
            self.disabled.iter().copied().chain(disabled),
        )
    }

    /// Flags switched on, in letter order
    pub fn enabled(&self) -> impl Iterator<Item = InlineFlag> + '_ {
        self.enabled.iter().copied()
    }

    /// Flags switched off, in letter order
    pub fn disabled(&self) -> impl Iterator<Item = InlineFlag> + '_ {
        self.disabled.iter().copied()
    }

    /// Whether the group changes no flag at all
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.disabled.is_empty()
    }

    /// The effect on verbose mode: `Some(true)` if switched on, `Some(false)`
    /// if switched off, `None` if inherited
    pub(crate) fn verbose(&self) -> Option<bool> {
        if self.enabled.contains(&InlineFlag::Verbose) {
            Some(true)
        } else if self.disabled.contains(&InlineFlag::Verbose) {
            Some(false)
        } else {
            None
        }
    }
}

impl fmt::Display for InlineFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.enabled {
            write!(f, "{}", flag.letter())?;
        }
        if !self.disabled.is_empty() {
            f.write_str("-")?;
            for flag in &self.disabled {
                write!(f, "{}", flag.letter())?;
            }
        }
        Ok(())
    }
}
