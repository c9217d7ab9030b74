//! Regsmith
//!
//! Build regular expressions as trees of typed nodes and compile them into
//! pattern text for a backtracking engine, together with the table that maps
//! group names to engine indices.
//!
//! Backreferences and conditionals point at group nodes rather than at
//! numbers or names, so trees can be combined and groups renamed without
//! breaking references.
//!
//! ```
//! use regsmith::{CompileOptions, Regex, Special};
//!
//! let digit = Regex::special(Special::Digit);
//! let year = digit.times(4).named("year").unwrap();
//! let sep = Regex::one_of("-/").captured();
//! let tree = Regex::concat([
//!     year,
//!     sep.clone(),
//!     digit.times(2),
//!     Regex::backreference(&sep),
//!     digit.times(2),
//! ]);
//!
//! let compiled = tree.compile(&CompileOptions::default()).unwrap();
//! assert_eq!(compiled.pattern(), r"(?P<year>\d{4})([\-/])\d{2}\2\d{2}");
//! assert_eq!(compiled.index_of("year"), Some(1));
//! ```

pub mod ast;
pub mod class;
pub mod compiler;
pub mod emit;
pub mod error;
pub mod flags;
pub mod groups;
pub mod length;
pub mod lower;
pub mod rename;
pub mod repeat;
pub mod resolve;

pub use ast::{Direction, GroupKind, NodeId, NodeKind, Regex, Special, Walk, is_valid_group_name};
pub use class::{CharClass, ClassItem};
pub use compiler::{CompileOptions, CompileReport, CompiledPattern, compile, compile_debug};
pub use emit::escape_literal;
pub use error::{BuildError, CompileError, RegexError, Result};
pub use flags::{InlineFlag, InlineFlags};
pub use groups::{GroupCollector, GroupInfo, GroupRegistry};
pub use length::{LengthAnalyzer, LengthBounds};
pub use lower::{Lowered, Lowering};
pub use rename::{NameMapping, RenameTable, drop_names, rename};
pub use repeat::{Count, RepeatCounts};
pub use resolve::{BackrefResolver, GroupRef, ReferenceStyle, ResolvedRefs};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        let name = Regex::char_range('a', 'z').unwrap().one_or_more();
        let tree = Regex::concat([
            Regex::special(Special::LineStart),
            name.named("user").unwrap(),
            Regex::literal("@"),
            Regex::literal("example.com"),
            Regex::special(Special::LineEnd),
        ]);
        let compiled = compile(&tree, &CompileOptions::default()).unwrap();
        assert_eq!(compiled.pattern(), "^(?P<user>[a-z]+)@example\\.com$");
        assert_eq!(compiled.index_of("user"), Some(1));
    }

    #[test]
    fn test_rename_then_compile() {
        let food = Regex::literal("foo").named("food").unwrap();
        let bar = Regex::literal("bar").named("bar").unwrap();
        let tree = Regex::concat([
            food.clone(),
            Regex::conditional(&food, bar, Regex::concat([])),
        ])
        .named("foobar")
        .unwrap();

        let renamed = tree.rename(&RenameTable::new().rename("bar", "barn")).unwrap();
        let compiled = compile(&renamed, &CompileOptions::default()).unwrap();
        assert_eq!(
            compiled.pattern(),
            "(?P<foobar>(?P<food>foo)(?(food)(?P<barn>bar)|))"
        );

        let dropped = compile(&tree.drop_names(), &CompileOptions::default()).unwrap();
        assert_eq!(dropped.pattern(), "((foo)(?(2)(bar)|))");
        assert!(dropped.group_names().is_empty());
    }
}
