//! Property tests over generated trees

use proptest::prelude::*;
use regsmith::{CompileOptions, Regex, escape_literal};

fn full_match(pattern: &str, text: &str) -> bool {
    fancy_regex::Regex::new(&format!("^(?:{pattern})$"))
        .unwrap()
        .is_match(text)
        .unwrap()
}

fn compile(tree: &Regex) -> regsmith::CompiledPattern {
    tree.compile(&CompileOptions::default()).unwrap()
}

/// Small trees over a two-letter alphabet, with unnamed capturing groups
fn tree() -> impl Strategy<Value = Regex> {
    let leaf = "[ab]{0,3}".prop_map(Regex::literal);
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Regex::concat),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Regex::alternation),
            inner.clone().prop_map(|r| r.optional()),
            inner.clone().prop_map(|r| r.captured()),
            (inner, 1u32..3).prop_map(|(r, n)| r.times(n)),
        ]
    })
}

proptest! {
    #[test]
    fn literal_matches_itself(text in prop::collection::vec(any::<char>(), 0..16)) {
        let text: String = text.into_iter().collect();
        let compiled = compile(&Regex::literal(text.as_str()));
        prop_assert_eq!(compiled.pattern(), escape_literal(&text));
        prop_assert!(full_match(compiled.pattern(), &text));
    }

    #[test]
    fn literal_escapes_every_metacharacter(text in r"[.+*?()|\[\]{}^$#\&\~\\-]{1,8}") {
        let compiled = compile(&Regex::literal(text.as_str()));
        prop_assert_eq!(compiled.pattern().len(), text.len() * 2);
        prop_assert!(full_match(compiled.pattern(), &text));
    }

    #[test]
    fn concat_is_associative(a in tree(), b in tree(), c in tree(), input in "[ab]{0,6}") {
        let left = Regex::concat([Regex::concat([a.clone(), b.clone()]), c.clone()]);
        let right = Regex::concat([a, Regex::concat([b, c])]);
        let left = compile(&left);
        let right = compile(&right);
        prop_assert_eq!(
            full_match(left.pattern(), &input),
            full_match(right.pattern(), &input)
        );
    }

    #[test]
    fn drop_names_keeps_capture_count(root in tree()) {
        let named = name_groups(&root);
        let before = compile(&named);
        let after = compile(&named.drop_names());
        prop_assert!(after.group_names().is_empty());
        prop_assert!(!after.pattern().contains("(?P<"));
        prop_assert_eq!(before.group_count(), after.group_count());
        prop_assert_eq!(before.groups().len(), after.groups().len());
    }

    #[test]
    fn compiled_groups_are_numbered_in_order(root in tree()) {
        let compiled = compile(&name_groups(&root));
        for (i, group) in compiled.groups().iter().enumerate() {
            prop_assert_eq!(group.index as usize, i + 1);
            let name = group.name.as_deref().unwrap_or_default();
            prop_assert_eq!(compiled.index_of(name), Some(group.index));
        }
    }
}

/// Give every capturing group of `root` a distinct name
fn name_groups(root: &Regex) -> Regex {
    let ids: Vec<_> = root.capture_groups().map(Regex::id).collect();
    let mut counter = 0usize;
    rebuild_named(root, &ids, &mut counter)
}

fn rebuild_named(node: &Regex, ids: &[regsmith::NodeId], counter: &mut usize) -> Regex {
    use regsmith::{GroupKind, NodeKind};

    match node.kind() {
        NodeKind::Group {
            child,
            kind: GroupKind::Capturing { .. },
        } if ids.contains(&node.id()) => {
            let name = format!("g{counter}");
            *counter += 1;
            rebuild_named(child, ids, counter).named(name).unwrap()
        }
        NodeKind::Concat(children) => Regex::concat(
            children
                .iter()
                .map(|c| rebuild_named(c, ids, counter))
                .collect::<Vec<_>>(),
        ),
        NodeKind::Alternation(children) => Regex::alternation(
            children
                .iter()
                .map(|c| rebuild_named(c, ids, counter))
                .collect::<Vec<_>>(),
        ),
        NodeKind::Repetition { child, counts } => {
            rebuild_named(child, ids, counter).repeat(counts.clone())
        }
        _ => node.clone(),
    }
}
