//! Control-flow graph traversal
//!
//! Blocks reference each other through labels, so the graph is walked by
//! name. In-degrees drive the inliner: entry labels are seeded at degree
//! two so they are never spliced away, and labels absent from the result
//! are unreachable.

use stacklang_ir::{Block, Label, Program};
use std::collections::{BTreeMap, VecDeque};

/// Visit every jump target reachable in `b` without crossing another
/// label.
pub fn successors<'a, F: FnMut(&'a str)>(b: &'a Block, f: &mut F) {
    match b {
        Block::Jump(l) | Block::SubstJump(_, l) => f(l),
        _ => b.iter(&mut |k| successors(k, f)),
    }
}

/// In-degree of every reachable label.
///
/// Entry labels start at degree two. Labels absent from the map are
/// unreachable from every entry.
pub fn in_degree(program: &Program) -> BTreeMap<Label, usize> {
    let mut degree: BTreeMap<Label, usize> = BTreeMap::new();
    let mut queue: VecDeque<&Label> = VecDeque::new();

    for label in program.entry.values() {
        if degree.insert(label.clone(), 2).is_none() {
            queue.push_back(label);
        }
    }

    while let Some(label) = queue.pop_front() {
        let Some(t) = program.cfg.get(label) else {
            continue;
        };
        successors(&t.block, &mut |target| {
            let d = degree.entry(target.to_string()).or_insert(0);
            *d += 1;
            if *d == 1 {
                let (target, _) = program
                    .cfg
                    .get_key_value(target)
                    .expect("jump to missing label");
                queue.push_back(target);
            }
        });
    }

    degree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{entry_program, tblock};
    use stacklang_ir::{Bindings, TagBranch, Value, case_tag, jump, subst_jump};

    #[test]
    fn test_successors_descend_into_branches() {
        let b = case_tag(
            "s",
            vec![
                TagBranch {
                    tags: [1].into(),
                    body: jump("L1"),
                },
                TagBranch {
                    tags: [2].into(),
                    body: subst_jump(Bindings::singleton("x", Value::Tag(2)), "L2"),
                },
            ],
        );
        let mut seen = Vec::new();
        successors(&b, &mut |l| seen.push(l.to_string()));
        assert_eq!(seen, vec!["L1".to_string(), "L2".to_string()]);
    }

    #[test]
    fn test_in_degree_seeds_entries_at_two() {
        let p = entry_program(vec![("L0", tblock(Block::Die, &[]))]);
        let d = in_degree(&p);
        assert_eq!(d.get("L0"), Some(&2));
    }

    #[test]
    fn test_in_degree_counts_edges_and_skips_unreachable() {
        let p = entry_program(vec![
            ("L0", tblock(jump("L1"), &[])),
            ("L1", tblock(jump("L1"), &[])),
            ("L2", tblock(Block::Die, &[])),
        ]);
        let d = in_degree(&p);
        assert_eq!(d.get("L0"), Some(&2));
        // One edge from L0, one self loop.
        assert_eq!(d.get("L1"), Some(&2));
        // L2 is unreachable and absent.
        assert_eq!(d.get("L2"), None);
    }

    #[test]
    fn test_in_degree_single_reference() {
        let p = entry_program(vec![
            ("L0", tblock(jump("L1"), &[])),
            ("L1", tblock(Block::Die, &[])),
        ]);
        let d = in_degree(&p);
        assert_eq!(d.get("L1"), Some(&1));
    }
}
