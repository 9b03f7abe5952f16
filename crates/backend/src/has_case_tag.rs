//! `has_case_tag` maintenance
//!
//! Branch elimination can remove every tag dispatch under a typed block,
//! so the flag is recomputed from scratch after the commutation passes.

use stacklang_ir::{Block, Program};

/// Recompute the `has_case_tag` flag of every typed block.
pub fn update(program: Program) -> Program {
    let Program {
        cfg,
        entry,
        states,
    } = program;
    let cfg = cfg
        .into_iter()
        .map(|(label, mut t)| {
            t.block = fix(t.block);
            t.has_case_tag = contains_case_tag(&t.block);
            (label, t)
        })
        .collect();
    Program {
        cfg,
        entry,
        states,
    }
}

fn fix(b: Block) -> Block {
    match b {
        Block::Typed(mut t) => {
            t.block = fix(t.block);
            t.has_case_tag = contains_case_tag(&t.block);
            Block::Typed(t)
        }
        other => other.map(&mut fix),
    }
}

fn contains_case_tag(b: &Block) -> bool {
    if matches!(b, Block::CaseTag(..)) {
        return true;
    }
    let mut found = false;
    b.iter(&mut |k| found = found || contains_case_tag(k));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{entry_program, tblock};
    use stacklang_ir::{TagBranch, case_tag, typed_block};

    #[test]
    fn test_flag_set_and_cleared() {
        let inner = tblock(Block::Die, &[]);
        let outer = tblock(typed_block(inner), &[]);
        let mut with_flag = outer.clone();
        with_flag.has_case_tag = true; // stale
        let p = update(entry_program(vec![("L0", with_flag)]));
        assert!(!p.cfg["L0"].has_case_tag);

        let dispatch = tblock(
            case_tag(
                "s",
                vec![TagBranch {
                    tags: [1].into(),
                    body: Block::Die,
                }],
            ),
            &["s"],
        );
        let p = update(entry_program(vec![("L0", dispatch)]));
        assert!(p.cfg["L0"].has_case_tag);
    }
}
