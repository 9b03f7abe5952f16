//! Dead-branch elimination
//!
//! Threads the set of possible state tags downward through tag
//! dispatches. Inside a branch, the dispatched register can only hold a
//! tag from that branch's set; a nested dispatch arm whose set does not
//! meet the possible set can never be taken and is dropped. A pop resets
//! the possible set, because the popped cell may carry any tag.

use stacklang_ir::{Block, Program, Tag, TagBranch};
use std::collections::BTreeSet;
use tracing::debug;

/// Prune unreachable tag-dispatch arms. `None` means every tag is
/// possible.
pub fn eliminate(program: Program) -> Program {
    let Program {
        cfg,
        entry,
        states,
    } = program;
    let cfg = cfg
        .into_iter()
        .map(|(label, mut t)| {
            t.block = walk(t.block, None);
            (label, t)
        })
        .collect();
    debug!("dead_branch");
    Program {
        cfg,
        entry,
        states,
    }
}

fn walk(b: Block, possible: Option<BTreeSet<Tag>>) -> Block {
    match b {
        Block::Pop(p, k) => Block::Pop(p, Box::new(walk(*k, None))),
        Block::CaseTag(r, branches) => {
            let kept: Vec<TagBranch> = branches
                .into_iter()
                .filter_map(|mut br| {
                    let refined: BTreeSet<Tag> = match &possible {
                        None => br.tags.clone(),
                        Some(ps) => br.tags.intersection(ps).cloned().collect(),
                    };
                    if refined.is_empty() {
                        None
                    } else {
                        br.body = walk(br.body, Some(refined));
                        Some(br)
                    }
                })
                .collect();
            if kept.is_empty() {
                // No tag can reach any arm.
                Block::Die
            } else {
                Block::CaseTag(r, kept)
            }
        }
        other => other.map(&mut |k| walk(k, possible.clone())),
    }
}
