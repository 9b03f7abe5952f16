//! Block inlining
//!
//! Drops unreachable blocks and splices every non-entry block referenced
//! exactly once into its unique jump site. Splicing keeps the typed-block
//! wrapper so downstream passes still see the stack-shape and liveness
//! contracts of the spliced label.

use crate::cfg::in_degree;
use stacklang_ir::{Block, Label, Program, TypedBlock, typed_block};
use std::collections::BTreeMap;
use tracing::debug;

/// Remove unreachable labels and splice singly-referenced ones.
pub fn inline(program: Program) -> Program {
    let degree = in_degree(&program);
    let Program {
        cfg,
        entry,
        states,
    } = program;

    let mut kept: BTreeMap<Label, TypedBlock> = BTreeMap::new();
    let mut spliceable: BTreeMap<Label, TypedBlock> = BTreeMap::new();
    let total = cfg.len();
    for (label, t) in cfg {
        match degree.get(&label) {
            None => {} // unreachable
            Some(1) => {
                spliceable.insert(label, t);
            }
            Some(_) => {
                kept.insert(label, t);
            }
        }
    }
    debug!(
        blocks = total,
        unreachable = total - kept.len() - spliceable.len(),
        spliced = spliceable.len(),
        "inline"
    );

    let cfg = kept
        .into_iter()
        .map(|(label, mut t)| {
            t.block = splice(t.block, &spliceable);
            (label, t)
        })
        .collect();

    Program {
        cfg,
        entry,
        states,
    }
}

/// Rewrite every jump to a spliceable label into a copy of its body,
/// wrapped in the label's typed block. The copy is spliced recursively:
/// a chain of singly-referenced blocks collapses in one pass.
fn splice(b: Block, spliceable: &BTreeMap<Label, TypedBlock>) -> Block {
    match b {
        Block::Jump(l) => match spliceable.get(&l) {
            Some(t) => typed_block(spliced_copy(t, spliceable)),
            None => Block::Jump(l),
        },
        Block::SubstJump(bindings, l) => match spliceable.get(&l) {
            // The jump's bindings become definitions in front of the body.
            Some(t) => bindings.restore_defs(typed_block(spliced_copy(t, spliceable))),
            None => Block::SubstJump(bindings, l),
        },
        other => other.map(&mut |k| splice(k, spliceable)),
    }
}

fn spliced_copy(t: &TypedBlock, spliceable: &BTreeMap<Label, TypedBlock>) -> TypedBlock {
    let mut t = t.clone();
    t.block = splice(t.block, spliceable);
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::in_degree;
    use crate::testutil::{entry_program, tblock};
    use crate::wellformed;
    use stacklang_ir::{Value, jump};

    #[test]
    fn test_degenerate_inline() {
        // L0 jumps to L1, which is referenced once: L1 folds into L0.
        let p = entry_program(vec![
            ("L0", tblock(jump("L1"), &["r"])),
            ("L1", tblock(Block::Return(Value::reg("r")), &["r"])),
        ]);
        let p = inline(p);
        assert_eq!(p.cfg.len(), 1);
        assert!(p.cfg.contains_key("L0"));
        let body = &p.cfg["L0"].block;
        match body {
            Block::Typed(t) => assert_eq!(t.block, Block::Return(Value::reg("r"))),
            other => panic!("expected a spliced typed block, got {other:?}"),
        }
        assert!(wellformed::check(&p).is_ok());
    }

    #[test]
    fn test_unreachable_blocks_dropped() {
        let p = entry_program(vec![
            ("L0", tblock(Block::Die, &[])),
            ("orphan", tblock(Block::Die, &[])),
        ]);
        let p = inline(p);
        assert!(!p.cfg.contains_key("orphan"));
    }

    #[test]
    fn test_doubly_referenced_blocks_survive() {
        let p = entry_program(vec![
            ("L0", tblock(jump("L2"), &[])),
            ("L1", tblock(jump("L2"), &[])),
            ("L2", tblock(Block::Die, &[])),
        ]);
        // Make L1 reachable through a second entry.
        let mut p = p;
        p.entry.insert("aux".to_string(), "L1".to_string());
        let p = inline(p);
        assert!(p.cfg.contains_key("L2"));
        assert_eq!(p.cfg["L0"].block, jump("L2"));
    }

    #[test]
    fn test_chain_collapses_in_one_pass() {
        let p = entry_program(vec![
            ("L0", tblock(jump("L1"), &[])),
            ("L1", tblock(jump("L2"), &[])),
            ("L2", tblock(Block::Die, &[])),
        ]);
        let p = inline(p);
        assert_eq!(p.cfg.len(), 1);
        // Entries are never spliced, and every retained label is back to
        // degree >= 2 territory (here: the entry seed).
        let d = in_degree(&p);
        assert_eq!(d.get("L0"), Some(&2));
    }

    #[test]
    fn test_entry_labels_never_spliced() {
        let mut p = entry_program(vec![
            ("L0", tblock(jump("L1"), &[])),
            ("L1", tblock(Block::Die, &[])),
        ]);
        p.entry.insert("second".to_string(), "L1".to_string());
        let p = inline(p);
        assert!(p.cfg.contains_key("L1"));
        assert_eq!(p.cfg["L0"].block, jump("L1"));
    }
}
