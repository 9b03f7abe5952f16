//! Shared constructors for unit tests.

use stacklang_ir::{Block, Cell, Program, TypedBlock};
use std::collections::BTreeMap;

/// A stack cell for a grammar symbol, carrying state and semantic value.
pub fn cell(symbol: &str) -> Cell {
    Cell::new(symbol, true, true)
}

/// A typed block with the given needed registers and no other contracts.
pub fn tblock(block: Block, needed: &[&str]) -> TypedBlock {
    TypedBlock {
        block,
        stack_type: Vec::new(),
        final_type: None,
        needed_registers: needed.iter().map(|r| r.to_string()).collect(),
        has_case_tag: false,
        name: None,
    }
}

/// A program whose single entry symbol `main` starts at the first label.
pub fn entry_program(blocks: Vec<(&str, TypedBlock)>) -> Program {
    let entry_label = blocks
        .first()
        .expect("at least one block")
        .0
        .to_string();
    Program {
        cfg: blocks
            .into_iter()
            .map(|(l, t)| (l.to_string(), t))
            .collect(),
        entry: [("main".to_string(), entry_label)].into(),
        states: BTreeMap::new(),
    }
}
