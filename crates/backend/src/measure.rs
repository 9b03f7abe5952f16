//! Instruction counts
//!
//! A single observational walk over a program, counting each instruction
//! kind. The driver reports push counts before and after each pass; the
//! full table is printed (or rendered as JSON) under the dump setting.

use serde::Serialize;
use stacklang_ir::{Block, Program};
use std::fmt;

/// Per-kind instruction counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Measure {
    pub need: usize,
    pub push: usize,
    pub pop: usize,
    pub def: usize,
    pub prim: usize,
    pub trace: usize,
    pub comment: usize,
    pub die: usize,
    #[serde(rename = "return")]
    pub ret: usize,
    pub jump: usize,
    pub case_token: usize,
    pub case_tag: usize,
    pub typed: usize,
}

impl Measure {
    /// Count every instruction in a program.
    pub fn program(p: &Program) -> Measure {
        let mut m = Measure::default();
        for t in p.cfg.values() {
            m.typed += 1;
            m.block(&t.block);
        }
        m
    }

    fn block(&mut self, b: &Block) {
        match b {
            Block::Need(..) => self.need += 1,
            Block::Push(..) => self.push += 1,
            Block::Pop(..) => self.pop += 1,
            Block::Def(..) => self.def += 1,
            Block::Prim(..) => self.prim += 1,
            Block::Trace(..) => self.trace += 1,
            Block::Comment(..) => self.comment += 1,
            Block::Die => self.die += 1,
            Block::Return(_) => self.ret += 1,
            Block::Jump(_) | Block::SubstJump(..) => self.jump += 1,
            Block::CaseToken(..) => self.case_token += 1,
            Block::CaseTag(..) => self.case_tag += 1,
            Block::Typed(_) => self.typed += 1,
        }
        b.iter(&mut |k| self.block(k));
    }

    pub fn total(&self) -> usize {
        self.need
            + self.push
            + self.pop
            + self.def
            + self.prim
            + self.trace
            + self.comment
            + self.die
            + self.ret
            + self.jump
            + self.case_token
            + self.case_tag
            + self.typed
    }

    /// Render as JSON, for machine-readable reports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("need", self.need),
            ("push", self.push),
            ("pop", self.pop),
            ("def", self.def),
            ("prim", self.prim),
            ("trace", self.trace),
            ("comment", self.comment),
            ("die", self.die),
            ("return", self.ret),
            ("jump", self.jump),
            ("case token", self.case_token),
            ("case tag", self.case_tag),
            ("typed block", self.typed),
        ];
        for (name, count) in rows {
            writeln!(f, "{name:<12} {count:>8}")?;
        }
        writeln!(f, "{:<12} {:>8}", "total", self.total())
    }
}
