//! StackLang interpreter
//!
//! Executes a program on a sentence of terminals and reports the
//! pushdown outcome. Host-language primitives are opaque: they evaluate
//! to an opaque runtime value, which is enough because the tester only
//! compares outcomes, never semantic values. The one primitive executed
//! for real is the lexer call, which feeds the sentence in and reports
//! an overshoot when the program demands a token past the end.

use crate::automaton::Outcome;
use stacklang_ir::{Bindings, Block, Pattern, Primitive, Program, Terminal, TokenPat, Value};
use std::collections::HashMap;
use tracing::trace;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RtValue {
    Tag(usize),
    Token(Terminal),
    Tuple(Vec<RtValue>),
    Unit,
    /// Result of an uninterpreted host primitive.
    Opaque,
}

/// What a block hands back to the driver loop.
enum Next {
    Goto(String),
    Finished(Outcome),
}

struct Machine<'p> {
    program: &'p Program,
    regs: HashMap<String, RtValue>,
    stack: Vec<RtValue>,
    input: &'p [Terminal],
    pos: usize,
    trace: bool,
}

/// Run a program on a sentence, starting from an entry symbol.
///
/// # Panics
///
/// Panics if `entry` is not an entry symbol of the program, or if the
/// program is not well-formed (register or stack misuse).
pub fn run(program: &Program, entry: &str, sentence: &[Terminal], trace: bool) -> Outcome {
    let start = program
        .entry
        .get(entry)
        .unwrap_or_else(|| panic!("unknown entry symbol {entry}"));
    let mut m = Machine {
        program,
        regs: HashMap::new(),
        stack: Vec::new(),
        input: sentence,
        pos: 0,
        trace,
    };
    let mut label = start.clone();
    loop {
        let t = &program.cfg[&label];
        if m.trace {
            trace!(%label, stack_depth = m.stack.len(), "enter block");
        }
        match m.exec(&t.block) {
            Next::Goto(next) => label = next,
            Next::Finished(outcome) => return outcome,
        }
    }
}

impl Machine<'_> {
    fn eval(&self, v: &Value) -> RtValue {
        match v {
            Value::Tag(t) => RtValue::Tag(*t),
            Value::Unit => RtValue::Unit,
            Value::Reg(r) => self
                .regs
                .get(r)
                .unwrap_or_else(|| panic!("read of undefined register {r}"))
                .clone(),
            Value::Tuple(vs) => RtValue::Tuple(vs.iter().map(|v| self.eval(v)).collect()),
        }
    }

    fn bind(&mut self, p: &Pattern, v: RtValue) {
        match (p, v) {
            (Pattern::Wildcard, _) => {}
            (Pattern::Reg(r), v) => {
                self.regs.insert(r.clone(), v);
            }
            (Pattern::Tuple(ps), RtValue::Tuple(vs)) if ps.len() == vs.len() => {
                for (p, v) in ps.iter().zip(vs) {
                    self.bind(p, v);
                }
            }
            (p, v) => panic!("cannot match value {v:?} against pattern {p:?}"),
        }
    }

    fn define(&mut self, bindings: &Bindings) {
        // Simultaneous assignment: evaluate first, assign after.
        let values: Vec<(String, RtValue)> = bindings
            .iter()
            .map(|(r, v)| (r.clone(), self.eval(v)))
            .collect();
        for (r, v) in values {
            self.regs.insert(r, v);
        }
    }

    fn prim(&mut self, p: &Primitive) -> Result<RtValue, Outcome> {
        match p {
            Primitive::Lexer => match self.input.get(self.pos) {
                Some(tok) => {
                    self.pos += 1;
                    Ok(RtValue::Token(tok.clone()))
                }
                None => Err(Outcome::Overshoot),
            },
            Primitive::Call { .. }
            | Primitive::Field { .. }
            | Primitive::DummyPos
            | Primitive::Action { .. } => Ok(RtValue::Opaque),
        }
    }

    fn exec(&mut self, b: &Block) -> Next {
        match b {
            Block::Need(rs, k) => {
                self.regs.retain(|r, _| rs.contains(r));
                self.exec(k)
            }
            Block::Push(v, _, k) => {
                let v = self.eval(v);
                self.stack.push(v);
                self.exec(k)
            }
            Block::Pop(p, k) => {
                let v = self.stack.pop().expect("pop from empty stack");
                self.bind(p, v);
                self.exec(k)
            }
            Block::Def(bindings, k) => {
                self.define(bindings);
                self.exec(k)
            }
            Block::Prim(r, p, k) => match self.prim(p) {
                Ok(v) => {
                    self.regs.insert(r.clone(), v);
                    self.exec(k)
                }
                Err(outcome) => Next::Finished(outcome),
            },
            Block::Trace(msg, k) => {
                if self.trace {
                    trace!(target: "stacklang", "{msg}");
                }
                self.exec(k)
            }
            Block::Comment(_, k) => self.exec(k),
            Block::Die => Next::Finished(Outcome::Rejected),
            Block::Return(_) => Next::Finished(Outcome::Accepted),
            Block::Jump(l) => Next::Goto(l.clone()),
            Block::SubstJump(bindings, l) => {
                self.define(bindings);
                Next::Goto(l.clone())
            }
            Block::CaseToken(r, branches, default) => {
                let RtValue::Token(tok) = self.eval(&Value::Reg(r.clone())) else {
                    panic!("token dispatch on a non-token in {r}");
                };
                for br in branches {
                    match &br.pat {
                        TokenPat::Single(t, payload) if *t == tok => {
                            self.regs.insert(payload.clone(), RtValue::Token(tok));
                            return self.exec(&br.body);
                        }
                        TokenPat::Multiple(toks) if toks.contains(&tok) => {
                            return self.exec(&br.body);
                        }
                        _ => {}
                    }
                }
                match default {
                    Some(d) => self.exec(d),
                    None => Next::Finished(Outcome::Rejected),
                }
            }
            Block::CaseTag(r, branches) => {
                let RtValue::Tag(tag) = self.eval(&Value::Reg(r.clone())) else {
                    panic!("tag dispatch on a non-tag in {r}");
                };
                for br in branches {
                    if br.tags.contains(&tag) {
                        return self.exec(&br.body);
                    }
                }
                // No transition on this tag.
                Next::Finished(Outcome::Rejected)
            }
            Block::Typed(t) => self.exec(&t.block),
        }
    }
}
