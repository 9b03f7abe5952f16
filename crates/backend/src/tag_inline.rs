//! Tag inlining
//!
//! A definition binding a register to a constant state tag is absorbed
//! into a substitution and carried forward instead of being emitted, so a
//! later dispatch on that register can be resolved statically. The
//! substitution is restored lazily: tightly at jumps (only the rules the
//! target needs), and in full in front of any block that dispatches on a
//! tag. Tag-valued definitions are single-assignment along any
//! control-flow path, which is what makes the forward carry sound.

use stacklang_ir::{
    Bindings, Block, Label, Pattern, Program, RegisterSet, TokenPat, Value, defs, subst_jump,
    typed_block,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Propagate constant tags through every block of a program.
pub fn tag_inline(program: Program) -> Program {
    let needed: BTreeMap<Label, RegisterSet> = program
        .cfg
        .iter()
        .map(|(l, t)| (l.clone(), t.needed_registers.clone()))
        .collect();

    let Program {
        cfg,
        entry,
        states,
    } = program;
    let cfg = cfg
        .into_iter()
        .map(|(label, mut t)| {
            t.block = walk(t.block, Bindings::empty(), &needed);
            (label, t)
        })
        .collect();
    debug!("tag_inline");

    Program {
        cfg,
        entry,
        states,
    }
}

fn is_tag(v: &Value) -> bool {
    matches!(v, Value::Tag(_))
}

fn walk(b: Block, mut s: Bindings, needed: &BTreeMap<Label, RegisterSet>) -> Block {
    match b {
        Block::Def(bindings, k) => {
            // Classify after substituting: a rule whose right-hand side
            // becomes a constant tag is absorbed, the rest is re-emitted.
            let mut absorbed = Vec::new();
            let mut emitted = Bindings::empty();
            for (r, v) in bindings.iter() {
                let v = s.apply(v);
                if is_tag(&v) {
                    absorbed.push((r.clone(), v));
                } else {
                    emitted.add(r.clone(), v);
                }
            }
            for r in emitted.domain() {
                s.remove(&Pattern::Reg(r));
            }
            for (r, v) in absorbed {
                s.add(r, v);
            }
            defs(emitted, walk(*k, s, needed))
        }
        Block::Push(v, cell, k) => Block::Push(s.apply(&v), cell, Box::new(walk(*k, s, needed))),
        Block::Prim(r, p, k) => {
            let p = p.apply(&s);
            s.remove(&Pattern::Reg(r.clone()));
            Block::Prim(r, p, Box::new(walk(*k, s, needed)))
        }
        Block::Pop(p, k) => {
            s.remove(&p);
            Block::Pop(p, Box::new(walk(*k, s, needed)))
        }
        Block::Need(rs, k) => {
            // Rules for registers that are no longer live are dropped;
            // registers whose definition was absorbed are no longer
            // defined here, so they leave the need set and come back
            // through restoration.
            let s = s.restrict(&rs);
            let rs = rs.difference(&s.domain()).cloned().collect();
            Block::Need(rs, Box::new(walk(*k, s, needed)))
        }
        Block::Return(v) => Block::Return(s.apply(&v)),
        Block::Die => Block::Die,
        Block::Jump(l) => s.tight_restore_defs(&needed[&l], Block::Jump(l)),
        Block::SubstJump(bindings, l) => {
            let mut applied = Bindings::empty();
            for (r, v) in bindings.iter() {
                applied.add(r.clone(), s.apply(v));
            }
            let restore: RegisterSet = needed[&l]
                .difference(&applied.domain())
                .cloned()
                .collect();
            s.tight_restore_defs(&restore, subst_jump(applied, l))
        }
        Block::CaseToken(r, branches, default) => {
            let branches = branches
                .into_iter()
                .map(|mut br| {
                    let mut s = s.clone();
                    if let TokenPat::Single(_, payload) = &br.pat {
                        s.remove(&Pattern::Reg(payload.clone()));
                    }
                    br.body = walk(br.body, s, needed);
                    br
                })
                .collect();
            let default = default.map(|d| Box::new(walk(*d, s, needed)));
            Block::CaseToken(r, branches, default)
        }
        Block::CaseTag(r, branches) => {
            // The dispatch register must be materialized; flush the whole
            // substitution here, as in front of a flagged typed block.
            let branches = branches
                .into_iter()
                .map(|mut br| {
                    br.body = walk(br.body, Bindings::empty(), needed);
                    br
                })
                .collect();
            s.restore_defs(Block::CaseTag(r, branches))
        }
        Block::Typed(t) => {
            let mut t = *t;
            if t.has_case_tag {
                t.block = walk(t.block, Bindings::empty(), needed);
                s.restore_defs(typed_block(t))
            } else {
                let s_inner = s.restrict(&t.needed_registers);
                t.needed_registers = t
                    .needed_registers
                    .difference(&s_inner.domain())
                    .cloned()
                    .collect();
                t.block = walk(t.block, s_inner, needed);
                Block::Typed(Box::new(t))
            }
        }
        other => other.map(&mut |k| walk(k, s.clone(), needed)),
    }
}
