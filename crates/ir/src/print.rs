//! Textual form of StackLang programs
//!
//! Used by the dump setting and by test diagnostics. The format is stable
//! and line-oriented; it is not meant to be parsed back.

use crate::ir::{Block, Cell, Pattern, Primitive, Program, TokenPat, TypedBlock, Value};
use crate::subst::Bindings;
use std::fmt;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tag(t) => write!(f, "#{t}"),
            Value::Reg(r) => write!(f, "{r}"),
            Value::Unit => write!(f, "()"),
            Value::Tuple(vs) => {
                write!(f, "(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Reg(r) => write!(f, "{r}"),
            Pattern::Tuple(ps) => {
                write!(f, "(")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)?;
        if self.holds_state {
            write!(f, "+state")?;
        }
        if self.holds_semv {
            write!(f, "+semv")?;
        }
        Ok(())
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (r, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r} = {v}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Primitive::Field { value, field } => write!(f, "{value}.{field}"),
            Primitive::DummyPos => write!(f, "dummypos"),
            Primitive::Action { id, bindings } => {
                if bindings.is_empty() {
                    write!(f, "action {id}")
                } else {
                    write!(f, "action {id} [{bindings}]")
                }
            }
            Primitive::Lexer => write!(f, "lexer()"),
        }
    }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "  ")?;
    }
    Ok(())
}

fn fmt_set<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, x) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{x}")?;
    }
    write!(f, "}}")
}

fn fmt_block(f: &mut fmt::Formatter<'_>, b: &Block, depth: usize) -> fmt::Result {
    match b {
        Block::Need(rs, k) => {
            indent(f, depth)?;
            write!(f, "need ")?;
            fmt_set(f, rs)?;
            writeln!(f)?;
            fmt_block(f, k, depth)
        }
        Block::Push(v, cell, k) => {
            indent(f, depth)?;
            writeln!(f, "push {v} : {cell}")?;
            fmt_block(f, k, depth)
        }
        Block::Pop(p, k) => {
            indent(f, depth)?;
            writeln!(f, "pop {p}")?;
            fmt_block(f, k, depth)
        }
        Block::Def(bindings, k) => {
            indent(f, depth)?;
            writeln!(f, "def {bindings}")?;
            fmt_block(f, k, depth)
        }
        Block::Prim(r, p, k) => {
            indent(f, depth)?;
            writeln!(f, "{r} = {p}")?;
            fmt_block(f, k, depth)
        }
        Block::Trace(msg, k) => {
            indent(f, depth)?;
            writeln!(f, "trace {msg:?}")?;
            fmt_block(f, k, depth)
        }
        Block::Comment(msg, k) => {
            indent(f, depth)?;
            writeln!(f, "-- {msg}")?;
            fmt_block(f, k, depth)
        }
        Block::Die => {
            indent(f, depth)?;
            writeln!(f, "die")
        }
        Block::Return(v) => {
            indent(f, depth)?;
            writeln!(f, "return {v}")
        }
        Block::Jump(l) => {
            indent(f, depth)?;
            writeln!(f, "jump {l}")
        }
        Block::SubstJump(bindings, l) => {
            indent(f, depth)?;
            writeln!(f, "jump {l} [{bindings}]")
        }
        Block::CaseToken(r, branches, default) => {
            indent(f, depth)?;
            writeln!(f, "case token {r} of")?;
            for br in branches {
                indent(f, depth)?;
                match &br.pat {
                    TokenPat::Single(tok, payload) => writeln!(f, "| {tok} {payload} ->")?,
                    TokenPat::Multiple(toks) => {
                        write!(f, "| ")?;
                        for (i, t) in toks.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{t}")?;
                        }
                        writeln!(f, " ->")?;
                    }
                }
                fmt_block(f, &br.body, depth + 1)?;
            }
            if let Some(d) = default {
                indent(f, depth)?;
                writeln!(f, "| _ ->")?;
                fmt_block(f, d, depth + 1)?;
            }
            Ok(())
        }
        Block::CaseTag(r, branches) => {
            indent(f, depth)?;
            writeln!(f, "case tag {r} of")?;
            for br in branches {
                indent(f, depth)?;
                write!(f, "| ")?;
                for (i, t) in br.tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "#{t}")?;
                }
                writeln!(f, " ->")?;
                fmt_block(f, &br.body, depth + 1)?;
            }
            Ok(())
        }
        Block::Typed(t) => {
            indent(f, depth)?;
            write!(f, "block")?;
            if let Some(name) = &t.name {
                write!(f, " {name}")?;
            }
            write!(f, " needs ")?;
            fmt_set(f, &t.needed_registers)?;
            write!(f, " stack [")?;
            for (i, c) in t.stack_type.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "]")?;
            if let Some(ft) = &t.final_type {
                write!(f, " final {ft}")?;
            }
            if t.has_case_tag {
                write!(f, " casetag")?;
            }
            writeln!(f, " {{")?;
            fmt_block(f, &t.block, depth + 1)?;
            indent(f, depth)?;
            writeln!(f, "}}")
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_block(f, self, 0)
    }
}

impl fmt::Display for TypedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_block(f, &Block::Typed(Box::new(self.clone())), 0)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (nt, label) in &self.entry {
            writeln!(f, "entry {nt} -> {label}")?;
        }
        for (label, t) in &self.cfg {
            writeln!(f, "{label}:")?;
            fmt_block(f, &Block::Typed(Box::new(t.clone())), 1)?;
        }
        Ok(())
    }
}
