//! StackLang intermediate representation
//!
//! StackLang is a small, explicit low-level language for deterministic
//! pushdown automata. An LR(1) parser is expressed as a control-flow graph
//! of blocks that push and pop stack cells, bind registers, dispatch on
//! tokens and state tags, and invoke opaque host-language primitives.
//!
//! This crate provides the IR itself: instructions, values, patterns,
//! typed blocks and programs, together with the substitution machinery and
//! the fresh-name generator that the analyses and transformations in
//! `stacklang-backend` are built on.

pub mod fresh;
pub mod ir;
pub mod print;
pub mod regs;
pub mod subst;

pub use ir::{
    Block, Cell, Label, Nonterminal, Pattern, Primitive, Program, Register, RegisterSet, StateInfo,
    Tag, TagBranch, Terminal, TokenBranch, TokenPat, TypedBlock, Value, case_tag, case_token,
    comment, def, defs, jump, need, pop, prim, push, subst_jump, trace, typed_block,
};
pub use regs::intersection;
pub use subst::Bindings;
