//! LR(1) automaton model
//!
//! The table view of the automaton the reference interpreter drives:
//! per-state decisions on a lookahead terminal, default decisions taken
//! without demanding a lookahead, and nonterminal transitions. Automaton
//! construction lives upstream; this is read-only input.

use stacklang_ir::{Nonterminal, Tag, Terminal};
use std::collections::BTreeMap;

/// What the machine does in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Consume the lookahead and enter a state.
    Shift(Tag),
    /// Reduce by a production, by index.
    Reduce(usize),
    /// Accept the input read so far.
    Accept,
}

/// One automaton state.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Lookahead-dependent decisions. Shift decisions consume the token.
    pub actions: BTreeMap<Terminal, Decision>,
    /// A decision taken without demanding a lookahead. When present,
    /// `actions` is not consulted.
    pub default: Option<Decision>,
    /// Nonterminal transitions taken after a reduction.
    pub gotos: BTreeMap<Nonterminal, Tag>,
}

/// A reduction: pop `rhs_len` cells, then take the goto transition of
/// the exposed state on `lhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub lhs: Nonterminal,
    pub rhs_len: usize,
}

/// The LR(1) automaton, as tables.
#[derive(Debug, Clone, Default)]
pub struct Lr1Automaton {
    /// Start state of each entry symbol.
    pub entries: BTreeMap<Nonterminal, Tag>,
    /// States indexed by tag.
    pub states: Vec<State>,
    /// Reductions indexed by production.
    pub reductions: Vec<Reduction>,
}

/// What a pushdown interpreter run yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The sentence was accepted.
    Accepted,
    /// The machine hit an error action or a missing transition.
    Rejected,
    /// The machine demanded a token past the end of the sentence.
    Overshoot,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Accepted => write!(f, "accepted"),
            Outcome::Rejected => write!(f, "rejected"),
            Outcome::Overshoot => write!(f, "overshoot"),
        }
    }
}
