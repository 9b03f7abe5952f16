//! Grammar model
//!
//! The minimal view of a context-free grammar the tester needs: symbols,
//! productions, and the error-recovery flag. Grammar analysis lives
//! upstream; this is read-only input.

use stacklang_ir::{Nonterminal, Terminal};

/// One grammar symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(Nonterminal),
}

impl Symbol {
    pub fn t(name: &str) -> Symbol {
        Symbol::Terminal(name.to_string())
    }

    pub fn nt(name: &str) -> Symbol {
        Symbol::Nonterminal(name.to_string())
    }
}

/// One production rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Nonterminal,
    pub rhs: Vec<Symbol>,
}

/// A context-free grammar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grammar {
    pub productions: Vec<Production>,
    /// True when the grammar uses the error-recovery token. The
    /// differential tester skips such grammars.
    pub uses_error_token: bool,
}

impl Grammar {
    /// The productions whose left-hand side is `nt`.
    pub fn productions_of<'a>(&'a self, nt: &'a str) -> impl Iterator<Item = &'a Production> {
        self.productions.iter().filter(move |p| p.lhs == nt)
    }
}
