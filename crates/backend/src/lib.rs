//! StackLang backend
//!
//! Analyses and code-improving transformations over StackLang programs,
//! the intermediate representation an LR(1) parser is compiled through.
//! The upstream analyzer hands over a program together with the grammar
//! and automaton views it was built from; this crate checks the program
//! for structural well-formedness and rewrites it through
//! semantics-preserving passes:
//!
//! - unreachable-block removal and splicing of singly-referenced blocks;
//! - tag inlining, which propagates constant state tags so dispatches
//!   can be resolved statically;
//! - push commutation, which moves stack pushes toward their matching
//!   pops and cancels the pairs control flow permits;
//! - dead-branch elimination over tag dispatches.
//!
//! Equivalence is validated by the differential tester, which compares a
//! reference interpreter over the LR(1) tables against the StackLang
//! interpreter on sampled sentences.

pub mod automaton;
pub mod cfg;
pub mod commute;
pub mod dead_branch;
pub mod difftest;
pub mod driver;
pub mod grammar;
pub mod has_case_tag;
pub mod inline;
pub mod interp;
pub mod measure;
pub mod reference;
pub mod sentence;
pub mod settings;
pub mod tag_inline;
pub mod wellformed;

#[cfg(test)]
mod testutil;
#[cfg(test)]
mod testutil_lr;

pub use automaton::{Decision, Lr1Automaton, Outcome, Reduction, State};
pub use difftest::{Mismatch, Summary};
pub use driver::optimize;
pub use grammar::{Grammar, Production, Symbol};
pub use measure::Measure;
pub use sentence::SentenceCounter;
pub use settings::Settings;
pub use wellformed::WellFormedError;
