//! Reference LR(1) interpreter
//!
//! Drives the automaton tables directly on a sentence, with an explicit
//! state stack. This is the oracle the differential tester compares the
//! StackLang interpreter against: the two must agree on every sentence.

use crate::automaton::{Decision, Lr1Automaton, Outcome};
use stacklang_ir::{Tag, Terminal};
use tracing::trace;

/// Run the automaton on a sentence, starting from an entry symbol.
///
/// # Panics
///
/// Panics if `entry` is not an entry symbol of the automaton.
pub fn run(automaton: &Lr1Automaton, entry: &str, sentence: &[Terminal]) -> Outcome {
    let start = *automaton
        .entries
        .get(entry)
        .unwrap_or_else(|| panic!("unknown entry symbol {entry}"));
    let mut stack: Vec<Tag> = Vec::new();
    let mut current = start;
    let mut pos = 0;

    loop {
        let state = &automaton.states[current];
        let decision = match state.default {
            Some(d) => d,
            None => {
                // No default: the machine must look at a token.
                let Some(tok) = sentence.get(pos) else {
                    return Outcome::Overshoot;
                };
                match state.actions.get(tok) {
                    Some(d) => *d,
                    None => return Outcome::Rejected,
                }
            }
        };
        trace!(state = current, pos, ?decision, "reference step");
        match decision {
            Decision::Shift(target) => {
                stack.push(current);
                current = target;
                pos += 1;
            }
            Decision::Reduce(prod) => {
                let reduction = &automaton.reductions[prod];
                // Popping n cells exposes the state the rhs started in;
                // the current state counts as the topmost cell.
                let mut exposed = current;
                for _ in 0..reduction.rhs_len {
                    exposed = match stack.pop() {
                        Some(s) => s,
                        None => return Outcome::Rejected,
                    };
                }
                match automaton.states[exposed].gotos.get(&reduction.lhs) {
                    Some(target) => {
                        stack.push(exposed);
                        current = *target;
                    }
                    None => return Outcome::Rejected,
                }
            }
            Decision::Accept => return Outcome::Accepted,
        }
    }
}
