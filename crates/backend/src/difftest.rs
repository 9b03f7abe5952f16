//! Differential testing
//!
//! Validates a StackLang program against the reference LR(1) interpreter
//! on sampled sentences. For each entry symbol, sentences are drawn per
//! exact length: every sentence when a length has at most a hundred of
//! them, a hundred distinct uniform indices otherwise, never
//! materializing the full set. The first outcome mismatch aborts the
//! test with the sentence and both outcomes.
//!
//! Grammars that use the error-recovery token are skipped; the recovery
//! protocol is not modeled by either interpreter.

use crate::automaton::{Lr1Automaton, Outcome};
use crate::grammar::Grammar;
use crate::interp;
use crate::reference;
use crate::sentence::SentenceCounter;
use num_bigint::{BigUint, RandBigInt};
use rand::Rng;
use stacklang_ir::{Program, Terminal};
use std::collections::BTreeSet;
use tracing::info;

/// Largest sentence length sampled. A grammar whose shortest sentence is
/// longer is silently not tested.
pub const SIZE_THRESHOLD: usize = 100;

/// Sentences tested per length.
pub const PER_SIZE_CAP: u64 = 100;

/// Sentences tested per entry symbol.
pub const GLOBAL_CAP: usize = 1000;

/// A sentence on which the two interpreters disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub entry: String,
    pub sentence: Vec<Terminal>,
    pub reference: Outcome,
    pub stacklang: Outcome,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sentence = if self.sentence.is_empty() {
            "(empty)".to_string()
        } else {
            self.sentence.join(" ")
        };
        write!(
            f,
            "entry {}: sentence \"{}\": reference {}, stacklang {}",
            self.entry, sentence, self.reference, self.stacklang
        )
    }
}

impl std::error::Error for Mismatch {}

/// How a test run ended, short of a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    /// The grammar uses the error token; nothing was tested.
    Skipped,
    /// This many sentences were tested, all in agreement.
    Tested(usize),
}

/// Compare the program against the reference interpreter on sampled
/// sentences of every entry symbol.
pub fn run(
    program: &Program,
    automaton: &Lr1Automaton,
    grammar: &Grammar,
    trace: bool,
    rng: &mut impl Rng,
) -> Result<Summary, Mismatch> {
    if grammar.uses_error_token {
        info!("differential test skipped: grammar uses the error token");
        return Ok(Summary::Skipped);
    }

    let mut total = 0usize;
    for nt in program.entry.keys() {
        let mut counter = SentenceCounter::new(grammar);
        let mut tested = 0usize;
        'sizes: for size in 0..=SIZE_THRESHOLD {
            if tested >= GLOBAL_CAP {
                break;
            }
            let n = counter.count(nt, size);
            if n == BigUint::ZERO {
                continue;
            }
            let small = u64::try_from(&n).ok().filter(|v| *v <= PER_SIZE_CAP);
            match small {
                Some(count) => {
                    for i in 0..count {
                        if tested >= GLOBAL_CAP {
                            break 'sizes;
                        }
                        check(program, automaton, &mut counter, nt, size, &BigUint::from(i), trace)?;
                        tested += 1;
                    }
                }
                None => {
                    // Uniform sample of distinct indices, without the set.
                    let mut drawn: BTreeSet<BigUint> = BTreeSet::new();
                    while (drawn.len() as u64) < PER_SIZE_CAP {
                        drawn.insert(rng.gen_biguint_below(&n));
                    }
                    for index in drawn {
                        if tested >= GLOBAL_CAP {
                            break 'sizes;
                        }
                        check(program, automaton, &mut counter, nt, size, &index, trace)?;
                        tested += 1;
                    }
                }
            }
        }
        total += tested;
    }
    info!(sentences = total, "differential test passed");
    Ok(Summary::Tested(total))
}

fn check(
    program: &Program,
    automaton: &Lr1Automaton,
    counter: &mut SentenceCounter<'_>,
    nt: &str,
    size: usize,
    index: &BigUint,
    trace: bool,
) -> Result<(), Mismatch> {
    let sentence = counter.sentence(nt, size, index);
    let expected = reference::run(automaton, nt, &sentence);
    let actual = interp::run(program, nt, &sentence, trace);
    if expected == actual {
        Ok(())
    } else {
        Err(Mismatch {
            entry: nt.to_string(),
            sentence,
            reference: expected,
            stacklang: actual,
        })
    }
}
