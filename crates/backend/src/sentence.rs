//! Sentence counting and unranking
//!
//! The sampler needs the set of sentences a nonterminal derives at each
//! exact length, without ever materializing it: a count (sentences are
//! counted as big integers, the sets explode quickly) and an unranking
//! function mapping an index below the count to the corresponding
//! sentence. Counts are memoized per (nonterminal, length).
//!
//! Counting follows derivations. The grammars seen here are LR(1) and
//! therefore non-cyclic, so the recursion is well-founded; a cyclic
//! grammar would re-enter an in-progress count, which is answered with
//! zero rather than divergence.

use crate::grammar::{Grammar, Production, Symbol};
use num_bigint::BigUint;
use std::collections::{HashMap, HashSet};

pub struct SentenceCounter<'g> {
    grammar: &'g Grammar,
    memo: HashMap<(String, usize), BigUint>,
    in_progress: HashSet<(String, usize)>,
}

impl<'g> SentenceCounter<'g> {
    pub fn new(grammar: &'g Grammar) -> SentenceCounter<'g> {
        SentenceCounter {
            grammar,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// The number of sentences of exactly `size` terminals derivable
    /// from `nt`.
    pub fn count(&mut self, nt: &str, size: usize) -> BigUint {
        let key = (nt.to_string(), size);
        if let Some(c) = self.memo.get(&key) {
            return c.clone();
        }
        if !self.in_progress.insert(key.clone()) {
            return BigUint::ZERO;
        }
        let productions: Vec<&Production> = self.grammar.productions_of(nt).collect();
        let mut total = BigUint::ZERO;
        for p in productions {
            total += self.count_seq(&p.rhs, size);
        }
        self.in_progress.remove(&key);
        self.memo.insert(key, total.clone());
        total
    }

    fn count_seq(&mut self, rhs: &[Symbol], size: usize) -> BigUint {
        match rhs.split_first() {
            None => {
                if size == 0 {
                    BigUint::from(1u32)
                } else {
                    BigUint::ZERO
                }
            }
            Some((Symbol::Terminal(_), rest)) => {
                if size == 0 {
                    BigUint::ZERO
                } else {
                    self.count_seq(rest, size - 1)
                }
            }
            Some((Symbol::Nonterminal(nt), rest)) => {
                let nt = nt.clone();
                let mut total = BigUint::ZERO;
                for k in 0..=size {
                    let head = self.count(&nt, k);
                    if head != BigUint::ZERO {
                        total += head * self.count_seq(rest, size - k);
                    }
                }
                total
            }
        }
    }

    /// The sentence of `nt` at `index` among those of exactly `size`
    /// terminals, in the enumeration order induced by the production
    /// list.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `count(nt, size)`.
    pub fn sentence(&mut self, nt: &str, size: usize, index: &BigUint) -> Vec<String> {
        let mut index = index.clone();
        let productions: Vec<Production> = self.grammar.productions_of(nt).cloned().collect();
        for p in &productions {
            let c = self.count_seq(&p.rhs, size);
            if index < c {
                let mut out = Vec::new();
                self.unrank_seq(&p.rhs, size, index, &mut out);
                return out;
            }
            index -= c;
        }
        panic!("sentence index out of range for {nt} at size {size}");
    }

    fn unrank_seq(&mut self, rhs: &[Symbol], size: usize, mut index: BigUint, out: &mut Vec<String>) {
        match rhs.split_first() {
            None => {
                debug_assert_eq!(size, 0);
                debug_assert_eq!(index, BigUint::ZERO);
            }
            Some((Symbol::Terminal(t), rest)) => {
                out.push(t.clone());
                self.unrank_seq(rest, size - 1, index, out);
            }
            Some((Symbol::Nonterminal(nt), rest)) => {
                let nt = nt.clone();
                for k in 0..=size {
                    let head = self.count(&nt, k);
                    if head == BigUint::ZERO {
                        continue;
                    }
                    let tail = self.count_seq(rest, size - k);
                    let block = head * &tail;
                    if index < block {
                        // Pairs are ordered head-major within the block.
                        let head_index = &index / &tail;
                        let tail_index = index % tail;
                        let mut head_out = self.sentence(&nt, k, &head_index);
                        out.append(&mut head_out);
                        self.unrank_seq(rest, size - k, tail_index, out);
                        return;
                    }
                    index -= block;
                }
                panic!("sentence index out of range in sequence");
            }
        }
    }
}
