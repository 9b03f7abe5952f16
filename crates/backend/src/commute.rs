//! Push commutation
//!
//! An LR parser often pushes a value, runs several instructions that do
//! not inspect that cell, then pops it back into a pattern. Moving the
//! push downward lets it cancel against its matching pop, removing both.
//!
//! The walker carries pending pushes (delayed, not yet emitted), a
//! substitution accumulated from inlined definitions, the known return
//! type and the known stack-cell prefix. Pending pushes are materialized
//! in front of every jump, oldest first, so the newest ends up topmost
//! and the on-stack layout matches the original program. A block in
//! which nothing cancelled and no branch was eliminated is returned
//! untouched, so the pass is idempotent.

use stacklang_ir::{
    Bindings, Block, Cell, Label, Pattern, Program, RegisterSet, StateInfo, Tag, TagBranch,
    TokenBranch, TokenPat, Value, comment, fresh, intersection, subst_jump,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Progress counters for one run of the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommuteStats {
    pub cancelled_pops: usize,
    pub eliminated_branches: usize,
}

/// A push delayed by the pass, pending cancellation or restoration.
#[derive(Debug, Clone)]
struct PendingPush {
    value: Value,
    cell: Cell,
    id: usize,
}

/// Walker state, cloned at every branch point.
#[derive(Debug, Clone)]
struct Flow {
    /// Pending pushes, oldest first, newest at the end.
    pushes: Vec<PendingPush>,
    bindings: Bindings,
    final_type: Option<String>,
    /// Known stack cells, deepest first, top of stack at the end.
    known_cells: Vec<Cell>,
}

impl Flow {
    fn push_registers(&self) -> RegisterSet {
        let mut rs = RegisterSet::new();
        for p in &self.pushes {
            rs.extend(p.value.registers());
        }
        rs
    }
}

/// Commute pushes toward their pops in every block of a program.
pub fn commute(program: Program) -> Program {
    commute_with_stats(program).0
}

pub fn commute_with_stats(program: Program) -> (Program, CommuteStats) {
    fresh::reset();
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

    let mut cx = Commuter {
        needed: &needed,
        states: &states,
        stats: CommuteStats::default(),
    };
    let cfg = cfg
        .into_iter()
        .map(|(label, mut t)| {
            let flow = Flow {
                pushes: Vec::new(),
                bindings: Bindings::empty(),
                final_type: t.final_type.clone(),
                known_cells: t.stack_type.clone(),
            };
            let before = cx.stats;
            let walked = cx.walk(t.block.clone(), flow);
            if cx.stats != before {
                t.block = walked;
            }
            (label, t)
        })
        .collect();
    debug!(
        cancelled = cx.stats.cancelled_pops,
        eliminated = cx.stats.eliminated_branches,
        "commute"
    );
    let stats = cx.stats;
    (
        Program {
            cfg,
            entry,
            states,
        },
        stats,
    )
}

struct Commuter<'a> {
    needed: &'a BTreeMap<Label, RegisterSet>,
    states: &'a BTreeMap<Tag, StateInfo>,
    stats: CommuteStats,
}

impl Commuter<'_> {
    fn walk(&mut self, b: Block, mut flow: Flow) -> Block {
        match b {
            Block::Need(rs, k) => {
                // The values of pending pushes must stay live, and reads
                // of substituted registers become reads of their images.
                let mut live = RegisterSet::new();
                for x in &rs {
                    live.extend(flow.bindings.apply(&Value::Reg(x.clone())).registers());
                }
                live.extend(flow.push_registers());
                Block::Need(live, Box::new(self.walk(*k, flow)))
            }
            Block::Push(v, cell, k) => {
                let value = flow.bindings.apply(&v);
                let id = fresh::next_id();
                let note = format!("Commuting push_{id} {value}");
                flow.pushes.push(PendingPush { value, cell, id });
                comment(note, self.walk(*k, flow))
            }
            Block::Pop(p, k) => match flow.pushes.pop() {
                Some(push) => {
                    flow.bindings.remove(&p);
                    flow.bindings.remove_value(&push.value);
                    flow.bindings.extend_pattern(&p, &push.value);
                    self.stats.cancelled_pops += 1;
                    comment(
                        format!("Cancelled push_{} into {}", push.id, p),
                        self.walk(*k, flow),
                    )
                }
                None => {
                    assert!(
                        !flow.known_cells.is_empty(),
                        "pop with no known cell and no pending push"
                    );
                    flow.known_cells.pop();
                    let p = rename_binders(&mut flow, &p);
                    Block::Pop(p, Box::new(self.walk(*k, flow)))
                }
            },
            Block::Def(bindings, k) => {
                let note = format!("Inlining def {bindings}");
                flow.bindings = flow.bindings.compose(&bindings);
                comment(note, self.walk(*k, flow))
            }
            Block::Prim(r, p, k) => {
                let p = p.apply(&flow.bindings);
                flow.bindings.remove(&Pattern::Reg(r.clone()));
                let r = if conflict(&flow, &r) {
                    let fresh_r = fresh::register(&r);
                    flow.bindings.add(r, Value::Reg(fresh_r.clone()));
                    fresh_r
                } else {
                    r
                };
                Block::Prim(r, p, Box::new(self.walk(*k, flow)))
            }
            Block::Die => {
                // Pending pushes can never become observable.
                self.stats.cancelled_pops += flow.pushes.len();
                Block::Die
            }
            Block::Return(v) => {
                self.stats.cancelled_pops += flow.pushes.len();
                Block::Return(flow.bindings.apply(&v))
            }
            Block::Jump(l) => self.restore_at_jump(flow, Bindings::empty(), l),
            Block::SubstJump(bindings, l) => self.restore_at_jump(flow, bindings, l),
            Block::CaseToken(r, branches, default) => {
                let r = dispatch_register(&flow, &r);
                let branches = branches
                    .into_iter()
                    .map(|br| {
                        let mut bflow = flow.clone();
                        let pat = match br.pat {
                            TokenPat::Single(tok, payload) => {
                                let payload =
                                    match rename_binders(&mut bflow, &Pattern::Reg(payload)) {
                                        Pattern::Reg(r) => r,
                                        p => panic!("token payload renamed into {p:?}"),
                                    };
                                TokenPat::Single(tok, payload)
                            }
                            pat @ TokenPat::Multiple(_) => pat,
                        };
                        TokenBranch {
                            pat,
                            body: self.walk(br.body, bflow),
                        }
                    })
                    .collect();
                let default = default.map(|d| Box::new(self.walk(*d, flow.clone())));
                Block::CaseToken(r, branches, default)
            }
            Block::CaseTag(r, branches) => match flow.bindings.apply(&Value::Reg(r)) {
                Value::Tag(t) => {
                    let arms = branches.len();
                    match branches.into_iter().find(|br| br.tags.contains(&t)) {
                        Some(br) => {
                            self.stats.eliminated_branches += arms - 1;
                            comment("Eliminated case tag", self.walk(br.body, flow))
                        }
                        None => {
                            // The machine has no transition on this tag.
                            self.stats.eliminated_branches += arms;
                            Block::Die
                        }
                    }
                }
                Value::Reg(r) => {
                    let branches = branches
                        .into_iter()
                        .map(|br| {
                            let mut bflow = flow.clone();
                            self.refine_branch(&mut bflow, &br.tags, &r);
                            TagBranch {
                                tags: br.tags,
                                body: self.walk(br.body, bflow),
                            }
                        })
                        .collect();
                    Block::CaseTag(r, branches)
                }
                v => panic!("tag dispatch on non-register value {v}"),
            },
            Block::Typed(t) => {
                let mut t = *t;
                // The contract described the stack with the pending
                // pushes materialized; they are not, yet.
                let keep = t.stack_type.len().saturating_sub(flow.pushes.len());
                t.stack_type.truncate(keep);
                let mut live = RegisterSet::new();
                for x in &t.needed_registers {
                    live.extend(flow.bindings.apply(&Value::Reg(x.clone())).registers());
                }
                live.extend(flow.push_registers());
                t.needed_registers = live;
                t.final_type = flow.final_type.clone().or(t.final_type);
                flow.final_type = t.final_type.clone();
                flow.known_cells = longest_known(flow.known_cells, t.stack_type.clone());
                t.block = self.walk(t.block, flow);
                Block::Typed(Box::new(t))
            }
            other => other.map(&mut |k| self.walk(k, flow.clone())),
        }
    }

    fn restore_at_jump(&mut self, flow: Flow, bindings: Bindings, l: Label) -> Block {
        let composed = flow.bindings.compose(&bindings);
        let tight = composed.restrict(&self.needed[&l]);
        restore_pushes(flow.pushes, subst_jump(tight, l))
    }

    /// Refine branch-local knowledge from the possible states of a tag
    /// dispatch arm.
    fn refine_branch(&self, flow: &mut Flow, tags: &BTreeSet<Tag>, r: &str) {
        let mut cells: Option<Vec<Cell>> = None;
        let mut finals: Option<Option<String>> = None;
        for t in tags {
            let info = self.states.get(t).cloned().unwrap_or_default();
            cells = Some(match cells {
                None => info.known_cells,
                Some(acc) => common_suffix(&acc, &info.known_cells),
            });
            finals = Some(match finals {
                None => info.final_type,
                Some(f) if f == info.final_type => f,
                Some(_) => None,
            });
        }
        if let Some(cells) = cells {
            flow.known_cells = longest_known(std::mem::take(&mut flow.known_cells), cells);
        }
        if flow.final_type.is_none()
            && let Some(Some(ft)) = finals
        {
            flow.final_type = Some(ft);
        }
        if tags.len() == 1 {
            let t = *tags.iter().next().expect("singleton tag set");
            let sub = Bindings::singleton(r, Value::Tag(t));
            for p in &mut flow.pushes {
                p.value = sub.apply(&p.value);
            }
        }
    }
}

/// True iff a write to `r` would be observed by a pending push value or
/// by the right-hand side of an accumulated binding.
fn conflict(flow: &Flow, r: &str) -> bool {
    flow.pushes.iter().any(|p| p.value.mentions(r))
        || flow.bindings.codomain_registers().contains(r)
}

/// Rebind the binders of `p`, renaming any binder whose old value is
/// still referenced. Reads of a renamed register are routed through the
/// substitution.
fn rename_binders(flow: &mut Flow, p: &Pattern) -> Pattern {
    flow.bindings.remove(p);
    let mut clashing = RegisterSet::new();
    for push in &flow.pushes {
        clashing.extend(intersection(p, &push.value));
    }
    let codomain = flow.bindings.codomain_registers();
    let mut renames = Bindings::empty();
    for r in p.registers() {
        if clashing.contains(&r) || codomain.contains(&r) {
            renames.add(r.clone(), Value::Reg(fresh::register(&r)));
        }
    }
    if renames.is_empty() {
        p.clone()
    } else {
        let renamed = renames.apply_pattern(p);
        for (r, v) in renames.iter() {
            flow.bindings.add(r.clone(), v.clone());
        }
        renamed
    }
}

fn dispatch_register(flow: &Flow, r: &str) -> String {
    match flow.bindings.apply(&Value::Reg(r.to_string())) {
        Value::Reg(r) => r,
        v => panic!("token dispatch on non-register value {v}"),
    }
}

/// Materialize pending pushes in front of `k`, oldest first, so the
/// newest push ends up topmost.
fn restore_pushes(pushes: Vec<PendingPush>, k: Block) -> Block {
    pushes
        .into_iter()
        .rev()
        .fold(k, |acc, p| Block::Push(p.value, p.cell, Box::new(acc)))
}

/// The cells two knowledge sources agree on, compared from the top.
fn common_suffix(a: &[Cell], b: &[Cell]) -> Vec<Cell> {
    let n = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    a[a.len() - n..].to_vec()
}

/// Both vectors describe the top of the same stack; the longer one knows
/// more.
fn longest_known(a: Vec<Cell>, b: Vec<Cell>) -> Vec<Cell> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    debug_assert!(
        long.ends_with(&short),
        "inconsistent stack knowledge: {short:?} vs {long:?}"
    );
    long
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cell, entry_program, tblock};
    use crate::wellformed;
    use serial_test::serial;
    use stacklang_ir::{Primitive, def, jump, need, pop, prim, push};

    #[test]
    #[serial]
    fn test_cancel_push_pop_pair() {
        let block = push(
            Value::Tag(3),
            cell("S"),
            pop(Pattern::reg("x"), Block::Return(Value::reg("x"))),
        );
        let p = entry_program(vec![("L0", tblock(block, &[]))]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.cancelled_pops, 1);
        assert_eq!(
            p.cfg["L0"].block.clone().strip_comments(),
            Block::Return(Value::Tag(3))
        );
        assert!(wellformed::check(&p).is_ok());
    }

    #[test]
    #[serial]
    fn test_push_blocked_by_prim_read() {
        // The primitive overwrites r while the pending push still refers
        // to it, so the destination is renamed; the pop then cancels and
        // the return reads the original r.
        let block = push(
            Value::reg("r"),
            cell("S"),
            prim(
                "r",
                Primitive::Call {
                    callee: "f".to_string(),
                    args: vec![Value::reg("r")],
                },
                pop(Pattern::reg("y"), Block::Return(Value::reg("y"))),
            ),
        );
        let p = entry_program(vec![("L0", tblock(block, &["r"]))]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.cancelled_pops, 1);
        // Push id 0 is allocated first, then the rename.
        assert_eq!(
            p.cfg["L0"].block.clone().strip_comments(),
            prim(
                "r_1",
                Primitive::Call {
                    callee: "f".to_string(),
                    args: vec![Value::reg("r")],
                },
                Block::Return(Value::reg("r")),
            )
        );
        assert!(wellformed::check(&p).is_ok());
    }

    #[test]
    #[serial]
    fn test_tag_branch_elimination() {
        let block = def(
            Pattern::reg("s"),
            Value::Tag(7),
            stacklang_ir::case_tag(
                "s",
                vec![
                    TagBranch {
                        tags: [3, 4].into(),
                        body: Block::Die,
                    },
                    TagBranch {
                        tags: [7].into(),
                        body: Block::Return(Value::Unit),
                    },
                ],
            ),
        );
        let p = entry_program(vec![("L0", tblock(block, &[]))]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.eliminated_branches, 1);
        assert_eq!(
            p.cfg["L0"].block.clone().strip_comments(),
            Block::Return(Value::Unit)
        );
    }

    #[test]
    #[serial]
    fn test_restore_order_at_jump() {
        // Three pushes with an interleaved definition; the last one
        // cancels, the remaining two are restored in original order.
        let block = push(
            Value::Tag(1),
            cell("A"),
            def(
                Pattern::reg("x"),
                Value::Tag(5),
                push(
                    Value::Tag(2),
                    cell("B"),
                    push(
                        Value::reg("x"),
                        cell("C"),
                        pop(Pattern::reg("z"), jump("L1")),
                    ),
                ),
            ),
        );
        let p = entry_program(vec![
            ("L0", tblock(block, &[])),
            ("L1", tblock(Block::Die, &[])),
        ]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.cancelled_pops, 1);
        assert_eq!(
            p.cfg["L0"].block.clone().strip_comments(),
            push(
                Value::Tag(1),
                cell("A"),
                push(Value::Tag(2), cell("B"), jump("L1")),
            )
        );
        assert!(wellformed::check(&p).is_ok());
    }

    #[test]
    #[serial]
    fn test_no_progress_returns_original_block() {
        let block = push(Value::Tag(1), cell("A"), jump("L1"));
        let p = entry_program(vec![
            ("L0", tblock(block.clone(), &[])),
            ("L1", tblock(Block::Die, &[])),
        ]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats, CommuteStats::default());
        assert_eq!(p.cfg["L0"].block, block);
    }

    #[test]
    #[serial]
    fn test_need_keeps_push_values_live() {
        let block = push(
            Value::reg("r"),
            cell("A"),
            need(
                RegisterSet::new(),
                pop(Pattern::reg("y"), Block::Return(Value::reg("y"))),
            ),
        );
        let p = entry_program(vec![("L0", tblock(block, &["r"]))]);
        let (p, _) = commute_with_stats(p);
        match p.cfg["L0"].block.clone().strip_comments() {
            Block::Need(rs, k) => {
                assert!(rs.contains("r"));
                assert_eq!(*k, Block::Return(Value::reg("r")));
            }
            other => panic!("expected a need, got {other:?}"),
        }
        assert!(wellformed::check(&p).is_ok());
    }

    #[test]
    #[serial]
    fn test_die_drops_pending_pushes() {
        let block = push(Value::Tag(1), cell("A"), Block::Die);
        let p = entry_program(vec![("L0", tblock(block, &[]))]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.cancelled_pops, 1);
        assert_eq!(p.cfg["L0"].block.clone().strip_comments(), Block::Die);
    }

    #[test]
    #[serial]
    fn test_singleton_branch_substitutes_pushed_tag() {
        // Inside the singleton arm, the pushed copy of s must be the
        // constant tag, so the push cancels into a constant.
        let block = push(
            Value::reg("s"),
            cell("S"),
            stacklang_ir::case_tag(
                "s",
                vec![TagBranch {
                    tags: [4].into(),
                    body: pop(Pattern::reg("x"), Block::Return(Value::reg("x"))),
                }],
            ),
        );
        let p = entry_program(vec![("L0", tblock(block, &["s"]))]);
        let (p, stats) = commute_with_stats(p);
        assert_eq!(stats.cancelled_pops, 1);
        match p.cfg["L0"].block.clone().strip_comments() {
            Block::CaseTag(r, arms) => {
                assert_eq!(r, "s");
                assert_eq!(arms[0].body, Block::Return(Value::Tag(4)));
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    #[should_panic(expected = "no known cell")]
    fn test_dead_pop_asserts() {
        let block = pop(Pattern::reg("x"), Block::Die);
        let p = entry_program(vec![("L0", tblock(block, &[]))]);
        // A pop from a stack with no known cells and no pending push
        // means upstream emission is broken.
        let _ = commute_with_stats(p);
    }
}
