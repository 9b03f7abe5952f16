//! A small LR(1) fixture shared by interpreter and tester tests.
//!
//! The grammar is `main -> a main b | c`. The automaton is the usual
//! LR(1) construction with default reductions; the program is the table
//! automaton spelled out in StackLang, in the shape emitted for real
//! grammars: one `run` block per state, reduction blocks that pop the
//! right-hand side, and a goto block dispatching on the exposed state.

use crate::automaton::{Decision, Lr1Automaton, Reduction, State};
use crate::grammar::{Grammar, Production, Symbol};
use crate::testutil::tblock;
use stacklang_ir::{
    Block, Cell, Pattern, Primitive, Program, StateInfo, TokenBranch, TokenPat, Value, case_tag,
    case_token, jump, pop, prim, push, TagBranch,
};
use std::collections::BTreeMap;

fn scell() -> Cell {
    Cell::new("main", true, true)
}

pub fn balanced_grammar() -> Grammar {
    Grammar {
        productions: vec![
            Production {
                lhs: "main".to_string(),
                rhs: vec![Symbol::t("a"), Symbol::nt("main"), Symbol::t("b")],
            },
            Production {
                lhs: "main".to_string(),
                rhs: vec![Symbol::t("c")],
            },
        ],
        uses_error_token: false,
    }
}

pub fn balanced_automaton() -> Lr1Automaton {
    let mut s0 = State::default();
    s0.actions.insert("a".to_string(), Decision::Shift(2));
    s0.actions.insert("c".to_string(), Decision::Shift(3));
    s0.gotos.insert("main".to_string(), 1);

    let s1 = State {
        default: Some(Decision::Accept),
        ..State::default()
    };

    let mut s2 = State::default();
    s2.actions.insert("a".to_string(), Decision::Shift(2));
    s2.actions.insert("c".to_string(), Decision::Shift(3));
    s2.gotos.insert("main".to_string(), 4);

    let s3 = State {
        default: Some(Decision::Reduce(1)),
        ..State::default()
    };

    let mut s4 = State::default();
    s4.actions.insert("b".to_string(), Decision::Shift(5));

    let s5 = State {
        default: Some(Decision::Reduce(0)),
        ..State::default()
    };

    Lr1Automaton {
        entries: [("main".to_string(), 0)].into(),
        states: vec![s0, s1, s2, s3, s4, s5],
        reductions: vec![
            Reduction {
                lhs: "main".to_string(),
                rhs_len: 3,
            },
            Reduction {
                lhs: "main".to_string(),
                rhs_len: 1,
            },
        ],
    }
}

fn shift_branches(state: usize) -> Block {
    // States 0 and 2 shift a and c the same way, differing only in the
    // tag they leave on the stack.
    case_token(
        "tok",
        vec![
            TokenBranch {
                pat: TokenPat::Multiple(["a".to_string()].into()),
                body: push(Value::Tag(state), Cell::new("a", true, false), jump("run2")),
            },
            TokenBranch {
                pat: TokenPat::Single("c".to_string(), "v".to_string()),
                body: push(Value::Tag(state), Cell::new("c", true, true), jump("run3")),
            },
        ],
        None,
    )
}

pub fn balanced_program() -> Program {
    let run0 = tblock(prim("tok", Primitive::Lexer, shift_branches(0)), &[]);
    let run2 = tblock(prim("tok", Primitive::Lexer, shift_branches(2)), &[]);

    // Reduce main -> c: pop one cell, the exposed state goes to the goto
    // dispatch.
    let mut run3 = tblock(pop(Pattern::reg("s"), jump("goto_main")), &[]);
    run3.stack_type = vec![scell()];

    let mut run4 = tblock(
        prim(
            "tok",
            Primitive::Lexer,
            case_token(
                "tok",
                vec![TokenBranch {
                    pat: TokenPat::Multiple(["b".to_string()].into()),
                    body: push(Value::Tag(4), Cell::new("b", true, false), jump("run5")),
                }],
                None,
            ),
        ),
        &[],
    );
    run4.stack_type = vec![scell(), scell()];

    // Reduce main -> a main b: pop three cells.
    let mut run5 = tblock(
        pop(
            Pattern::Wildcard,
            pop(Pattern::Wildcard, pop(Pattern::reg("s"), jump("goto_main"))),
        ),
        &[],
    );
    run5.stack_type = vec![scell(), scell(), scell()];

    let mut goto_main = tblock(
        case_tag(
            "s",
            vec![
                TagBranch {
                    tags: [0].into(),
                    body: push(Value::reg("s"), scell(), jump("run1")),
                },
                TagBranch {
                    tags: [2].into(),
                    body: push(Value::reg("s"), scell(), jump("run4")),
                },
            ],
        ),
        &["s"],
    );
    goto_main.has_case_tag = true;

    let run1 = tblock(Block::Return(Value::Unit), &[]);

    let states: BTreeMap<usize, StateInfo> = [
        (
            0,
            StateInfo {
                final_type: Some("main".to_string()),
                known_cells: vec![],
            },
        ),
        (
            2,
            StateInfo {
                final_type: Some("main".to_string()),
                known_cells: vec![scell()],
            },
        ),
    ]
    .into();

    Program {
        cfg: [
            ("run0".to_string(), run0),
            ("run1".to_string(), run1),
            ("run2".to_string(), run2),
            ("run3".to_string(), run3),
            ("run4".to_string(), run4),
            ("run5".to_string(), run5),
            ("goto_main".to_string(), goto_main),
        ]
        .into(),
        entry: [("main".to_string(), "run0".to_string())].into(),
        states,
    }
}

/// The one-production grammar `start -> a`, with its automaton and
/// program.
pub fn trivial_grammar() -> Grammar {
    Grammar {
        productions: vec![Production {
            lhs: "start".to_string(),
            rhs: vec![Symbol::t("a")],
        }],
        uses_error_token: false,
    }
}

pub fn trivial_automaton() -> Lr1Automaton {
    let mut s0 = State::default();
    s0.actions.insert("a".to_string(), Decision::Shift(2));
    s0.gotos.insert("start".to_string(), 1);
    let s1 = State {
        default: Some(Decision::Accept),
        ..State::default()
    };
    let s2 = State {
        default: Some(Decision::Reduce(0)),
        ..State::default()
    };
    Lr1Automaton {
        entries: [("start".to_string(), 0)].into(),
        states: vec![s0, s1, s2],
        reductions: vec![Reduction {
            lhs: "start".to_string(),
            rhs_len: 1,
        }],
    }
}

pub fn trivial_program() -> Program {
    let run0 = tblock(
        prim(
            "tok",
            Primitive::Lexer,
            case_token(
                "tok",
                vec![TokenBranch {
                    pat: TokenPat::Single("a".to_string(), "v".to_string()),
                    body: jump("run1"),
                }],
                None,
            ),
        ),
        &[],
    );
    let run1 = tblock(Block::Return(Value::Unit), &[]);
    Program {
        cfg: [
            ("run0".to_string(), run0),
            ("run1".to_string(), run1),
        ]
        .into(),
        entry: [("start".to_string(), "run0".to_string())].into(),
        states: BTreeMap::new(),
    }
}
