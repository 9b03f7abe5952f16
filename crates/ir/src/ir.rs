//! StackLang instructions, blocks and programs
//!
//! A block is a cons-list of instructions terminated by a control-flow
//! leaf (`Die`, `Return`, a jump, or a case dispatch). Programs are maps
//! from labels to typed blocks; labels are symbolic handles, so the cyclic
//! control-flow graph poses no ownership problem.
//!
//! The [`Block::map`] and [`Block::iter`] combinators traverse exactly one
//! instruction level and are the only place that pattern-matches every
//! instruction form. Analyses and transformations match the cases they
//! care about and defer the rest to the combinator.

use crate::subst::Bindings;
use std::collections::{BTreeMap, BTreeSet};

/// The unit of local storage. Names are drawn from a countable set.
pub type Register = String;

/// Symbolic handle naming a block in the control-flow graph.
pub type Label = String;

/// A small non-negative integer naming an LR state equivalence class.
pub type Tag = usize;

/// A terminal symbol of the grammar.
pub type Terminal = String;

/// A nonterminal symbol of the grammar.
pub type Nonterminal = String;

/// A set of registers, ordered for deterministic output.
pub type RegisterSet = BTreeSet<Register>;

/// A value: the right-hand side of a binding, the operand of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A state tag constant.
    Tag(Tag),
    /// The current contents of a register.
    Reg(Register),
    /// A finite sequence of values.
    Tuple(Vec<Value>),
    /// The zero-information value.
    Unit,
}

impl Value {
    pub fn reg(r: impl Into<Register>) -> Value {
        Value::Reg(r.into())
    }

    pub fn tuple(vs: Vec<Value>) -> Value {
        Value::Tuple(vs)
    }
}

/// A pattern: the left-hand side of a binding.
///
/// No register may be bound twice by one pattern; [`Pattern::tuple`]
/// asserts this linearity invariant on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches any value, binds nothing.
    Wildcard,
    /// Binds a register to the matched value.
    Reg(Register),
    /// Structurally matches a tuple of the same arity.
    Tuple(Vec<Pattern>),
}

impl Pattern {
    pub fn reg(r: impl Into<Register>) -> Pattern {
        Pattern::Reg(r.into())
    }

    /// Build a tuple pattern, asserting binder linearity.
    ///
    /// # Panics
    ///
    /// Panics if a register is bound more than once.
    pub fn tuple(ps: Vec<Pattern>) -> Pattern {
        let p = Pattern::Tuple(ps);
        let mut seen = RegisterSet::new();
        p.check_linear(&mut seen);
        p
    }

    fn check_linear(&self, seen: &mut RegisterSet) {
        match self {
            Pattern::Wildcard => {}
            Pattern::Reg(r) => {
                assert!(
                    seen.insert(r.clone()),
                    "pattern binds register {r} more than once"
                );
            }
            Pattern::Tuple(ps) => {
                for p in ps {
                    p.check_linear(seen);
                }
            }
        }
    }
}

/// Symbolic descriptor of one on-stack slot: the grammar symbol it was
/// pushed for and which components it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub symbol: String,
    pub holds_state: bool,
    pub holds_semv: bool,
}

impl Cell {
    pub fn new(symbol: impl Into<String>, holds_state: bool, holds_semv: bool) -> Cell {
        Cell {
            symbol: symbol.into(),
            holds_state,
            holds_semv,
        }
    }
}

/// An opaque call that cannot be inlined.
///
/// Apart from [`Primitive::Lexer`], primitives are host-language artifacts
/// carried through the backend without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Host-language function call.
    Call { callee: String, args: Vec<Value> },
    /// Host-language record field access.
    Field { value: Value, field: String },
    /// Host-language synthetic position.
    DummyPos,
    /// Host-language semantic action, with the bindings it captures.
    Action { id: usize, bindings: Bindings },
    /// Fetch the next token from the lexical analyzer.
    Lexer,
}

impl Primitive {
    /// The registers this primitive reads.
    pub fn registers(&self) -> RegisterSet {
        match self {
            Primitive::Call { args, .. } => {
                let mut rs = RegisterSet::new();
                for a in args {
                    rs.extend(a.registers());
                }
                rs
            }
            Primitive::Field { value, .. } => value.registers(),
            Primitive::DummyPos | Primitive::Lexer => RegisterSet::new(),
            Primitive::Action { bindings, .. } => bindings.codomain_registers(),
        }
    }

    /// Substitute through the primitive's operands.
    pub fn apply(&self, s: &Bindings) -> Primitive {
        match self {
            Primitive::Call { callee, args } => Primitive::Call {
                callee: callee.clone(),
                args: args.iter().map(|a| s.apply(a)).collect(),
            },
            Primitive::Field { value, field } => Primitive::Field {
                value: s.apply(value),
                field: field.clone(),
            },
            Primitive::DummyPos => Primitive::DummyPos,
            Primitive::Lexer => Primitive::Lexer,
            Primitive::Action { id, bindings } => Primitive::Action {
                id: *id,
                bindings: s.compose(bindings),
            },
        }
    }
}

/// One branch pattern of a token dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPat {
    /// Match one terminal, binding its semantic payload.
    Single(Terminal, Register),
    /// Match any terminal in the set, binding nothing.
    Multiple(BTreeSet<Terminal>),
}

/// One arm of a token dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBranch {
    pub pat: TokenPat,
    pub body: Block,
}

/// One arm of a tag dispatch: matches any state tag in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBranch {
    pub tags: BTreeSet<Tag>,
    pub body: Block,
}

/// A block wrapped with its stack-shape and liveness contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedBlock {
    pub block: Block,
    /// Known stack cells on entry, deepest first, top of stack at the end.
    pub stack_type: Vec<Cell>,
    /// Return type of the enclosing entry point, when known.
    pub final_type: Option<Nonterminal>,
    /// Registers that must be live on entry.
    pub needed_registers: RegisterSet,
    /// True iff some descendant contains a `CaseTag`.
    pub has_case_tag: bool,
    pub name: Option<String>,
}

/// A StackLang instruction, written as a cons-cell carrying its
/// continuation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Declare that only these registers are live on entry to the rest of
    /// the block. Replaces, not extends, the defined set.
    Need(RegisterSet, Box<Block>),
    /// Push a value onto the stack, annotated with symbolic cell info.
    Push(Value, Cell, Box<Block>),
    /// Pop the top of the stack into a pattern.
    Pop(Pattern, Box<Block>),
    /// Bind registers, as a simultaneous assignment.
    Def(Bindings, Box<Block>),
    /// Assign the result of a primitive to a register.
    Prim(Register, Primitive, Box<Block>),
    /// Side-effect-only trace message; semantically transparent.
    Trace(String, Box<Block>),
    /// Pure annotation; transparent.
    Comment(String, Box<Block>),
    /// Abort execution.
    Die,
    /// Return a value.
    Return(Value),
    /// Transfer control to a label.
    Jump(Label),
    /// Bind registers, then transfer control.
    SubstJump(Bindings, Label),
    /// Dispatch on the token held in a register.
    CaseToken(Register, Vec<TokenBranch>, Option<Box<Block>>),
    /// Dispatch on the state tag held in a register.
    CaseTag(Register, Vec<TagBranch>),
    /// A sub-block carrying stack-shape and liveness contracts.
    Typed(Box<TypedBlock>),
}

impl Block {
    /// Rebuild one instruction level, applying `f` to each immediate
    /// sub-block. Terminals are returned unchanged.
    pub fn map<F: FnMut(Block) -> Block>(self, f: &mut F) -> Block {
        match self {
            Block::Need(rs, k) => Block::Need(rs, Box::new(f(*k))),
            Block::Push(v, c, k) => Block::Push(v, c, Box::new(f(*k))),
            Block::Pop(p, k) => Block::Pop(p, Box::new(f(*k))),
            Block::Def(b, k) => Block::Def(b, Box::new(f(*k))),
            Block::Prim(r, p, k) => Block::Prim(r, p, Box::new(f(*k))),
            Block::Trace(s, k) => Block::Trace(s, Box::new(f(*k))),
            Block::Comment(s, k) => Block::Comment(s, Box::new(f(*k))),
            Block::Die => Block::Die,
            Block::Return(v) => Block::Return(v),
            Block::Jump(l) => Block::Jump(l),
            Block::SubstJump(b, l) => Block::SubstJump(b, l),
            Block::CaseToken(r, branches, default) => Block::CaseToken(
                r,
                branches
                    .into_iter()
                    .map(|br| TokenBranch {
                        pat: br.pat,
                        body: f(br.body),
                    })
                    .collect(),
                default.map(|d| Box::new(f(*d))),
            ),
            Block::CaseTag(r, branches) => Block::CaseTag(
                r,
                branches
                    .into_iter()
                    .map(|br| TagBranch {
                        tags: br.tags,
                        body: f(br.body),
                    })
                    .collect(),
            ),
            Block::Typed(mut t) => {
                t.block = f(t.block);
                Block::Typed(t)
            }
        }
    }

    /// Visit each immediate sub-block.
    pub fn iter<'a, F: FnMut(&'a Block)>(&'a self, f: &mut F) {
        match self {
            Block::Need(_, k)
            | Block::Push(_, _, k)
            | Block::Pop(_, k)
            | Block::Def(_, k)
            | Block::Prim(_, _, k)
            | Block::Trace(_, k)
            | Block::Comment(_, k) => f(k),
            Block::Die | Block::Return(_) | Block::Jump(_) | Block::SubstJump(_, _) => {}
            Block::CaseToken(_, branches, default) => {
                for br in branches {
                    f(&br.body);
                }
                if let Some(d) = default {
                    f(d);
                }
            }
            Block::CaseTag(_, branches) => {
                for br in branches {
                    f(&br.body);
                }
            }
            Block::Typed(t) => f(&t.block),
        }
    }

    /// Remove every `Comment` node, recursively. Comments are pure
    /// annotation, so equality of transformed programs is judged on the
    /// comment-stripped form.
    pub fn strip_comments(self) -> Block {
        match self {
            Block::Comment(_, k) => k.strip_comments(),
            other => other.map(&mut Block::strip_comments),
        }
    }
}

/// Per-tag static information: the return type of the state's entry
/// point, when known, and the cells known to sit on top of the stack
/// whenever the automaton is in this state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateInfo {
    pub final_type: Option<Nonterminal>,
    pub known_cells: Vec<Cell>,
}

/// A complete StackLang program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub cfg: BTreeMap<Label, TypedBlock>,
    pub entry: BTreeMap<Nonterminal, Label>,
    pub states: BTreeMap<Tag, StateInfo>,
}

impl Program {
    /// The registers needed on entry to a label.
    ///
    /// # Panics
    ///
    /// Panics if the label is absent from the control-flow graph; a jump
    /// to a missing label means an earlier pass is buggy.
    pub fn needed(&self, label: &str) -> &RegisterSet {
        match self.cfg.get(label) {
            Some(t) => &t.needed_registers,
            None => panic!("jump to missing label {label}"),
        }
    }

    /// Strip comments from every block.
    pub fn strip_comments(mut self) -> Program {
        for t in self.cfg.values_mut() {
            let block = std::mem::replace(&mut t.block, Block::Die);
            t.block = block.strip_comments();
        }
        self
    }
}

// Smart constructors. These are the preferred way to build blocks: they
// box continuations and drop instructions that are identities.

pub fn need(rs: RegisterSet, k: Block) -> Block {
    Block::Need(rs, Box::new(k))
}

pub fn push(v: Value, cell: Cell, k: Block) -> Block {
    Block::Push(v, cell, Box::new(k))
}

pub fn pop(p: Pattern, k: Block) -> Block {
    Block::Pop(p, Box::new(k))
}

/// Bind pattern `p` to value `v`. A binding that does nothing is dropped.
pub fn def(p: Pattern, v: Value, k: Block) -> Block {
    defs(Bindings::assign(&p, &v), k)
}

/// Apply a composite bindings map. An empty map is dropped.
pub fn defs(b: Bindings, k: Block) -> Block {
    if b.is_empty() {
        k
    } else {
        Block::Def(b, Box::new(k))
    }
}

pub fn prim(r: impl Into<Register>, p: Primitive, k: Block) -> Block {
    Block::Prim(r.into(), p, Box::new(k))
}

pub fn trace(msg: impl Into<String>, k: Block) -> Block {
    Block::Trace(msg.into(), Box::new(k))
}

pub fn comment(msg: impl Into<String>, k: Block) -> Block {
    Block::Comment(msg.into(), Box::new(k))
}

pub fn jump(l: impl Into<Label>) -> Block {
    Block::Jump(l.into())
}

/// Bind, then jump. Empty bindings reduce to a plain jump.
pub fn subst_jump(b: Bindings, l: impl Into<Label>) -> Block {
    if b.is_empty() {
        Block::Jump(l.into())
    } else {
        Block::SubstJump(b, l.into())
    }
}

pub fn case_token(
    r: impl Into<Register>,
    branches: Vec<TokenBranch>,
    default: Option<Block>,
) -> Block {
    Block::CaseToken(r.into(), branches, default.map(Box::new))
}

pub fn case_tag(r: impl Into<Register>, branches: Vec<TagBranch>) -> Block {
    Block::CaseTag(r.into(), branches)
}

pub fn typed_block(t: TypedBlock) -> Block {
    Block::Typed(Box::new(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_pattern_linearity() {
        // Distinct binders are fine, wildcards never collide.
        let _ = Pattern::tuple(vec![
            Pattern::reg("a"),
            Pattern::Wildcard,
            Pattern::Wildcard,
            Pattern::tuple(vec![Pattern::reg("b")]),
        ]);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn test_tuple_pattern_rejects_duplicate_binder() {
        let _ = Pattern::tuple(vec![
            Pattern::reg("a"),
            Pattern::tuple(vec![Pattern::reg("a")]),
        ]);
    }

    #[test]
    fn test_def_smart_constructor_drops_identity() {
        // x := x binds nothing, so the instruction disappears.
        let k = def(Pattern::reg("x"), Value::reg("x"), Block::Die);
        assert_eq!(k, Block::Die);
    }

    #[test]
    fn test_subst_jump_reduces_to_jump() {
        assert_eq!(subst_jump(Bindings::empty(), "L0"), Block::Jump("L0".into()));
    }

    #[test]
    fn test_map_preserves_terminals() {
        let mut calls = 0;
        let b = Block::Return(Value::Unit).map(&mut |k| {
            calls += 1;
            k
        });
        assert_eq!(b, Block::Return(Value::Unit));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_map_visits_every_branch() {
        let b = case_token(
            "tok",
            vec![
                TokenBranch {
                    pat: TokenPat::Single("A".into(), "v".into()),
                    body: Block::Die,
                },
                TokenBranch {
                    pat: TokenPat::Multiple(["B".to_string()].into()),
                    body: Block::Die,
                },
            ],
            Some(Block::Die),
        );
        let mut visited = 0;
        b.iter(&mut |_| visited += 1);
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_strip_comments_is_deep() {
        let b = comment(
            "outer",
            push(
                Value::Tag(1),
                Cell::new("S", true, false),
                comment("inner", Block::Die),
            ),
        );
        let stripped = b.strip_comments();
        assert_eq!(
            stripped,
            push(Value::Tag(1), Cell::new("S", true, false), Block::Die)
        );
    }
}
