//! Well-formedness of StackLang programs
//!
//! Verifies that every register reference is defined on entry, that jumps
//! target existing labels, and that jump sites define everything their
//! target needs. The IR is supposed to be produced correctly; a violation
//! here means an earlier pass is buggy, so callers treat errors as fatal.
//!
//! The walk threads a set of defined registers. `Need` replaces the set;
//! binders extend it; everything else only reads it.

use stacklang_ir::{Block, Label, Program, RegisterSet, TokenPat};

/// A structural violation, carrying enough context to locate the bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellFormedError {
    /// A register was referenced before being defined.
    Undefined {
        label: Label,
        undefined: RegisterSet,
        defined: RegisterSet,
    },
    /// A jump targets a label absent from the control-flow graph.
    MissingLabel { label: Label, target: Label },
}

impl std::fmt::Display for WellFormedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WellFormedError::Undefined {
                label,
                undefined,
                defined,
            } => {
                write!(
                    f,
                    "in block {}: undefined registers {:?} (defined here: {:?})",
                    label, undefined, defined
                )
            }
            WellFormedError::MissingLabel { label, target } => {
                write!(f, "in block {}: jump to missing label {}", label, target)
            }
        }
    }
}

impl std::error::Error for WellFormedError {}

/// Check every block of a program.
pub fn check(program: &Program) -> Result<(), WellFormedError> {
    for (label, t) in &program.cfg {
        check_block(program, label, &t.block, t.needed_registers.clone())?;
    }
    Ok(())
}

fn require(
    program_label: &str,
    used: &RegisterSet,
    defined: &RegisterSet,
) -> Result<(), WellFormedError> {
    if used.is_subset(defined) {
        Ok(())
    } else {
        Err(WellFormedError::Undefined {
            label: program_label.to_string(),
            undefined: used.difference(defined).cloned().collect(),
            defined: defined.clone(),
        })
    }
}

fn target_needed<'a>(
    program: &'a Program,
    label: &str,
    target: &Label,
) -> Result<&'a RegisterSet, WellFormedError> {
    match program.cfg.get(target) {
        Some(t) => Ok(&t.needed_registers),
        None => Err(WellFormedError::MissingLabel {
            label: label.to_string(),
            target: target.clone(),
        }),
    }
}

fn check_block(
    program: &Program,
    label: &str,
    b: &Block,
    mut defined: RegisterSet,
) -> Result<(), WellFormedError> {
    match b {
        Block::Need(rs, k) => {
            require(label, rs, &defined)?;
            check_block(program, label, k, rs.clone())
        }
        Block::Push(v, _, k) => {
            require(label, &v.registers(), &defined)?;
            check_block(program, label, k, defined)
        }
        Block::Pop(p, k) => {
            defined.extend(p.registers());
            check_block(program, label, k, defined)
        }
        Block::Def(bindings, k) => {
            require(label, &bindings.codomain_registers(), &defined)?;
            defined.extend(bindings.domain());
            check_block(program, label, k, defined)
        }
        Block::Prim(r, prim, k) => {
            require(label, &prim.registers(), &defined)?;
            defined.insert(r.clone());
            check_block(program, label, k, defined)
        }
        Block::Trace(_, k) | Block::Comment(_, k) => check_block(program, label, k, defined),
        Block::Die => Ok(()),
        Block::Return(v) => require(label, &v.registers(), &defined),
        Block::Jump(target) => {
            let needed = target_needed(program, label, target)?;
            require(label, needed, &defined)
        }
        Block::SubstJump(bindings, target) => {
            require(label, &bindings.codomain_registers(), &defined)?;
            let needed = target_needed(program, label, target)?;
            let mut available = defined;
            available.extend(bindings.domain());
            require(label, needed, &available)
        }
        Block::CaseToken(r, branches, default) => {
            require(label, &[r.clone()].into(), &defined)?;
            for br in branches {
                let mut branch_defined = defined.clone();
                if let TokenPat::Single(_, payload) = &br.pat {
                    branch_defined.insert(payload.clone());
                }
                check_block(program, label, &br.body, branch_defined)?;
            }
            if let Some(d) = default {
                check_block(program, label, d, defined)?;
            }
            Ok(())
        }
        Block::CaseTag(r, branches) => {
            require(label, &[r.clone()].into(), &defined)?;
            for br in branches {
                check_block(program, label, &br.body, defined.clone())?;
            }
            Ok(())
        }
        Block::Typed(t) => {
            require(label, &t.needed_registers, &defined)?;
            check_block(program, label, &t.block, t.needed_registers.clone())
        }
    }
}
