//! Pass driver
//!
//! Runs the transformation pipeline in order, checking well-formedness
//! after every pass and reporting one line per pass with the original
//! and transformed push counts. A failed check aborts the pipeline; the
//! partially transformed program is discarded.

use crate::commute;
use crate::dead_branch;
use crate::has_case_tag;
use crate::inline;
use crate::measure::Measure;
use crate::settings::Settings;
use crate::tag_inline;
use crate::wellformed::{self, WellFormedError};
use stacklang_ir::Program;
use tracing::info;

/// Optimize a program under the given settings.
pub fn optimize(program: Program, settings: &Settings) -> Result<Program, WellFormedError> {
    wellformed::check(&program)?;
    let mut program = run_pass("inline", program, settings, inline::inline)?;
    program = run_pass("tag_inline", program, settings, tag_inline::tag_inline)?;
    if settings.commute_pushes {
        program = run_pass("commute", program, settings, commute::commute)?;
        program = run_pass("dead_branch", program, settings, dead_branch::eliminate)?;
        program = run_pass("has_case_tag", program, settings, has_case_tag::update)?;
    }
    Ok(program)
}

fn run_pass(
    name: &str,
    program: Program,
    settings: &Settings,
    pass: impl FnOnce(Program) -> Program,
) -> Result<Program, WellFormedError> {
    let before = Measure::program(&program);
    if settings.dump {
        println!("== {name}: before ==");
        print!("{before}");
        print!("{program}");
    }
    let program = pass(program);
    let after = Measure::program(&program);
    info!(
        pass = name,
        pushes_before = before.push,
        pushes_after = after.push,
        "pass"
    );
    if settings.dump {
        println!("== {name}: after ==");
        print!("{after}");
        print!("{program}");
    }
    wellformed::check(&program)?;
    Ok(program)
}
