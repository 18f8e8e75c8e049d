//! Sequencer - runs steps in declared order and stops at the first failure

use crate::context::{NoProgress, ProgressCallback, StepContext};
use crate::step::Step;
use crate::types::{RunReport, StepOutcome};

/// Run every step in order against the host behind `ctx`
///
/// For each step the precondition is evaluated first; a satisfied step is
/// recorded as skipped. Otherwise the action runs and the verification must
/// hold afterwards. The first failing step ends the run: later steps are
/// neither executed nor recorded, and nothing is rolled back.
///
/// In dry-run mode unsatisfied steps are recorded as planned and no action
/// is executed.
pub fn run<P: ProgressCallback>(
    steps: &[Box<dyn Step>],
    ctx: &StepContext,
    progress: &mut P,
) -> RunReport {
    let total = steps.len();
    let mut report = RunReport::default();

    progress.on_run_start(total, ctx.dry_run);

    for (index, step) in steps.iter().enumerate() {
        progress.on_step_start(index + 1, total, step.name(), &step.description());

        let outcome = converge_step(step.as_ref(), ctx);
        progress.on_step_complete(step.name(), &outcome);

        let failed = !outcome.is_success();
        report.push(step.name(), outcome);
        if failed {
            log::warn!("step {} failed, stopping", step.name());
            break;
        }
    }

    progress.on_run_complete(&report);
    report
}

/// Run without progress reporting
pub fn run_simple(steps: &[Box<dyn Step>], ctx: &StepContext) -> RunReport {
    run(steps, ctx, &mut NoProgress)
}

fn converge_step(step: &dyn Step, ctx: &StepContext) -> StepOutcome {
    if step.is_satisfied(ctx) {
        log::debug!("{}: already satisfied", step.name());
        return StepOutcome::Skipped;
    }

    if ctx.dry_run {
        return StepOutcome::Planned;
    }

    if let Err(e) = step.apply(ctx) {
        return StepOutcome::Failed {
            error: format!("{e:#}"),
        };
    }

    if !step.verify(ctx) {
        return StepOutcome::Failed {
            error: format!("{} did not hold after applying", step.description()),
        };
    }

    StepOutcome::Applied
}
