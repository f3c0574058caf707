// ============================================================
// Layer 5 — Learning-Rate Policies
// ============================================================
// burn's optimizer takes a plain learning rate on every step,
// so a schedule is just a function of the step index:
//
//   lr(group, step) = base[group] * policy.factor(step, total)
//   beta_1(step)    = policy.momentum(step, total, moms)
//
// base[group] comes from `LearningRates` (one rate for all
// groups, or geometrically spaced rates from the first group to
// the last). `Trainable` says which groups get stepped at all.
//
// `StageScheduler` walks both curves step by step behind burn's
// `LrScheduler` trait.

use std::f64::consts::PI;

use burn::{lr_scheduler::LrScheduler, optim::LearningRate, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LearningRates {
    /// The same rate for every group.
    Uniform(f64),
    /// `lo` for the first group up to `hi` for the last, evenly spaced
    /// on a log scale.
    Slice(f64, f64),
}

impl LearningRates {
    pub fn per_group(self, num_groups: usize) -> Vec<f64> {
        match self {
            LearningRates::Uniform(lr) => vec![lr; num_groups],
            LearningRates::Slice(lo, hi) => even_mults(lo, hi, num_groups),
        }
    }

    pub fn max(self) -> f64 {
        match self {
            LearningRates::Uniform(lr) => lr,
            LearningRates::Slice(lo, hi) => lo.max(hi),
        }
    }
}

/// `n` values from `start` to `stop` with a constant ratio between neighbours.
pub fn even_mults(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![stop],
        _ => {
            let step = (stop / start).powf(1.0 / (n - 1) as f64);
            (0..n).map(|i| start * step.powi(i as i32)).collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Policy {
    Constant,
    /// Cosine warm-up from `1/div_factor` to 1 over the first `pct_start`
    /// of the steps, then cosine annealing to `1/(div_factor*final_div)`.
    OneCycle {
        pct_start:  f64,
        div_factor: f64,
        final_div:  f64,
    },
}

impl Policy {
    pub fn one_cycle() -> Self {
        Policy::OneCycle { pct_start: 0.3, div_factor: 25.0, final_div: 1e4 }
    }

    /// Multiplier on the base rates at `step` of `total` steps (0-based).
    /// Steps past the end repeat the last value.
    pub fn factor(&self, step: usize, total: usize) -> f64 {
        match *self {
            Policy::Constant => 1.0,
            Policy::OneCycle { pct_start, div_factor, final_div } => {
                let start = 1.0 / div_factor;
                let end   = start / final_div;
                match cycle_phase(step, total, pct_start) {
                    None               => 1.0,
                    Some((true, pct))  => annealing_cos(start, 1.0, pct),
                    Some((false, pct)) => annealing_cos(1.0, end, pct),
                }
            }
        }
    }

    /// Adam's `beta_1` at `step`: `moms.0` throughout for a constant
    /// policy. One-cycle runs it opposite to the learning rate, down to
    /// `moms.1` at the peak and back up to `moms.0` at the end.
    pub fn momentum(&self, step: usize, total: usize, moms: (f64, f64)) -> f64 {
        match *self {
            Policy::Constant => moms.0,
            Policy::OneCycle { pct_start, .. } => match cycle_phase(step, total, pct_start) {
                None               => moms.0,
                Some((true, pct))  => annealing_cos(moms.0, moms.1, pct),
                Some((false, pct)) => annealing_cos(moms.1, moms.0, pct),
            },
        }
    }
}

/// `(warming up, progress within the phase)` of `step`, clamped to the
/// last step; `None` for an empty cycle.
fn cycle_phase(step: usize, total: usize, pct_start: f64) -> Option<(bool, f64)> {
    if total == 0 {
        return None;
    }
    let step   = step.min(total - 1);
    let warmup = (total as f64 * pct_start) as usize;
    if step < warmup {
        Some((true, step as f64 / warmup as f64))
    } else {
        let span = (total - warmup).max(1) as f64;
        Some((false, (step - warmup) as f64 / span))
    }
}

/// Cosine interpolation from `start` (pct = 0) to `end` (pct = 1).
fn annealing_cos(start: f64, end: f64, pct: f64) -> f64 {
    end + (start - end) / 2.0 * ((PI * pct).cos() + 1.0)
}

// ─── Stage scheduler ──────────────────────────────────────────────────────────
/// The learning rate of `policy` peaking at `peak`, over `total` steps,
/// and the momentum that goes with each step.
#[derive(Debug, Clone, PartialEq)]
pub struct StageScheduler {
    policy: Policy,
    peak:   f64,
    moms:   (f64, f64),
    total:  usize,
    step:   usize,
}

impl StageScheduler {
    pub fn new(policy: Policy, peak: f64, moms: (f64, f64), total: usize) -> Self {
        Self { policy, peak, moms, total, step: 0 }
    }

    /// Momentum of the step the next `step()` call returns the rate of.
    pub fn momentum(&self) -> f64 {
        self.policy.momentum(self.step, self.total, self.moms)
    }
}

impl LrScheduler for StageScheduler {
    type Record<B: Backend> = usize;

    fn step(&mut self) -> LearningRate {
        let lr = self.peak * self.policy.factor(self.step, self.total);
        self.step += 1;
        lr
    }

    fn to_record<B: Backend>(&self) -> Self::Record<B> {
        self.step
    }

    fn load_record<B: Backend>(mut self, record: Self::Record<B>) -> Self {
        self.step = record;
        self
    }
}

/// Which layer groups receive optimizer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trainable {
    All,
    /// Only the last `k` groups; `LastGroups(1)` trains the head alone.
    LastGroups(usize),
}

impl Trainable {
    /// Index of the first group that is stepped.
    pub fn first_group(self, num_groups: usize) -> usize {
        match self {
            Trainable::All => 0,
            Trainable::LastGroups(k) => num_groups.saturating_sub(k),
        }
    }
}
