//! Tolerance comparison and outcome bookkeeping shared by both validator profiles.
//!
//! Every check takes the provider ("api") value and the normalized filesystem ("raw")
//! value. A raw value of `None` means the file is unavailable: the check is counted as
//! such and never fails.

use std::collections::BTreeSet;

use crate::cgroup::{CgroupVersion, Controller};

use super::Report;
use super::error::{Error, Result};

/// Accepted relative deviation between two readings of the same value.
pub const ERROR_MARGIN: f64 = 0.1;

/// Returns `true` if `value` is within [`ERROR_MARGIN`] of `reference`.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::validator::compare_with_error_margin;
///
/// assert!(compare_with_error_margin(1000, 1100));
/// assert!(!compare_with_error_margin(1000, 1101));
/// assert!(compare_with_error_margin(-1, -1));
/// ```
pub fn compare_with_error_margin(reference: i64, value: i64) -> bool {
    let diff = (i128::from(reference) - i128::from(value)).unsigned_abs();
    diff as f64 <= (reference as f64 * ERROR_MARGIN).abs()
}

/// [`compare_with_error_margin`] for fractional values such as memory pressure.
pub fn compare_with_error_margin_f64(reference: f64, value: f64) -> bool {
    (reference - value).abs() <= (reference * ERROR_MARGIN).abs()
}

/// Runs individual metric checks and tallies their outcomes.
#[derive(Debug, Default)]
pub struct Checker {
    report: Report,
}

impl Checker {
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Records that a whole metric group could not run.
    pub fn skip_group(&mut self, group: &'static str) {
        log::info!("Skipping `{group}` checks: controller is not available");
        self.report.skipped.push(group);
    }

    fn unavailable(&mut self, controller: Controller, metric: &str) {
        log::debug!("Skipping {controller}:{metric}, file is not available");
        self.report.unavailable += 1;
    }

    /// A configuration value: a mismatch beyond the margin fails the run.
    pub fn expect(
        &mut self,
        controller: Controller,
        metric: &str,
        api: i64,
        raw: Option<i64>,
    ) -> Result<()> {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return Ok(());
        };

        if !compare_with_error_margin(raw, api) {
            return Err(Error::ValueMismatch {
                controller,
                metric: metric.to_owned(),
                expected: raw.to_string(),
                actual: api.to_string(),
            });
        }
        self.report.passed += 1;
        Ok(())
    }

    pub fn expect_flag(
        &mut self,
        controller: Controller,
        metric: &str,
        api: bool,
        raw: Option<bool>,
    ) -> Result<()> {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return Ok(());
        };

        if raw != api {
            return Err(Error::ValueMismatch {
                controller,
                metric: metric.to_owned(),
                expected: raw.to_string(),
                actual: api.to_string(),
            });
        }
        self.report.passed += 1;
        Ok(())
    }

    /// Cpuset membership must match exactly. Order and duplicates in `api` are ignored.
    pub fn expect_set(
        &mut self,
        controller: Controller,
        metric: &str,
        api: Vec<u32>,
        raw: Option<BTreeSet<u32>>,
    ) -> Result<()> {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return Ok(());
        };

        let api: BTreeSet<u32> = api.into_iter().collect();
        if api != raw {
            return Err(Error::SetMismatch {
                controller,
                metric: metric.to_owned(),
                expected: raw.into_iter().collect(),
                actual: api.into_iter().collect(),
            });
        }
        self.report.passed += 1;
        Ok(())
    }

    /// A live counter: a mismatch beyond the margin is only logged.
    pub fn observe(&mut self, controller: Controller, metric: &str, api: i64, raw: Option<i64>) {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return;
        };

        if compare_with_error_margin(raw, api) {
            self.report.passed += 1;
        } else {
            self.drift(controller, metric, raw, api);
        }
    }

    pub fn observe_f64(
        &mut self,
        controller: Controller,
        metric: &str,
        api: f64,
        raw: Option<f64>,
    ) {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return;
        };

        if compare_with_error_margin_f64(raw, api) {
            self.report.passed += 1;
        } else {
            self.drift(controller, metric, raw, api);
        }
    }

    /// Compares per-CPU counters pairwise. A length mismatch counts as one drift.
    pub fn observe_list(
        &mut self,
        controller: Controller,
        metric: &str,
        api: &[i64],
        raw: Option<Vec<i64>>,
    ) {
        let Some(raw) = raw else {
            self.unavailable(controller, metric);
            return;
        };

        if raw.len() != api.len() {
            self.drift(controller, metric, format!("{raw:?}"), format!("{api:?}"));
            return;
        }

        let drifted = raw
            .iter()
            .zip(api)
            .filter(|(r, a)| !compare_with_error_margin(**r, **a))
            .count();
        if drifted == 0 {
            self.report.passed += 1;
        } else {
            self.drift(controller, metric, format!("{raw:?}"), format!("{api:?}"));
        }
    }

    /// A cumulative counter read again after inducing work must not go backwards.
    pub fn expect_not_decreased(
        &mut self,
        controller: Controller,
        metric: &str,
        start: i64,
        current: i64,
    ) -> Result<()> {
        if current < start {
            return Err(Error::CounterRegression {
                controller,
                metric: metric.to_owned(),
                start,
                current,
            });
        }
        if current == start {
            log::debug!("{controller}:{metric} did not change from [{start}]");
        }
        self.report.passed += 1;
        Ok(())
    }

    pub fn expect_provider(&mut self, version: CgroupVersion, actual: String) -> Result<()> {
        let expected = version.provider_name();
        if actual != expected {
            return Err(Error::ProviderMismatch {
                expected: expected.to_owned(),
                actual,
            });
        }
        self.report.passed += 1;
        Ok(())
    }

    fn drift(
        &mut self,
        controller: Controller,
        metric: &str,
        raw: impl std::fmt::Display,
        api: impl std::fmt::Display,
    ) {
        log::warn!("{controller}:{metric} differs beyond margin, expected [{raw}], got [{api}]");
        self.report.warned += 1;
    }
}
