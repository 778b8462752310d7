//! Check runner
//!
//! A check receives exactly one record and returns `Ok(())` on success or
//! an error carrying a human-readable message. The one-record calling
//! contract is part of the `CheckFn` type, so a function with any other
//! shape is rejected when the `Check` is built, before it can ever run.
//!
//! `verify` never lets a failing check escape: errors and panics alike are
//! turned into a failed `CheckResult`.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use tracing::debug;

use super::record::Record;
use super::result::CheckResult;

/// Function shape every check must have
pub type CheckFn = fn(&dyn Record) -> anyhow::Result<()>;

/// A named validation function
#[derive(Clone, Copy)]
pub struct Check {
    name: &'static str,
    func: CheckFn,
}

impl Check {
    /// Wraps `func` as a check called `name`.
    ///
    /// ```
    /// use devicedb::check::{Check, Record};
    ///
    /// fn always_ok(_record: &dyn Record) -> anyhow::Result<()> {
    ///     Ok(())
    /// }
    ///
    /// const ALWAYS_OK: Check = Check::new("always_ok", always_ok);
    /// assert_eq!(ALWAYS_OK.name(), "always_ok");
    /// ```
    ///
    /// A function taking no record is rejected:
    ///
    /// ```compile_fail
    /// use devicedb::check::Check;
    ///
    /// fn no_args() -> anyhow::Result<()> {
    ///     Ok(())
    /// }
    ///
    /// let _ = Check::new("no_args", no_args);
    /// ```
    ///
    /// So is one that needs a second argument:
    ///
    /// ```compile_fail
    /// use devicedb::check::{Check, Record};
    ///
    /// fn two_args(_record: &dyn Record, _limit: u32) -> anyhow::Result<()> {
    ///     Ok(())
    /// }
    ///
    /// let _ = Check::new("two_args", two_args);
    /// ```
    pub const fn new(name: &'static str, func: CheckFn) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Check").field(&self.name).finish()
    }
}

thread_local! {
    static RUNNING_CHECK: Cell<bool> = Cell::new(false);
}

static QUIET_HOOK: OnceCell<()> = OnceCell::new();

/// Wraps the process panic hook once so that panics raised inside a check
/// are not printed; they are reported through `CheckResult` instead.
/// Panics on other threads, or outside a check, reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !RUNNING_CHECK.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as running a check until dropped
struct QuietPanics {
    outer: bool,
}

impl QuietPanics {
    fn enter() -> Self {
        install_quiet_hook();
        Self {
            outer: RUNNING_CHECK.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        RUNNING_CHECK.with(|flag| flag.set(self.outer));
    }
}

#[cfg(test)]
fn panics_are_quiet() -> bool {
    RUNNING_CHECK.with(Cell::get)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}

/// Runs `check` against `record` and reports the outcome as data
pub fn verify(record: &dyn Record, check: &Check) -> CheckResult {
    let outcome = {
        let _quiet = QuietPanics::enter();
        panic::catch_unwind(AssertUnwindSafe(|| (check.func)(record)))
    };

    let result = match outcome {
        Ok(Ok(())) => CheckResult::passed(check.name),
        Ok(Err(e)) => CheckResult::failed(check.name, format!("{:#}", e)),
        Err(payload) => CheckResult::failed(check.name, panic_message(payload.as_ref())),
    };

    if !result.success {
        debug!(
            target: "devicedb::check",
            id = record.id().unwrap_or("<no _id>"),
            check = check.name,
            message = %result.message,
            "Check failed"
        );
    }
    result
}

/// Runs every check in order; a failure never stops the ones after it
pub fn verify_all(record: &dyn Record, checks: &[Check]) -> Vec<CheckResult> {
    checks.iter().map(|check| verify(record, check)).collect()
}
