//! Audit checks
//!
//! A check validates one materialized record. The runner turns every
//! outcome, panics included, into a `CheckResult`; aggregating results
//! over many records is left to the caller.
//!
//! # Design Principles
//!
//! - A check's calling contract is a type, not a runtime inspection
//! - Failures cross the runner boundary as data
//! - One failing check never stops the checks after it

mod builtin;
mod record;
mod registry;
mod result;
mod runner;

pub use builtin::{
    check_args_kwargs_match, check_extra_info, check_instantiation, check_name_match_id,
    check_unfilled_mandatory_info, check_wait_connection, find_unfilled_mandatory_info,
    find_unfilled_optional_info, CONNECTION_TIMEOUT,
};
pub use record::Record;
pub use registry::{checks, find_check, CHECKS};
pub use result::CheckResult;
pub use runner::{verify, verify_all, Check, CheckFn};
