//! Fixed, ordered list of the built-in checks

use super::builtin::{
    check_args_kwargs_match, check_extra_info, check_instantiation, check_name_match_id,
    check_unfilled_mandatory_info, check_wait_connection,
};
use super::runner::Check;

/// Built-in checks in the order audits run them
pub static CHECKS: [Check; 6] = [
    Check::new("check_instantiation", check_instantiation),
    Check::new("check_extra_info", check_extra_info),
    Check::new("check_name_match_id", check_name_match_id),
    Check::new("check_wait_connection", check_wait_connection),
    Check::new("check_args_kwargs_match", check_args_kwargs_match),
    Check::new("check_unfilled_mandatory_info", check_unfilled_mandatory_info),
];

pub fn checks() -> &'static [Check] {
    &CHECKS
}

pub fn find_check(name: &str) -> Option<&'static Check> {
    CHECKS.iter().find(|check| check.name() == name)
}
