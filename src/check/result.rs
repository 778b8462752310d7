//! Check results

use serde::{Deserialize, Serialize};

/// Outcome of running one check against one record.
///
/// `message` is empty exactly when `success` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub success: bool,
    pub check_name: String,
    pub message: String,
}

impl CheckResult {
    pub fn passed(check_name: impl Into<String>) -> Self {
        Self {
            success: true,
            check_name: check_name.into(),
            message: String::new(),
        }
    }

    /// Failed result; an empty message is replaced so it stays non-empty
    pub fn failed(check_name: impl Into<String>, message: impl Into<String>) -> Self {
        let check_name = check_name.into();
        let mut message = message.into();
        if message.is_empty() {
            message = format!("{} failed without a message", check_name);
        }
        Self {
            success: false,
            check_name,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_empty_iff_success() {
        let ok = CheckResult::passed("c");
        assert!(ok.success && ok.message.is_empty());

        let bad = CheckResult::failed("c", "");
        assert!(!bad.success);
        assert!(!bad.message.is_empty());
    }
}
