use std::collections::HashMap;

use crate::error::{AppError, Result};

/// Attempt counts for identifiers that have failed at least once in a run.
#[derive(Debug, Default)]
pub(crate) struct RetryLedger {
    attempts: HashMap<String, u32>,
}

impl RetryLedger {
    pub fn first_failure(&mut self, identifier: &str) {
        self.attempts.insert(identifier.to_string(), 1);
    }

    /// Count another failed attempt and return the new total.
    pub fn record_failure(&mut self, identifier: &str) -> Result<u32> {
        let attempts = self.attempts.get_mut(identifier).ok_or_else(|| {
            AppError::orchestration(format!(
                "identifier `{identifier}` was retried without a ledger entry"
            ))
        })?;
        *attempts += 1;
        Ok(*attempts)
    }

    pub fn attempts(&self, identifier: &str) -> Option<u32> {
        self.attempts.get(identifier).copied()
    }
}
