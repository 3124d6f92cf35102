//! Purchase policy knobs.
//!
//! The hold duration is deliberately configuration, not a constant: the
//! window a buyer gets to complete a PIX payment is an operational decision.

use chrono::Duration;

/// Policy for purchases and reservation holds.
#[derive(Clone, Debug)]
pub struct PurchaseRules {
    /// Quantities a single purchase may request
    pub allowed_increments: Vec<u32>,
    /// How long reserved numbers are held pending payment
    pub hold_window: Duration,
    /// How many times the allocator re-reads and retries after a conflict
    pub max_reserve_attempts: u32,
    /// Upper bound on slots/payments processed per sweep pass
    pub sweep_batch: u32,
}

impl PurchaseRules {
    /// Build rules with the given hold window in minutes, keeping the
    /// remaining defaults.
    #[must_use]
    pub fn with_hold_minutes(minutes: i64) -> Self {
        Self {
            hold_window: Duration::minutes(minutes),
            ..Self::default()
        }
    }

    /// Whether `quantity` is one of the allowed purchase increments.
    #[must_use]
    pub fn allows_quantity(&self, quantity: u32) -> bool {
        self.allowed_increments.contains(&quantity)
    }
}

impl Default for PurchaseRules {
    fn default() -> Self {
        Self {
            allowed_increments: vec![1, 5, 10, 20],
            hold_window: Duration::minutes(30),
            max_reserve_attempts: 3,
            sweep_batch: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_increments_match_policy() {
        let rules = PurchaseRules::default();
        for quantity in [1, 5, 10, 20] {
            assert!(rules.allows_quantity(quantity));
        }
        for quantity in [0, 2, 3, 7, 15, 21] {
            assert!(!rules.allows_quantity(quantity));
        }
    }

    #[test]
    fn hold_minutes_override() {
        let rules = PurchaseRules::with_hold_minutes(10);
        assert_eq!(rules.hold_window, Duration::minutes(10));
        assert_eq!(rules.max_reserve_attempts, 3);
    }
}
