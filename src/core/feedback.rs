//! Fixed symmetric reward schedule and the feedback shown after each trial.

use std::fmt;

use serde::Serialize;

use crate::response::TrialOutcome;
use crate::surface::Rgb;

/// Running total in minor currency units (1/100), so repeated ±0.20 steps
/// never drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Balance(i64);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    pub fn from_units(units: i64) -> Self {
        Self(units)
    }

    fn offset(self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSchedule {
    pub units: i64,
    pub currency: String,
}

impl RewardSchedule {
    pub fn new(units: i64, currency: impl Into<String>) -> Self {
        Self {
            units,
            currency: currency.into(),
        }
    }

    fn amount(&self) -> String {
        format!("{} {}", Balance::from_units(self.units), self.currency)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub balance: Balance,
    pub message: String,
    pub color: Rgb,
}

/// Timeout and wrong answers cost one step, a correct answer earns one.
pub fn apply(outcome: &TrialOutcome, balance: Balance, schedule: &RewardSchedule) -> Feedback {
    if outcome.is_timeout() {
        Feedback {
            balance: balance.offset(-schedule.units),
            message: "Time's up!".to_owned(),
            color: Rgb::RED,
        }
    } else if outcome.is_correct {
        Feedback {
            balance: balance.offset(schedule.units),
            message: format!("Correct! You earned {}.", schedule.amount()),
            color: Rgb::GREEN,
        }
    } else {
        Feedback {
            balance: balance.offset(-schedule.units),
            message: format!("Wrong! You lost {}.", schedule.amount()),
            color: Rgb::RED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Selection;
    use crate::stimuli::{ImageId, Side};
    use std::time::Duration;

    fn schedule() -> RewardSchedule {
        RewardSchedule::new(20, "TL")
    }

    fn chosen(is_correct: bool) -> TrialOutcome {
        TrialOutcome {
            selection: Selection::Chosen {
                image: ImageId::from_label("A"),
                side: Side::Left,
                reaction_time: Duration::from_millis(300),
            },
            is_correct,
        }
    }

    #[test]
    fn correct_earns_one_step() {
        let fb = apply(&chosen(true), Balance::ZERO, &schedule());
        assert_eq!(fb.balance, Balance::from_units(20));
        assert_eq!(fb.color, Rgb::GREEN);
        assert_eq!(fb.message, "Correct! You earned 0.20 TL.");
    }

    #[test]
    fn wrong_and_timeout_cost_one_step() {
        let fb = apply(&chosen(false), Balance::ZERO, &schedule());
        assert_eq!(fb.balance, Balance::from_units(-20));
        assert_eq!(fb.color, Rgb::RED);

        let fb = apply(&TrialOutcome::timeout(), Balance::from_units(100), &schedule());
        assert_eq!(fb.balance, Balance::from_units(80));
        assert_eq!(fb.message, "Time's up!");
        assert_eq!(fb.color, Rgb::RED);
    }

    #[test]
    fn correct_then_wrong_is_balance_neutral() {
        let start = Balance::from_units(140);
        let after_correct = apply(&chosen(true), start, &schedule()).balance;
        let after_wrong = apply(&chosen(false), after_correct, &schedule()).balance;
        assert_eq!(after_wrong, start);
    }

    #[test]
    fn balance_formats_with_two_decimals() {
        assert_eq!(Balance::from_units(0).to_string(), "0.00");
        assert_eq!(Balance::from_units(120).to_string(), "1.20");
        assert_eq!(Balance::from_units(-20).to_string(), "-0.20");
        assert_eq!(Balance::from_units(-1405).to_string(), "-14.05");
    }
}
