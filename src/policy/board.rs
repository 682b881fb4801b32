//! Bulletin-board rules: publication windows and the on/off toggle that derives a
//! bulletin from a bitácora or an incidencia.

use chrono::{Duration, NaiveDate};

use crate::error::ApiError;

/// Length of the publication window given to derived bulletins.
pub const DERIVED_WINDOW_DAYS: i64 = 30;

/// Reject windows whose start falls after their end.
pub fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::bad_request(
            "La fecha de inicio de publicación no puede ser posterior a la fecha de fin",
        ));
    }
    Ok(())
}

/// Window for a bulletin derived today.
pub fn derived_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(DERIVED_WINDOW_DAYS))
}

/// Writes needed to bring an origin record to the requested board state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardPlan {
    pub insert_bulletin: bool,
    pub delete_bulletin: bool,
    pub set_flag: Option<bool>,
}

impl BoardPlan {
    pub fn is_noop(&self) -> bool {
        !self.insert_bulletin && !self.delete_bulletin && self.set_flag.is_none()
    }
}

/// Plan the toggle from the origin's current `en_cartelera` flag, whether a
/// derived bulletin already exists, and the desired state. Applying the plan
/// twice is the same as applying it once.
pub fn plan_toggle(on_board: bool, bulletin_exists: bool, want_on: bool) -> BoardPlan {
    if want_on {
        BoardPlan {
            insert_bulletin: !bulletin_exists,
            delete_bulletin: false,
            set_flag: (!on_board).then_some(true),
        }
    } else {
        BoardPlan {
            insert_bulletin: false,
            delete_bulletin: bulletin_exists,
            set_flag: on_board.then_some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Origin {
        flag: bool,
        bulletins: usize,
    }

    impl Origin {
        fn toggle(&mut self, want_on: bool) {
            let plan = plan_toggle(self.flag, self.bulletins > 0, want_on);
            if plan.insert_bulletin {
                self.bulletins += 1;
            }
            if plan.delete_bulletin {
                self.bulletins = 0;
            }
            if let Some(flag) = plan.set_flag {
                self.flag = flag;
            }
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn start_after_end_is_rejected() {
        let err = validate_window(date("2025-06-10"), date("2025-06-01")).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(validate_window(date("2025-06-01"), date("2025-06-01")).is_ok());
        assert!(validate_window(date("2025-06-01"), date("2025-06-10")).is_ok());
    }

    #[test]
    fn any_inverted_window_is_rejected() {
        let base = date("2025-01-01");
        for gap in 1..=90 {
            let end = base + Duration::days(gap);
            assert!(validate_window(end, base).is_err());
            assert!(validate_window(base, end).is_ok());
        }
    }

    #[test]
    fn derived_window_spans_thirty_days() {
        let (start, end) = derived_window(date("2025-06-10"));
        assert_eq!(start, date("2025-06-10"));
        assert_eq!(end, date("2025-07-10"));
    }

    #[test]
    fn putting_on_twice_leaves_one_bulletin() {
        let mut origin = Origin { flag: false, bulletins: 0 };
        origin.toggle(true);
        origin.toggle(true);
        assert_eq!(origin, Origin { flag: true, bulletins: 1 });
        assert!(plan_toggle(true, true, true).is_noop());
    }

    #[test]
    fn off_on_off_restores_original_state() {
        let original = Origin { flag: false, bulletins: 0 };
        let mut origin = original;
        origin.toggle(false);
        origin.toggle(true);
        origin.toggle(false);
        assert_eq!(origin, original);
    }

    #[test]
    fn repairs_flag_without_bulletin() {
        let plan = plan_toggle(true, false, true);
        assert!(plan.insert_bulletin);
        assert_eq!(plan.set_flag, None);

        let plan = plan_toggle(false, true, false);
        assert!(plan.delete_bulletin);
        assert_eq!(plan.set_flag, None);
    }
}
