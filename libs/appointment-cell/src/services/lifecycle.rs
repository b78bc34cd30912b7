// libs/appointment-cell/src/services/lifecycle.rs
use tracing::warn;

use crate::models::{AppointmentError, AppointmentStatus};

/// Pure status transition engine. The closed transition table is the single
/// source of truth; every status write in the cell passes through
/// `validate_transition` before it reaches the repository.
pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Valid next statuses for a given current status. Terminal statuses
    /// return an empty slice.
    pub fn allowed_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
        match from {
            AppointmentStatus::Pending => &[
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Missed,
            ],
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Missed,
            ],
            AppointmentStatus::InProgress => &[AppointmentStatus::Completed],
            AppointmentStatus::Rescheduled => &[AppointmentStatus::Scheduled],
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Missed => &[],
        }
    }

    pub fn validate_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if Self::allowed_transitions(from).contains(&to) {
            Ok(())
        } else {
            warn!(%from, %to, "rejected status transition");
            Err(AppointmentError::InvalidTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use AppointmentStatus::*;

    #[test]
    fn pending_can_be_confirmed_cancelled_or_missed() {
        assert!(LifecycleEngine::validate_transition(Pending, Scheduled).is_ok());
        assert!(LifecycleEngine::validate_transition(Pending, Cancelled).is_ok());
        assert!(LifecycleEngine::validate_transition(Pending, Missed).is_ok());
        assert_matches!(
            LifecycleEngine::validate_transition(Pending, Completed),
            Err(AppointmentError::InvalidTransition { .. })
        );
    }

    #[test]
    fn scheduled_fan_out() {
        for to in [InProgress, Cancelled, Rescheduled, Missed] {
            assert!(LifecycleEngine::validate_transition(Scheduled, to).is_ok());
        }
        assert_matches!(
            LifecycleEngine::validate_transition(Scheduled, Completed),
            Err(AppointmentError::InvalidTransition { .. })
        );
    }

    #[test]
    fn in_progress_only_completes() {
        assert!(LifecycleEngine::validate_transition(InProgress, Completed).is_ok());
        for to in [Cancelled, Missed, Scheduled, Rescheduled, Pending] {
            assert_matches!(
                LifecycleEngine::validate_transition(InProgress, to),
                Err(AppointmentError::InvalidTransition { .. })
            );
        }
    }

    #[test]
    fn rescheduled_only_returns_to_scheduled() {
        assert!(LifecycleEngine::validate_transition(Rescheduled, Scheduled).is_ok());
        assert_matches!(
            LifecycleEngine::validate_transition(Rescheduled, Cancelled),
            Err(AppointmentError::InvalidTransition { .. })
        );
    }

    #[test]
    fn terminal_statuses_admit_nothing() {
        for from in [Completed, Cancelled, Missed] {
            assert!(LifecycleEngine::allowed_transitions(from).is_empty());
            for to in [Pending, Scheduled, InProgress, Completed, Cancelled, Rescheduled, Missed] {
                assert_matches!(
                    LifecycleEngine::validate_transition(from, to),
                    Err(AppointmentError::InvalidTransition { .. })
                );
            }
        }
    }
}
