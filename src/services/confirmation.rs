use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::time::primitive_now_utc;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories::{groups, submissions};

/// The two-phase confirmation ladder, decoded from the flat storage row.
/// Actor fields stay optional because users can be deleted out from under a
/// submission (`ON DELETE SET NULL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubmissionState {
    NotStarted,
    FirstClickDone {
        by: Option<String>,
        at: Option<PrimitiveDateTime>,
    },
    Confirmed {
        by: Option<String>,
        at: Option<PrimitiveDateTime>,
    },
}

impl SubmissionState {
    /// Rejects combinations the conditional updates can never produce, such
    /// as a confirmed status on an intermediate step.
    pub(crate) fn decode(row: &Submission) -> Result<Self, ConfirmError> {
        match (row.confirmation_step, row.status) {
            (0, SubmissionStatus::Pending) => Ok(Self::NotStarted),
            (1, SubmissionStatus::Pending) => Ok(Self::FirstClickDone {
                by: row.first_click_by.clone(),
                at: row.first_click_at,
            }),
            (2, SubmissionStatus::Confirmed) => Ok(Self::Confirmed {
                by: row.confirmed_by.clone(),
                at: row.confirmed_at,
            }),
            (step, status) => Err(ConfirmError::Inconsistent { step, status }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfirmError {
    #[error("user is not a member of this group")]
    NotMember,
    #[error("first confirmation was already given (step {current_step})")]
    AlreadyPastFirstStep { current_step: i32 },
    #[error("first confirmation step has not been completed yet")]
    FirstStepRequired,
    #[error("submission is already fully confirmed")]
    AlreadyConfirmed,
    #[error("submission state changed concurrently, re-fetch and try again")]
    StateChanged,
    #[error("submission row has step {step} with status {status:?}")]
    Inconsistent { step: i32, status: SubmissionStatus },
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// First confirmation click. Creates the tracking row on first contact and
/// advances it 0 -> 1 with a compare-and-set, so under concurrent clicks
/// from group mates exactly one caller wins.
pub(crate) async fn confirm_first_step(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
    user_id: &str,
) -> Result<Submission, ConfirmError> {
    if !groups::is_member(pool, group_id, user_id).await? {
        return Err(ConfirmError::NotMember);
    }

    let submission = submissions::ensure_exists(pool, assignment_id, group_id).await?;
    let now = primitive_now_utc();

    match submissions::first_step(pool, &submission.id, user_id, now).await? {
        Some(updated) => Ok(updated),
        None => {
            // Lost the race or the step was already taken; report the step
            // the row actually sits at.
            let current =
                submissions::find_by_pair(pool, assignment_id, group_id).await?;
            let current_step =
                current.map(|row| row.confirmation_step).unwrap_or(submission.confirmation_step);
            Err(ConfirmError::AlreadyPastFirstStep { current_step })
        }
    }
}

/// Final confirmation click, 1 -> 2. Requires the first step to already be
/// recorded; never creates a row.
pub(crate) async fn confirm_final_step(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
    user_id: &str,
) -> Result<Submission, ConfirmError> {
    if !groups::is_member(pool, group_id, user_id).await? {
        return Err(ConfirmError::NotMember);
    }

    let Some(submission) = submissions::find_by_pair(pool, assignment_id, group_id).await?
    else {
        return Err(ConfirmError::FirstStepRequired);
    };

    let now = primitive_now_utc();
    match submissions::final_step(pool, &submission.id, user_id, now).await? {
        Some(updated) => Ok(updated),
        None => {
            let current = submissions::find_by_pair(pool, assignment_id, group_id)
                .await?
                .unwrap_or(submission);
            Err(final_step_conflict(SubmissionState::decode(&current)?))
        }
    }
}

/// Decides what to report when the step-2 conditional update found its
/// precondition false. A re-read that still shows step 1 means the row
/// changed and changed back between the update and the read (a reset landed
/// in the gap), so the caller must re-fetch and try again.
fn final_step_conflict(state: SubmissionState) -> ConfirmError {
    match state {
        SubmissionState::NotStarted => ConfirmError::FirstStepRequired,
        SubmissionState::Confirmed { .. } => ConfirmError::AlreadyConfirmed,
        SubmissionState::FirstClickDone { .. } => ConfirmError::StateChanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(step: i32, status: SubmissionStatus) -> Submission {
        Submission {
            id: "sub-1".into(),
            assignment_id: "a-1".into(),
            group_id: "g-1".into(),
            status,
            confirmation_step: step,
            first_click_by: (step >= 1).then(|| "u-1".to_owned()),
            first_click_at: (step >= 1).then(|| datetime!(2026-03-01 10:00)),
            confirmed_by: (step == 2).then(|| "u-2".to_owned()),
            confirmed_at: (step == 2).then(|| datetime!(2026-03-01 11:00)),
        }
    }

    #[test]
    fn decodes_each_ladder_rung() {
        assert_eq!(
            SubmissionState::decode(&row(0, SubmissionStatus::Pending)).unwrap(),
            SubmissionState::NotStarted
        );
        assert!(matches!(
            SubmissionState::decode(&row(1, SubmissionStatus::Pending)).unwrap(),
            SubmissionState::FirstClickDone { by: Some(_), at: Some(_) }
        ));
        assert!(matches!(
            SubmissionState::decode(&row(2, SubmissionStatus::Confirmed)).unwrap(),
            SubmissionState::Confirmed { by: Some(_), at: Some(_) }
        ));
    }

    #[test]
    fn rejects_confirmed_status_before_final_step() {
        let mut bad = row(1, SubmissionStatus::Pending);
        bad.status = SubmissionStatus::Confirmed;
        assert!(matches!(
            SubmissionState::decode(&bad),
            Err(ConfirmError::Inconsistent { step: 1, .. })
        ));
    }

    #[test]
    fn rejects_pending_status_on_final_step() {
        let mut bad = row(2, SubmissionStatus::Confirmed);
        bad.status = SubmissionStatus::Pending;
        assert!(matches!(
            SubmissionState::decode(&bad),
            Err(ConfirmError::Inconsistent { step: 2, .. })
        ));
    }

    #[test]
    fn lost_final_step_maps_to_the_observed_state() {
        assert!(matches!(
            final_step_conflict(SubmissionState::NotStarted),
            ConfirmError::FirstStepRequired
        ));
        assert!(matches!(
            final_step_conflict(SubmissionState::Confirmed { by: None, at: None }),
            ConfirmError::AlreadyConfirmed
        ));
        // Still at step 1 after a lost update: a reset slipped in between,
        // so the caller retries instead of being told it is confirmed.
        assert!(matches!(
            final_step_conflict(SubmissionState::FirstClickDone { by: None, at: None }),
            ConfirmError::StateChanged
        ));
    }

    #[test]
    fn tolerates_missing_actor_after_user_deletion() {
        let mut orphaned = row(1, SubmissionStatus::Pending);
        orphaned.first_click_by = None;
        assert!(matches!(
            SubmissionState::decode(&orphaned).unwrap(),
            SubmissionState::FirstClickDone { by: None, .. }
        ));
    }
}
