//! Capability checks for job operations.
//!
//! Every ownership-vs-admin decision goes through [`check`] so the guard
//! logic stays uniform and testable in isolation from the HTTP layer.

use uuid::Uuid;

use super::Identity;
use crate::error::{AppError, AppResult, PolicyViolation};
use crate::models::JobStatus;

/// Right required to perform an operation on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Right {
    /// Mark a completed job as physically collected.
    Collect,
    /// Confirm presence for a job (or its batch).
    Confirm,
    /// Remove a job from the system.
    Delete,
    /// Admin-only operations (status overrides, payment, skip, reassignment).
    Administer,
}

/// Check whether `actor` may exercise `right` on a job owned by `owner_id`
/// in state `status`.
///
/// Admins hold every right. Owners may collect, confirm, and delete their
/// own jobs, except that a printing job cannot be deleted by its owner.
pub fn check(actor: &Identity, owner_id: Uuid, status: JobStatus, right: Right) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    match right {
        Right::Administer => Err(AppError::Unauthorized(
            "Admin role required for this operation".to_string(),
        )),
        Right::Collect | Right::Confirm => {
            if actor.user_id == owner_id {
                Ok(())
            } else {
                Err(AppError::Unauthorized(
                    "Not authorized to update this job".to_string(),
                ))
            }
        }
        Right::Delete => {
            if actor.user_id != owner_id {
                return Err(AppError::Unauthorized(
                    "Not authorized to delete this job".to_string(),
                ));
            }
            if status == JobStatus::Printing {
                return Err(AppError::Policy(PolicyViolation::PrintingLocked));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn user(id: Uuid) -> Identity {
        Identity {
            user_id: id,
            role: Role::User,
        }
    }

    fn admin() -> Identity {
        Identity {
            user_id: Uuid::nil(),
            role: Role::Admin,
        }
    }

    #[test]
    fn admin_holds_every_right() {
        let owner = Uuid::now_v7();
        for right in [Right::Collect, Right::Confirm, Right::Delete, Right::Administer] {
            assert!(check(&admin(), owner, JobStatus::Printing, right).is_ok());
        }
    }

    #[test]
    fn owner_may_delete_non_printing_job() {
        let owner = Uuid::now_v7();
        assert!(check(&user(owner), owner, JobStatus::Pending, Right::Delete).is_ok());
        assert!(check(&user(owner), owner, JobStatus::Completed, Right::Delete).is_ok());
    }

    #[test]
    fn owner_cannot_delete_printing_job() {
        let owner = Uuid::now_v7();
        let err = check(&user(owner), owner, JobStatus::Printing, Right::Delete).unwrap_err();
        assert!(matches!(
            err,
            AppError::Policy(PolicyViolation::PrintingLocked)
        ));
    }

    #[test]
    fn stranger_cannot_collect() {
        let owner = Uuid::now_v7();
        let other = Uuid::now_v7();
        let err = check(&user(other), owner, JobStatus::Completed, Right::Collect).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn user_never_holds_administer() {
        let id = Uuid::now_v7();
        let err = check(&user(id), id, JobStatus::Pending, Right::Administer).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
