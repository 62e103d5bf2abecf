use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tracing::{debug, info, instrument};

use super::directory::EmployeeDirectory;
use crate::auth::auth::AuthUser;
use crate::error::{LeaveError, StoreError};
use crate::model::leave_request::{
    Decision, LeaveDetail, LeaveQuery, NewLeaveRequest,
};
use crate::repository::LeaveRepository;

pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone)]
pub struct ApplyLeave {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LeavePage {
    pub data: Vec<LeaveDetail>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

// Inside an apply, a storage conflict means a concurrent writer claimed the slot.
fn overlap_on_conflict(e: StoreError) -> LeaveError {
    match e {
        StoreError::Conflict => LeaveError::OverlappingRequest,
        other => other.into(),
    }
}

// The lock target is the employee row; a missing row means the employee is gone.
fn lock_error(e: StoreError) -> LeaveError {
    match e {
        StoreError::NotFound => LeaveError::EmployeeNotFound,
        other => overlap_on_conflict(other),
    }
}

// Timestamp columns keep microseconds.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The leave lifecycle engine.
///
/// Owns every state transition of a leave request and the overlap rule. Role
/// checks happen at the HTTP boundary; the self-action rule is enforced here
/// for every caller.
#[derive(Clone)]
pub struct LeaveService {
    leaves: Arc<dyn LeaveRepository>,
    directory: EmployeeDirectory,
}

impl LeaveService {
    pub fn new(leaves: Arc<dyn LeaveRepository>, directory: EmployeeDirectory) -> Self {
        Self { leaves, directory }
    }

    pub fn directory(&self) -> &EmployeeDirectory {
        &self.directory
    }

    /// Submits a pending leave request for the calling principal.
    ///
    /// The overlap check and the insert run in one transaction holding the
    /// employee lock, so two concurrent applies for the same employee cannot
    /// both claim overlapping days.
    #[instrument(
        name = "apply_leave",
        skip(self, principal, request),
        fields(user_id = principal.user_id, start = %request.start_date, end = %request.end_date)
    )]
    pub async fn apply_leave(
        &self,
        principal: &AuthUser,
        request: ApplyLeave,
    ) -> Result<LeaveDetail, LeaveError> {
        if request.start_date >= request.end_date {
            debug!("Refused apply: start date not before end date");
            return Err(LeaveError::InvalidRange);
        }

        let employee = self.directory.resolve_or_provision(principal).await?.employee;

        let mut tx = self.leaves.begin().await?;
        tx.lock_employee(employee.id).await.map_err(lock_error)?;

        let overlapping = tx
            .find_overlapping_leaves(employee.id, request.start_date, request.end_date)
            .await
            .map_err(overlap_on_conflict)?;
        if let Some(existing) = overlapping.first() {
            debug!(existing_leave_id = existing.id, "Refused apply: overlapping leave");
            return Err(LeaveError::OverlappingRequest);
        }

        let leave = tx
            .insert_leave(NewLeaveRequest {
                employee_id: employee.id,
                start_date: request.start_date,
                end_date: request.end_date,
                reason: request.reason,
                created_date: now(),
            })
            .await
            .map_err(overlap_on_conflict)?;
        tx.commit().await.map_err(overlap_on_conflict)?;

        info!(leave_id = leave.id, employee_id = employee.id, "Leave applied");

        Ok(LeaveDetail {
            leave,
            employee: Some(employee),
            approver: None,
        })
    }

    #[instrument(name = "approve_leave", skip(self, actor), fields(user_id = actor.user_id))]
    pub async fn approve_leave(
        &self,
        leave_id: u64,
        actor: &AuthUser,
    ) -> Result<LeaveDetail, LeaveError> {
        self.decide(leave_id, actor, Decision::Approve, None).await
    }

    #[instrument(name = "reject_leave", skip(self, actor, rejection_reason), fields(user_id = actor.user_id))]
    pub async fn reject_leave(
        &self,
        leave_id: u64,
        actor: &AuthUser,
        rejection_reason: &str,
    ) -> Result<LeaveDetail, LeaveError> {
        self.decide(leave_id, actor, Decision::Reject, Some(rejection_reason))
            .await
    }

    // Read, check and write happen under the row lock of one transaction; the
    // update is additionally guarded by the status that was read.
    async fn decide(
        &self,
        leave_id: u64,
        actor: &AuthUser,
        decision: Decision,
        rejection_reason: Option<&str>,
    ) -> Result<LeaveDetail, LeaveError> {
        let actor = self.directory.resolve_or_provision(actor).await?.employee;

        let mut tx = self.leaves.begin().await?;
        let mut detail = tx
            .find_leave_by_id(leave_id)
            .await?
            .ok_or(LeaveError::NotFound)?;

        let read_status = detail.leave.status;
        if let Err(e) = detail
            .leave
            .decide(actor.id, decision, rejection_reason, now())
        {
            debug!(error = %e, "Refused decision");
            return Err(e);
        }

        tx.update_leave(&detail.leave, read_status).await?;
        tx.commit().await?;

        info!(
            leave_id,
            approver_id = actor.id,
            status = %detail.leave.status,
            "Leave decided"
        );

        detail.approver = Some(actor);
        Ok(detail)
    }

    /// All requests of the calling principal, newest first.
    ///
    /// A principal that cannot be provisioned simply has no leaves.
    #[instrument(name = "my_leaves", skip(self, principal), fields(user_id = principal.user_id))]
    pub async fn get_my_leaves(&self, principal: &AuthUser) -> Result<Vec<LeaveDetail>, LeaveError> {
        let employee = match self.directory.resolve_or_provision(principal).await {
            Ok(provisioned) => provisioned.employee,
            Err(LeaveError::EmployeeNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(self.leaves.list_leaves_by_employee(employee.id).await?)
    }

    /// Pending requests, earliest start first.
    pub async fn get_pending_leaves(&self) -> Result<Vec<LeaveDetail>, LeaveError> {
        Ok(self.leaves.list_pending_leaves().await?)
    }

    /// Managers see every request, everybody else only their own.
    pub async fn get_leave(
        &self,
        leave_id: u64,
        principal: &AuthUser,
    ) -> Result<LeaveDetail, LeaveError> {
        let detail = self
            .leaves
            .find_leave_by_id(leave_id)
            .await?
            .ok_or(LeaveError::NotFound)?;

        if principal.role.is_manager() {
            return Ok(detail);
        }

        let employee = self.directory.resolve_or_provision(principal).await?.employee;
        if detail.leave.employee_id != employee.id {
            return Err(LeaveError::AccessDenied);
        }
        Ok(detail)
    }

    pub async fn list_leaves(
        &self,
        query: &LeaveQuery,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<LeavePage, LeaveError> {
        let per_page = per_page.unwrap_or(10).clamp(1, MAX_PER_PAGE);
        let page = page.unwrap_or(1).max(1);
        let offset = (page - 1).saturating_mul(per_page);

        let (data, total) = self.leaves.list_leaves(query, per_page, offset).await?;
        Ok(LeavePage {
            data,
            page,
            per_page,
            total,
        })
    }

    #[instrument(name = "delete_leave", skip(self))]
    pub async fn delete_leave(&self, leave_id: u64) -> Result<(), LeaveError> {
        if !self.leaves.delete_leave(leave_id).await? {
            return Err(LeaveError::NotFound);
        }
        info!(leave_id, "Leave deleted");
        Ok(())
    }
}
