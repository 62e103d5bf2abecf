use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::employee::Employee;

/// Workflow state of a leave request. `Pending` is the only non-terminal state.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// What a manager can do with a pending request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl LeaveStatus {
    /// Transition table. `None` means the move is not allowed from this state.
    pub fn next(self, decision: Decision) -> Option<LeaveStatus> {
        match (self, decision) {
            (LeaveStatus::Pending, Decision::Approve) => Some(LeaveStatus::Approved),
            (LeaveStatus::Pending, Decision::Reject) => Some(LeaveStatus::Rejected),
            (LeaveStatus::Approved | LeaveStatus::Rejected, _) => None,
        }
    }

    /// Rejected requests no longer hold their slot in the calendar.
    pub fn blocks_calendar(self) -> bool {
        CALENDAR_BLOCKING.contains(&self)
    }
}

/// Statuses whose interval counts against new applications.
pub const CALENDAR_BLOCKING: [LeaveStatus; 2] = [LeaveStatus::Pending, LeaveStatus::Approved];

/// `[a_start, a_end)` and `[b_start, b_end)` share at least one day.
pub fn intervals_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    !(a_end <= b_start || a_start >= b_end)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
    pub approved_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        intervals_overlap(self.start_date, self.end_date, start, end)
    }

    /// Applies a manager decision in place.
    ///
    /// Checks run in a fixed order: self-action, then the transition table,
    /// then the rejection reason. Nothing is mutated unless every check passes.
    pub fn decide(
        &mut self,
        actor_id: u64,
        decision: Decision,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), LeaveError> {
        if self.employee_id == actor_id {
            return Err(LeaveError::SelfActionForbidden { action: decision });
        }

        let next = self
            .status
            .next(decision)
            .ok_or(LeaveError::InvalidStateTransition {
                action: decision,
                current: self.status,
            })?;

        let rejection_reason = match decision {
            Decision::Approve => None,
            Decision::Reject => {
                let reason = rejection_reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        LeaveError::ValidationFailed("Rejection reason is required".to_string())
                    })?;
                Some(reason.to_string())
            }
        };

        self.status = next;
        self.approved_by = Some(actor_id);
        self.approved_date = Some(now);
        self.rejection_reason = rejection_reason;
        self.updated_date = Some(now);
        Ok(())
    }
}

/// Leave request about to be inserted; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub created_date: DateTime<Utc>,
}

impl NewLeaveRequest {
    pub fn with_id(self, id: u64) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: self.employee_id,
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_date: None,
            rejection_reason: None,
            created_date: self.created_date,
            updated_date: None,
        }
    }
}

/// A leave request together with the employees it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveDetail {
    pub leave: LeaveRequest,
    pub employee: Option<Employee>,
    pub approver: Option<Employee>,
}

/// Manager-side listing filter.
#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
}
