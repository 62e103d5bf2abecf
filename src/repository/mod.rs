//! Storage ports used by the directory and the leave engine.
//!
//! Every read-then-write sequence of the engine runs inside one
//! [`LeaveTransaction`]. Adapters must guarantee that two transactions
//! touching the same employee or the same leave row are serialized: MySQL
//! through row locks, the in-memory store through a store-wide mutex.

pub mod in_memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::model::employee::{Employee, NewEmployee};
use crate::model::leave_request::{
    LeaveDetail, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};

pub use in_memory::InMemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// `email` is expected to be normalized already.
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is already taken.
    async fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, StoreError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError>;

    async fn find_leave_by_id(&self, id: u64) -> Result<Option<LeaveDetail>, StoreError>;

    /// Newest first.
    async fn list_leaves_by_employee(&self, employee_id: u64)
    -> Result<Vec<LeaveDetail>, StoreError>;

    /// Earliest start first.
    async fn list_pending_leaves(&self) -> Result<Vec<LeaveDetail>, StoreError>;

    /// Newest first, one page, together with the total number of matches.
    async fn list_leaves(
        &self,
        query: &LeaveQuery,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<LeaveDetail>, u64), StoreError>;

    /// Returns `false` when nothing was deleted.
    async fn delete_leave(&self, id: u64) -> Result<bool, StoreError>;
}

/// Unit of work over leave rows. Dropping it without [`commit`] rolls back.
///
/// [`commit`]: LeaveTransaction::commit
#[async_trait]
pub trait LeaveTransaction: Send {
    /// Serializes concurrent writers for one employee until commit.
    async fn lock_employee(&mut self, employee_id: u64) -> Result<(), StoreError>;

    /// Reads the leave row and locks it until commit.
    async fn find_leave_by_id(&mut self, id: u64) -> Result<Option<LeaveDetail>, StoreError>;

    /// Calendar-blocking leaves of `employee_id` intersecting `[start, end)`.
    async fn find_overlapping_leaves(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, StoreError>;

    async fn insert_leave(&mut self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError>;

    /// Writes the decision fields of `leave` if the stored status still equals
    /// `expected`, otherwise fails with [`StoreError::Conflict`].
    async fn update_leave(
        &mut self,
        leave: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
