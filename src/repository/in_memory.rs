// In-memory repository.
//
// Used by the test suites and for running the service without a database.
// A transaction takes the store-wide lock on `begin` and keeps it until it is
// committed or dropped, so transactions are fully serialized. Writes go to a
// staged copy of the state that replaces the shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{EmployeeRepository, LeaveRepository, LeaveTransaction};
use crate::error::StoreError;
use crate::model::employee::{Employee, NewEmployee};
use crate::model::leave_request::{
    LeaveDetail, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};

#[derive(Debug, Clone, Default)]
struct State {
    employees: BTreeMap<u64, Employee>,
    leaves: BTreeMap<u64, LeaveRequest>,
    last_employee_id: u64,
    last_leave_id: u64,
}

impl State {
    fn detail(&self, leave: &LeaveRequest) -> LeaveDetail {
        LeaveDetail {
            leave: leave.clone(),
            employee: self.employees.get(&leave.employee_id).cloned(),
            approver: leave
                .approved_by
                .and_then(|id| self.employees.get(&id).cloned()),
        }
    }

    fn details<'a>(&self, leaves: impl Iterator<Item = &'a LeaveRequest>) -> Vec<LeaveDetail> {
        leaves.map(|leave| self.detail(leave)).collect()
    }
}

fn newest_first(a: &&LeaveRequest, b: &&LeaveRequest) -> std::cmp::Ordering {
    b.created_date
        .cmp(&a.created_date)
        .then_with(|| b.id.cmp(&a.id))
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryStore {
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state
            .employees
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if state.employees.values().any(|e| e.email == employee.email) {
            return Err(StoreError::Conflict);
        }

        state.last_employee_id += 1;
        let created = Employee {
            id: state.last_employee_id,
            name: employee.name,
            email: employee.email,
        };
        state.employees.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl LeaveRepository for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError> {
        self.ensure_online()?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn find_leave_by_id(&self, id: u64) -> Result<Option<LeaveDetail>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state.leaves.get(&id).map(|leave| state.detail(leave)))
    }

    async fn list_leaves_by_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveDetail>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut leaves: Vec<&LeaveRequest> = state
            .leaves
            .values()
            .filter(|l| l.employee_id == employee_id)
            .collect();
        leaves.sort_by(newest_first);
        Ok(state.details(leaves.into_iter()))
    }

    async fn list_pending_leaves(&self) -> Result<Vec<LeaveDetail>, StoreError> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut leaves: Vec<&LeaveRequest> = state
            .leaves
            .values()
            .filter(|l| l.status == LeaveStatus::Pending)
            .collect();
        leaves.sort_by_key(|l| (l.start_date, l.id));
        Ok(state.details(leaves.into_iter()))
    }

    async fn list_leaves(
        &self,
        query: &LeaveQuery,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<LeaveDetail>, u64), StoreError> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut leaves: Vec<&LeaveRequest> = state
            .leaves
            .values()
            .filter(|l| query.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| query.status.is_none_or(|status| l.status == status))
            .collect();
        leaves.sort_by(newest_first);

        let total = leaves.len() as u64;
        let page = leaves
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize);
        Ok((state.details(page), total))
    }

    async fn delete_leave(&self, id: u64) -> Result<bool, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        Ok(state.leaves.remove(&id).is_some())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl LeaveTransaction for InMemoryTransaction {
    async fn lock_employee(&mut self, employee_id: u64) -> Result<(), StoreError> {
        // The store-wide guard already serializes writers; only check existence.
        if self.staged.employees.contains_key(&employee_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn find_leave_by_id(&mut self, id: u64) -> Result<Option<LeaveDetail>, StoreError> {
        Ok(self
            .staged
            .leaves
            .get(&id)
            .map(|leave| self.staged.detail(leave)))
    }

    async fn find_overlapping_leaves(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        Ok(self
            .staged
            .leaves
            .values()
            .filter(|l| l.employee_id == employee_id && l.status.blocks_calendar())
            .filter(|l| l.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn insert_leave(&mut self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        self.staged.last_leave_id += 1;
        let created = leave.with_id(self.staged.last_leave_id);
        self.staged.leaves.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_leave(
        &mut self,
        leave: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<(), StoreError> {
        match self.staged.leaves.get_mut(&leave.id) {
            Some(stored) if stored.status == expected => {
                *stored = leave.clone();
                Ok(())
            }
            _ => Err(StoreError::Conflict),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    async fn seed_employee(store: &InMemoryStore, email: &str) -> Employee {
        store
            .insert_employee(NewEmployee {
                name: email.to_string(),
                email: email.to_string(),
            })
            .await
            .unwrap()
    }

    fn new_leave(employee_id: u64, start: NaiveDate, end: NaiveDate) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id,
            start_date: start,
            end_date: end,
            reason: "holiday".to_string(),
            created_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let employee = seed_employee(&store, "e@corp.test").await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_leave(new_leave(employee.id, date(6, 1), date(6, 5)))
                .await
                .unwrap();
        }

        let leaves = store.list_leaves_by_employee(employee.id).await.unwrap();
        assert!(leaves.is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let employee = seed_employee(&store, "e@corp.test").await;

        let mut tx = store.begin().await.unwrap();
        let leave = tx
            .insert_leave(new_leave(employee.id, date(6, 1), date(6, 5)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let found = store.find_leave_by_id(leave.id).await.unwrap().unwrap();
        assert_eq!(found.leave, leave);
        assert_eq!(found.employee, Some(employee));
    }

    #[tokio::test]
    async fn update_fails_when_status_moved_on() {
        let store = InMemoryStore::new();
        let employee = seed_employee(&store, "e@corp.test").await;

        let mut tx = store.begin().await.unwrap();
        let mut leave = tx
            .insert_leave(new_leave(employee.id, date(6, 1), date(6, 5)))
            .await
            .unwrap();
        leave.status = LeaveStatus::Approved;
        tx.update_leave(&leave, LeaveStatus::Pending).await.unwrap();

        let err = tx
            .update_leave(&leave, LeaveStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn overlap_lookup_skips_rejected_leaves() {
        let store = InMemoryStore::new();
        let employee = seed_employee(&store, "e@corp.test").await;

        let mut tx = store.begin().await.unwrap();
        let mut rejected = tx
            .insert_leave(new_leave(employee.id, date(6, 1), date(6, 5)))
            .await
            .unwrap();
        rejected.status = LeaveStatus::Rejected;
        tx.update_leave(&rejected, LeaveStatus::Pending).await.unwrap();
        let mut approved = tx
            .insert_leave(new_leave(employee.id, date(6, 3), date(6, 8)))
            .await
            .unwrap();
        approved.status = LeaveStatus::Approved;
        tx.update_leave(&approved, LeaveStatus::Pending).await.unwrap();
        let pending = tx
            .insert_leave(new_leave(employee.id, date(6, 8), date(6, 9)))
            .await
            .unwrap();

        let mut ids: Vec<u64> = tx
            .find_overlapping_leaves(employee.id, date(6, 1), date(6, 10))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![approved.id, pending.id]);
    }

    #[tokio::test]
    async fn locking_unknown_employee_is_not_found() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let err = tx.lock_employee(999).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = InMemoryStore::new();
        seed_employee(&store, "e@corp.test").await;

        let err = store
            .insert_employee(NewEmployee {
                name: "other".to_string(),
                email: "e@corp.test".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = InMemoryStore::new();
        store.set_offline(true);

        let err = store.list_pending_leaves().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
