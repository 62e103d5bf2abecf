#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use leave_management::auth::auth::AuthUser;
use leave_management::model::role::Role;
use leave_management::repository::InMemoryStore;
use leave_management::service::{ApplyLeave, EmployeeDirectory, LeaveService};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn employee(user_id: u64, username: &str) -> AuthUser {
    AuthUser {
        user_id,
        username: username.to_string(),
        email: format!("{username}@corp.test"),
        role: Role::Employee,
    }
}

pub fn manager(user_id: u64, username: &str) -> AuthUser {
    AuthUser {
        role: Role::Manager,
        ..employee(user_id, username)
    }
}

pub fn apply(start: NaiveDate, end: NaiveDate) -> ApplyLeave {
    ApplyLeave {
        start_date: start,
        end_date: end,
        reason: "vacation".to_string(),
    }
}

pub fn service_over(store: &InMemoryStore) -> LeaveService {
    let store = Arc::new(store.clone());
    let directory = EmployeeDirectory::new(store.clone(), 1_000, Duration::from_secs(60));
    LeaveService::new(store, directory)
}

pub fn in_memory_service() -> (InMemoryStore, LeaveService) {
    let store = InMemoryStore::new();
    let service = service_over(&store);
    (store, service)
}
