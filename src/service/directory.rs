use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info, instrument};

use crate::auth::auth::AuthUser;
use crate::error::{LeaveError, StoreError};
use crate::model::employee::{Employee, NewEmployee, normalize_email};
use crate::repository::EmployeeRepository;

/// Result of [`EmployeeDirectory::resolve_or_provision`].
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub employee: Employee,
    /// `true` when this call created the record.
    pub created: bool,
}

/// Maps principals to employee records, creating the record on first use.
///
/// Employees are immutable once provisioned, so resolved records are kept in
/// a bounded moka cache keyed by normalized email.
#[derive(Clone)]
pub struct EmployeeDirectory {
    employees: Arc<dyn EmployeeRepository>,
    cache: Cache<String, Employee>,
}

impl EmployeeDirectory {
    pub fn new(employees: Arc<dyn EmployeeRepository>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { employees, cache }
    }

    /// Looks the principal up by email and provisions an employee if none exists.
    ///
    /// The new employee is named after the principal's username, or after the
    /// email when the username is blank. A principal without an email cannot be
    /// provisioned and yields [`LeaveError::EmployeeNotFound`].
    #[instrument(name = "resolve_employee", skip(self, principal), fields(user_id = principal.user_id))]
    pub async fn resolve_or_provision(&self, principal: &AuthUser) -> Result<Provisioned, LeaveError> {
        let email = normalize_email(&principal.email);
        if email.is_empty() {
            debug!("Principal has no email, cannot resolve employee");
            return Err(LeaveError::EmployeeNotFound);
        }

        if let Some(employee) = self.lookup(&email).await? {
            return Ok(Provisioned {
                employee,
                created: false,
            });
        }

        let name = match principal.username.trim() {
            "" => email.clone(),
            username => username.to_string(),
        };

        match self
            .employees
            .insert_employee(NewEmployee {
                name,
                email: email.clone(),
            })
            .await
        {
            Ok(employee) => {
                info!(employee_id = employee.id, "Provisioned employee");
                self.cache.insert(email, employee.clone()).await;
                Ok(Provisioned {
                    employee,
                    created: true,
                })
            }
            // Another request provisioned the same email first.
            Err(StoreError::Conflict) => {
                let employee = self
                    .lookup(&email)
                    .await?
                    .ok_or(LeaveError::EmployeeNotFound)?;
                Ok(Provisioned {
                    employee,
                    created: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup(&self, email: &str) -> Result<Option<Employee>, StoreError> {
        if let Some(employee) = self.cache.get(email).await {
            return Ok(Some(employee));
        }

        let found = self.employees.find_employee_by_email(email).await?;
        if let Some(employee) = &found {
            self.cache.insert(email.to_string(), employee.clone()).await;
        }
        Ok(found)
    }
}
