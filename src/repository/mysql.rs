use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{MySql, MySqlPool, Transaction, prelude::FromRow};
use tracing::debug;

use super::{EmployeeRepository, LeaveRepository, LeaveTransaction};
use crate::error::StoreError;
use crate::model::employee::{Employee, NewEmployee};
use crate::model::leave_request::{
    CALENDAR_BLOCKING, LeaveDetail, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};

const LEAVE_COLUMNS: &str = r#"
    lr.id, lr.employee_id, lr.start_date, lr.end_date, lr.reason, lr.status,
    lr.approved_by, lr.approved_date, lr.rejection_reason, lr.created_date, lr.updated_date
"#;

const DETAIL_SELECT: &str = r#"
    SELECT
        lr.id, lr.employee_id, lr.start_date, lr.end_date, lr.reason, lr.status,
        lr.approved_by, lr.approved_date, lr.rejection_reason, lr.created_date, lr.updated_date,
        e.name AS employee_name, e.email AS employee_email,
        a.name AS approver_name, a.email AS approver_email
    FROM leave_requests lr
    LEFT JOIN employees e ON e.id = lr.employee_id
    LEFT JOIN employees a ON a.id = lr.approved_by
"#;

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    status: String,
    approved_by: Option<u64>,
    approved_date: Option<NaiveDateTime>,
    rejection_reason: Option<String>,
    created_date: NaiveDateTime,
    updated_date: Option<NaiveDateTime>,
}

#[derive(FromRow)]
struct LeaveDetailRow {
    #[sqlx(flatten)]
    leave: LeaveRow,
    employee_name: Option<String>,
    employee_email: Option<String>,
    approver_name: Option<String>,
    approver_email: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<LeaveStatus>().map_err(|e| {
            StoreError::Database(sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status,
            approved_by: row.approved_by,
            approved_date: row.approved_date.map(|d| d.and_utc()),
            rejection_reason: row.rejection_reason,
            created_date: row.created_date.and_utc(),
            updated_date: row.updated_date.map(|d| d.and_utc()),
        })
    }
}

impl TryFrom<LeaveDetailRow> for LeaveDetail {
    type Error = StoreError;

    fn try_from(row: LeaveDetailRow) -> Result<Self, Self::Error> {
        let employee = match (row.employee_name, row.employee_email) {
            (Some(name), Some(email)) => Some(Employee {
                id: row.leave.employee_id,
                name,
                email,
            }),
            _ => None,
        };
        let approver = match (row.leave.approved_by, row.approver_name, row.approver_email) {
            (Some(id), Some(name), Some(email)) => Some(Employee { id, name, email }),
            _ => None,
        };

        Ok(LeaveDetail {
            leave: row.leave.try_into()?,
            employee,
            approver,
        })
    }
}

fn into_details(rows: Vec<LeaveDetailRow>) -> Result<Vec<LeaveDetail>, StoreError> {
    rows.into_iter().map(LeaveDetail::try_from).collect()
}

fn naive(ts: DateTime<Utc>) -> NaiveDateTime {
    ts.naive_utc()
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeRepository for MySqlStore {
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, name, email FROM employees WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let result = sqlx::query("INSERT INTO employees (name, email) VALUES (?, ?)")
            .bind(&employee.name)
            .bind(&employee.email)
            .execute(&self.pool)
            .await?;

        Ok(Employee {
            id: result.last_insert_id(),
            name: employee.name,
            email: employee.email,
        })
    }
}

#[async_trait]
impl LeaveRepository for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlLeaveTransaction { tx }))
    }

    async fn find_leave_by_id(&self, id: u64) -> Result<Option<LeaveDetail>, StoreError> {
        let sql = format!("{DETAIL_SELECT} WHERE lr.id = ?");
        let row = sqlx::query_as::<_, LeaveDetailRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeaveDetail::try_from).transpose()
    }

    async fn list_leaves_by_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveDetail>, StoreError> {
        let sql = format!(
            "{DETAIL_SELECT} WHERE lr.employee_id = ? ORDER BY lr.created_date DESC, lr.id DESC"
        );
        let rows = sqlx::query_as::<_, LeaveDetailRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        into_details(rows)
    }

    async fn list_pending_leaves(&self) -> Result<Vec<LeaveDetail>, StoreError> {
        let sql =
            format!("{DETAIL_SELECT} WHERE lr.status = ? ORDER BY lr.start_date ASC, lr.id ASC");
        let rows = sqlx::query_as::<_, LeaveDetailRow>(&sql)
            .bind(LeaveStatus::Pending.as_ref())
            .fetch_all(&self.pool)
            .await?;
        into_details(rows)
    }

    async fn list_leaves(
        &self,
        query: &LeaveQuery,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<LeaveDetail>, u64), StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = query.employee_id {
            where_sql.push_str(" AND lr.employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        if let Some(status) = query.status {
            where_sql.push_str(" AND lr.status = ?");
            args.push(FilterValue::Str(status.into()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests lr{where_sql}");
        debug!(sql = %count_sql, "Counting leave requests");

        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql =
            format!("{DETAIL_SELECT}{where_sql} ORDER BY lr.created_date DESC, lr.id DESC LIMIT ? OFFSET ?");
        let mut data_q = sqlx::query_as::<_, LeaveDetailRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((into_details(rows)?, total.max(0) as u64))
    }

    async fn delete_leave(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

struct MySqlLeaveTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LeaveTransaction for MySqlLeaveTransaction {
    async fn lock_employee(&mut self, employee_id: u64) -> Result<(), StoreError> {
        let locked = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match locked {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_leave_by_id(&mut self, id: u64) -> Result<Option<LeaveDetail>, StoreError> {
        let sql = format!("{DETAIL_SELECT} WHERE lr.id = ? FOR UPDATE OF lr");
        let row = sqlx::query_as::<_, LeaveDetailRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LeaveDetail::try_from).transpose()
    }

    async fn find_overlapping_leaves(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let placeholders = vec!["?"; CALENDAR_BLOCKING.len()].join(", ");
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests lr
            WHERE lr.employee_id = ?
            AND lr.status IN ({placeholders})
            AND NOT (lr.end_date <= ? OR lr.start_date >= ?)
            FOR UPDATE
            "#
        );
        let mut query = sqlx::query_as::<_, LeaveRow>(&sql).bind(employee_id);
        for status in CALENDAR_BLOCKING {
            query = query.bind(<&'static str>::from(status));
        }
        let rows = query
            .bind(start)
            .bind(end)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    async fn insert_leave(&mut self, leave: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, reason, status, created_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(&leave.reason)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(naive(leave.created_date))
        .execute(&mut *self.tx)
        .await?;

        Ok(leave.with_id(result.last_insert_id()))
    }

    async fn update_leave(
        &mut self,
        leave: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?, approved_date = ?, rejection_reason = ?, updated_date = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(leave.status.as_ref())
        .bind(leave.approved_by)
        .bind(leave.approved_date.map(naive))
        .bind(leave.rejection_reason.as_deref())
        .bind(leave.updated_date.map(naive))
        .bind(leave.id)
        .bind(expected.as_ref())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
