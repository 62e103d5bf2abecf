pub mod directory;
pub mod leave_service;

pub use directory::{EmployeeDirectory, Provisioned};
pub use leave_service::{ApplyLeave, LeavePage, LeaveService};
