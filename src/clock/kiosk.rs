//! Shared-device mode: an operator types a username, the kiosk looks the employee up
//! and hands back a resolver for that employee.

use thiserror::Error;
use tracing::info;

use super::resolver::ClockResolver;
use super::service::ClockService;
use crate::error::ApiError;
use crate::models::Employee;

pub const EMPLOYEE_BY_USERNAME_PATH: &str = "/employees/by-username";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KioskError {
    #[error("enter a username")]
    EmptyUsername,
    #[error("no employee named {0:?}")]
    UnknownEmployee(String),
    #[error(transparent)]
    Request(#[from] ApiError),
}

impl KioskError {
    pub fn user_message(&self) -> String {
        match self {
            KioskError::Request(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Kiosk {
    service: ClockService,
}

impl Kiosk {
    pub fn new(service: ClockService) -> Self { Self { service } }

    pub async fn lookup(&self, username: &str) -> Result<Employee, KioskError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(KioskError::EmptyUsername);
        }
        let path = format!("{}/{}", EMPLOYEE_BY_USERNAME_PATH, urlencoding::encode(username));
        match self.service.client().get::<Employee>(&path).await {
            Ok(e) => Ok(e),
            Err(e) if e.is_not_found() => Err(KioskError::UnknownEmployee(username.to_string())),
            Err(e) => Err(KioskError::Request(e)),
        }
    }

    /// Look the employee up and resolve their clock state.
    pub async fn open(&self, username: &str) -> Result<(Employee, ClockResolver), KioskError> {
        let employee = self.lookup(username).await?;
        info!(target: "timeclock::clock", employee_id = employee.id, "kiosk session opened");
        let resolver = ClockResolver::new(self.service.clone(), employee.id);
        resolver.refresh().await;
        Ok((employee, resolver))
    }
}
