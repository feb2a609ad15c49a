use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{ActiveShift, ClockDirection, ClockPayload, EmployeeId, EmployeeJob, EmployeeJobId, GeoCoordinate};

pub const DETERMINE_ACTION_PATH: &str = "/clock/determine-action";
pub const EMPLOYEE_JOBS_PATH: &str = "/employee-jobs/employee";
pub const ACTIVE_SHIFT_PATH: &str = "/shifts/active";
pub const CLOCK_IN_PATH: &str = "/clock/in";
pub const CLOCK_OUT_PATH: &str = "/clock/out";

/// Why a direction lookup could not be trusted.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradedReason {
    /// Backend answered with something other than the three known values.
    Unrecognized(String),
    Request(ApiError),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::Unrecognized(raw) => write!(f, "unrecognized clock action {:?}", raw),
            DegradedReason::Request(e) => write!(f, "{}", e),
        }
    }
}

/// Direction lookup result. A degraded lookup always displays as `Unavailable`.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionOutcome {
    Resolved(ClockDirection),
    Degraded(DegradedReason),
}

impl DirectionOutcome {
    pub fn direction(&self) -> ClockDirection {
        match self {
            DirectionOutcome::Resolved(d) => *d,
            DirectionOutcome::Degraded(_) => ClockDirection::Unavailable,
        }
    }
}

/// Accepts `"CLOCK_IN"`, `{"action":"CLOCK_IN"}` / `{"direction":...}`, or the bare text.
fn direction_from_body(body: &[u8]) -> Result<ClockDirection, String> {
    let raw = match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(s)) => s,
        Ok(Value::Object(map)) => map
            .get("action")
            .or_else(|| map.get("direction"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Ok(other) => other.to_string(),
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };
    ClockDirection::parse(&raw).ok_or(raw)
}

/// Releases the employee's in-flight slot on drop.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<EmployeeId>>>,
    employee_id: EmployeeId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.employee_id);
    }
}

/// REST calls behind the clock flows, plus the one-action-per-employee invariant.
#[derive(Debug, Clone)]
pub struct ClockService {
    client: ApiClient,
    in_flight: Arc<Mutex<HashSet<EmployeeId>>>,
}

impl ClockService {
    pub fn new(client: ApiClient) -> Self { Self { client, in_flight: Arc::new(Mutex::new(HashSet::new())) } }

    pub fn client(&self) -> &ApiClient { &self.client }

    pub fn is_acting(&self, employee_id: EmployeeId) -> bool { self.in_flight.lock().contains(&employee_id) }

    fn begin_action(&self, employee_id: EmployeeId) -> ApiResult<InFlightGuard> {
        let mut set = self.in_flight.lock();
        if !set.insert(employee_id) {
            return Err(ApiError::ActionInFlight);
        }
        Ok(InFlightGuard { set: self.in_flight.clone(), employee_id })
    }

    /// Never fails: transport errors and unknown values come back as `Degraded`.
    pub async fn determine_action(&self, employee_id: EmployeeId) -> DirectionOutcome {
        let path = format!("{}/{}", DETERMINE_ACTION_PATH, employee_id);
        let resp = match self.client.request_raw(Method::GET, &path, None).await.and_then(|r| r.into_result()) {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "timeclock::clock", employee_id, error = %e, "determine-action failed");
                return DirectionOutcome::Degraded(DegradedReason::Request(e));
            }
        };
        match direction_from_body(&resp.body) {
            Ok(d) => {
                debug!(target: "timeclock::clock", employee_id, direction = %d, "direction resolved");
                DirectionOutcome::Resolved(d)
            }
            Err(raw) => {
                warn!(target: "timeclock::clock", employee_id, value = %raw, "unrecognized direction");
                DirectionOutcome::Degraded(DegradedReason::Unrecognized(raw))
            }
        }
    }

    pub async fn employee_jobs(&self, employee_id: EmployeeId) -> ApiResult<Vec<EmployeeJob>> {
        let jobs: Option<Vec<EmployeeJob>> = self.client.get(&format!("{}/{}", EMPLOYEE_JOBS_PATH, employee_id)).await?;
        Ok(jobs.unwrap_or_default())
    }

    /// 404 means no open shift. Other failures are returned.
    pub async fn active_shift_strict(&self, employee_id: EmployeeId) -> ApiResult<Option<ActiveShift>> {
        let resp = self.client.request_raw(Method::GET, &format!("{}/{}", ACTIVE_SHIFT_PATH, employee_id), None).await?;
        if resp.status == 404 {
            return Ok(None);
        }
        resp.into_result()?.json()
    }

    /// Silent variant: every failure reads as "no active shift". Non-404 failures are logged.
    pub async fn active_shift(&self, employee_id: EmployeeId) -> Option<ActiveShift> {
        match self.active_shift_strict(employee_id).await {
            Ok(shift) => shift,
            Err(e) => {
                warn!(target: "timeclock::clock", employee_id, error = %e, "active shift lookup failed, treating as none");
                None
            }
        }
    }

    pub async fn clock_in(&self, employee_id: EmployeeId, job_id: EmployeeJobId, at: GeoCoordinate) -> ApiResult<()> {
        let _guard = self.begin_action(employee_id)?;
        self.client.post_unit(CLOCK_IN_PATH, &ClockPayload::new(job_id, at)).await?;
        info!(target: "timeclock::clock", employee_id, job_id, sentinel = at.is_sentinel(), "clocked in");
        Ok(())
    }

    pub async fn clock_out(&self, employee_id: EmployeeId, at: GeoCoordinate) -> ApiResult<()> {
        let _guard = self.begin_action(employee_id)?;
        self.client.post_unit(CLOCK_OUT_PATH, &ClockPayload::new(employee_id, at)).await?;
        info!(target: "timeclock::clock", employee_id, sentinel = at.is_sentinel(), "clocked out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_body_shapes() {
        assert_eq!(direction_from_body(br#""CLOCK_IN""#), Ok(ClockDirection::ClockIn));
        assert_eq!(direction_from_body(br#"{"action":"CLOCK_OUT"}"#), Ok(ClockDirection::ClockOut));
        assert_eq!(direction_from_body(br#"{"direction":"UNAVAILABLE"}"#), Ok(ClockDirection::Unavailable));
        assert_eq!(direction_from_body(b"CLOCK_IN"), Ok(ClockDirection::ClockIn));
        assert_eq!(direction_from_body(br#""ON_BREAK""#), Err("ON_BREAK".to_string()));
        assert!(direction_from_body(br#"{"other":1}"#).is_err());
        assert!(direction_from_body(b"null").is_err());
    }

    #[test]
    fn degraded_displays_unavailable() {
        let d = DirectionOutcome::Degraded(DegradedReason::Unrecognized("X".into()));
        assert_eq!(d.direction(), ClockDirection::Unavailable);
        assert_eq!(DirectionOutcome::Resolved(ClockDirection::ClockOut).direction(), ClockDirection::ClockOut);
    }
}
