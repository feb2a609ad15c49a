//! Clock-direction state machine for one employee.
//!
//! Every run starts from `Initializing`, asks the backend for the next valid action,
//! then loads either the assignable jobs (clock-in) or the open shift (clock-out).
//! A completed clock action re-runs the whole resolution.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::service::{ClockService, DegradedReason, DirectionOutcome};
use crate::error::{ApiError, GENERIC_FAILURE};
use crate::geo::{acquire_coordinates, Geolocator, LocationFix, PositionOptions};
use crate::models::{ActiveShift, ClockDirection, EmployeeId, EmployeeJob, EmployeeJobId, GeoCoordinate};

#[derive(Debug, Clone, PartialEq)]
pub enum ClockState {
    Initializing,
    ClockIn { jobs: Vec<EmployeeJob>, selected: Option<EmployeeJobId> },
    /// Clock-in is the next action but nothing is assigned; terminal until an admin acts.
    NoJobs,
    ClockOut { shift: Option<ActiveShift> },
    /// `reason` is `None` when the backend itself said UNAVAILABLE.
    Unavailable { reason: Option<DegradedReason> },
}

impl ClockState {
    pub fn direction(&self) -> Option<ClockDirection> {
        match self {
            ClockState::Initializing => None,
            ClockState::ClockIn { .. } | ClockState::NoJobs => Some(ClockDirection::ClockIn),
            ClockState::ClockOut { .. } => Some(ClockDirection::ClockOut),
            ClockState::Unavailable { .. } => Some(ClockDirection::Unavailable),
        }
    }
}

/// Everything a front-end needs to render the clock panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockView {
    pub state: ClockState,
    /// Direction lookup in progress.
    pub resolving: bool,
    /// Jobs or shift lookup in progress.
    pub fetching: bool,
    /// Clock action in progress.
    pub acting: bool,
    /// Message from the last failed clock action, cleared on the next attempt.
    pub last_error: Option<String>,
}

impl Default for ClockView {
    fn default() -> Self {
        Self { state: ClockState::Initializing, resolving: false, fetching: false, acting: false, last_error: None }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockActionError {
    #[error("select a job before clocking in")]
    NoJobSelected,
    #[error("job {0} is not assigned to this employee")]
    UnknownJob(EmployeeJobId),
    #[error("cannot {attempted} right now")]
    WrongDirection { attempted: ClockDirection, current: Option<ClockDirection> },
    #[error("{message}")]
    Failed { message: String, source: ApiError },
}

impl ClockActionError {
    fn failed(source: ApiError) -> Self {
        let message = match &source {
            ApiError::Http { .. } | ApiError::Unauthorized { .. } => {
                source.server_message().map(str::to_string).unwrap_or_else(|| GENERIC_FAILURE.to_string())
            }
            other => other.user_message(),
        };
        ClockActionError::Failed { message, source }
    }

    /// One-line text for a notification.
    pub fn user_message(&self) -> String { self.to_string() }
}

/// Result of a successful clock action.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockOutcome {
    /// Location that was submitted, tagged so degraded submissions stay visible.
    pub fix: LocationFix,
    /// State after re-resolution.
    pub state: ClockState,
}

/// Clears `acting` on drop, so a cancelled action leaves the panel usable.
struct ActingGuard<'a> {
    view: &'a watch::Sender<ClockView>,
}

impl Drop for ActingGuard<'_> {
    fn drop(&mut self) {
        self.view.send_modify(|v| v.acting = false);
    }
}

pub struct ClockResolver {
    service: ClockService,
    employee_id: EmployeeId,
    geo_options: PositionOptions,
    view: watch::Sender<ClockView>,
    generation: AtomicU64,
}

impl std::fmt::Debug for ClockResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockResolver").field("employee_id", &self.employee_id).field("view", &*self.view.borrow()).finish()
    }
}

impl ClockResolver {
    pub fn new(service: ClockService, employee_id: EmployeeId) -> Self {
        let timeout = service.client().config().geolocation_timeout;
        let (view, _rx) = watch::channel(ClockView::default());
        Self { service, employee_id, geo_options: PositionOptions::with_timeout(timeout), view, generation: AtomicU64::new(0) }
    }

    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.geo_options = options;
        self
    }

    pub fn employee_id(&self) -> EmployeeId { self.employee_id }

    pub fn view(&self) -> ClockView { self.view.borrow().clone() }

    pub fn state(&self) -> ClockState { self.view.borrow().state.clone() }

    pub fn subscribe(&self) -> watch::Receiver<ClockView> { self.view.subscribe() }

    fn is_current(&self, generation: u64) -> bool { self.generation.load(Ordering::SeqCst) == generation }

    /// Re-enter `Initializing` and resolve again. Results from a run superseded by a
    /// newer one are discarded.
    pub async fn refresh(&self) -> ClockState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(|v| {
            v.state = ClockState::Initializing;
            v.resolving = true;
            v.fetching = false;
        });

        let outcome = self.service.determine_action(self.employee_id).await;
        if !self.is_current(generation) {
            debug!(target: "timeclock::clock", employee_id = self.employee_id, "stale direction result dropped");
            return self.state();
        }
        self.view.send_modify(|v| {
            v.resolving = false;
            v.fetching = matches!(outcome, DirectionOutcome::Resolved(ClockDirection::ClockIn | ClockDirection::ClockOut));
        });

        let next = match outcome {
            DirectionOutcome::Resolved(ClockDirection::ClockIn) => match self.service.employee_jobs(self.employee_id).await {
                Ok(jobs) if jobs.is_empty() => ClockState::NoJobs,
                Ok(jobs) => {
                    let selected = if jobs.len() == 1 { Some(jobs[0].employee_job_id) } else { None };
                    ClockState::ClockIn { jobs, selected }
                }
                Err(e) => {
                    warn!(target: "timeclock::clock", employee_id = self.employee_id, error = %e, "job lookup failed");
                    ClockState::Unavailable { reason: Some(DegradedReason::Request(e)) }
                }
            },
            DirectionOutcome::Resolved(ClockDirection::ClockOut) => {
                ClockState::ClockOut { shift: self.service.active_shift(self.employee_id).await }
            }
            DirectionOutcome::Resolved(ClockDirection::Unavailable) => ClockState::Unavailable { reason: None },
            DirectionOutcome::Degraded(reason) => ClockState::Unavailable { reason: Some(reason) },
        };

        if !self.is_current(generation) {
            return self.state();
        }
        self.view.send_modify(|v| {
            v.state = next.clone();
            v.fetching = false;
        });
        next
    }

    /// Pick the job to clock in with. Only valid in the clock-in state.
    pub fn select_job(&self, job_id: EmployeeJobId) -> Result<(), ClockActionError> {
        let mut result = Ok(());
        self.view.send_if_modified(|v| match &mut v.state {
            ClockState::ClockIn { jobs, selected } => {
                if jobs.iter().any(|j| j.employee_job_id == job_id) {
                    *selected = Some(job_id);
                    true
                } else {
                    result = Err(ClockActionError::UnknownJob(job_id));
                    false
                }
            }
            other => {
                result = Err(ClockActionError::WrongDirection { attempted: ClockDirection::ClockIn, current: other.direction() });
                false
            }
        });
        result
    }

    pub fn can_clock_in(&self) -> bool {
        let v = self.view.borrow();
        !v.acting && matches!(v.state, ClockState::ClockIn { selected: Some(_), .. })
    }

    pub fn can_clock_out(&self) -> bool {
        let v = self.view.borrow();
        !v.acting && matches!(v.state, ClockState::ClockOut { .. })
    }

    pub async fn clock_in(&self, locator: &dyn Geolocator) -> Result<ClockOutcome, ClockActionError> {
        let job_id = match &self.view.borrow().state {
            ClockState::ClockIn { selected: Some(job), .. } => *job,
            ClockState::ClockIn { selected: None, .. } => return Err(ClockActionError::NoJobSelected),
            other => {
                return Err(ClockActionError::WrongDirection { attempted: ClockDirection::ClockIn, current: other.direction() })
            }
        };
        self.run_action(locator, |at| {
            let service = self.service.clone();
            let employee_id = self.employee_id;
            async move { service.clock_in(employee_id, job_id, at).await }
        })
        .await
    }

    pub async fn clock_out(&self, locator: &dyn Geolocator) -> Result<ClockOutcome, ClockActionError> {
        let state = self.state();
        if !matches!(state, ClockState::ClockOut { .. }) {
            return Err(ClockActionError::WrongDirection { attempted: ClockDirection::ClockOut, current: state.direction() });
        }
        self.run_action(locator, |at| {
            let service = self.service.clone();
            let employee_id = self.employee_id;
            async move { service.clock_out(employee_id, at).await }
        })
        .await
    }

    async fn run_action<F, Fut>(&self, locator: &dyn Geolocator, submit: F) -> Result<ClockOutcome, ClockActionError>
    where
        F: FnOnce(GeoCoordinate) -> Fut,
        Fut: std::future::Future<Output = Result<(), ApiError>>,
    {
        let mut busy = false;
        self.view.send_if_modified(|v| {
            if v.acting {
                busy = true;
                return false;
            }
            v.acting = true;
            v.last_error = None;
            true
        });
        if busy {
            return Err(ClockActionError::failed(ApiError::ActionInFlight));
        }
        let acting = ActingGuard { view: &self.view };
        let fix = acquire_coordinates(locator, self.geo_options).await;
        let result = submit(fix.coordinate()).await;
        drop(acting);
        match result {
            Ok(()) => {
                let state = self.refresh().await;
                Ok(ClockOutcome { fix, state })
            }
            Err(e) => {
                let err = ClockActionError::failed(e);
                let msg = err.user_message();
                self.view.send_modify(|v| v.last_error = Some(msg));
                Err(err)
            }
        }
    }
}
