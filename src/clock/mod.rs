//! Clock-in/clock-out flows shared by the employee view and kiosk mode.

mod service;
mod resolver;
pub mod kiosk;
pub mod ticker;

pub use service::{ClockService, DegradedReason, DirectionOutcome};
pub use service::{ACTIVE_SHIFT_PATH, CLOCK_IN_PATH, CLOCK_OUT_PATH, DETERMINE_ACTION_PATH, EMPLOYEE_JOBS_PATH};
pub use resolver::{ClockActionError, ClockOutcome, ClockResolver, ClockState, ClockView};
pub use kiosk::{Kiosk, KioskError};
pub use ticker::{ShiftTicker, Tick};
