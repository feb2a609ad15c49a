//! Device location for clock actions.
//!
//! Location is best effort: denial, timeout or a missing capability degrade to
//! [`GeoCoordinate::SENTINEL`] so a clock action can always be attempted.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::GeoCoordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the device may return.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self { high_accuracy: true, timeout: Duration::from_secs(10), maximum_age: Duration::ZERO }
    }
}

impl PositionOptions {
    pub fn with_timeout(timeout: Duration) -> Self { Self { timeout, ..Default::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("geolocation not supported")]
    Unsupported,
}

/// Source of device coordinates.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<GeoCoordinate, GeoError>;
}

/// Outcome of a location request, keeping "degraded" distinguishable from a real fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFix {
    Acquired(GeoCoordinate),
    Degraded { reason: GeoError },
}

impl LocationFix {
    /// Coordinate to submit: the real fix, or the sentinel.
    pub fn coordinate(&self) -> GeoCoordinate {
        match self {
            LocationFix::Acquired(c) => *c,
            LocationFix::Degraded { .. } => GeoCoordinate::SENTINEL,
        }
    }

    pub fn is_degraded(&self) -> bool { matches!(self, LocationFix::Degraded { .. }) }
}

/// Ask the locator for a position, bounded by `options.timeout`. Never fails.
pub async fn acquire_coordinates(locator: &dyn Geolocator, options: PositionOptions) -> LocationFix {
    match tokio::time::timeout(options.timeout, locator.current_position(options)).await {
        Ok(Ok(c)) => {
            debug!(target: "timeclock::clock", lat = c.latitude, lon = c.longitude, "position acquired");
            LocationFix::Acquired(c)
        }
        Ok(Err(reason)) => {
            warn!(target: "timeclock::clock", %reason, "location unavailable, submitting sentinel");
            LocationFix::Degraded { reason }
        }
        Err(_) => {
            warn!(target: "timeclock::clock", timeout_ms = options.timeout.as_millis() as u64, "location timed out, submitting sentinel");
            LocationFix::Degraded { reason: GeoError::Timeout }
        }
    }
}

/// Always reports the same coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator(pub GeoCoordinate);

#[async_trait]
impl Geolocator for FixedLocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<GeoCoordinate, GeoError> { Ok(self.0) }
}

/// Behaves like a user who refused the permission prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocator;

#[async_trait]
impl Geolocator for DeniedLocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<GeoCoordinate, GeoError> {
        Err(GeoError::PermissionDenied)
    }
}

/// No location capability at all (headless hosts, the CLI without flags).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

#[async_trait]
impl Geolocator for NoLocator {
    async fn current_position(&self, _options: PositionOptions) -> Result<GeoCoordinate, GeoError> {
        Err(GeoError::Unsupported)
    }
}
