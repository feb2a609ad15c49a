pub mod error;
pub mod config;
pub mod models;
pub mod session;
pub mod api;
pub mod auth;
pub mod geo;
pub mod clock;
pub mod cli;

pub use api::ApiClient;
pub use auth::AuthService;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use session::{SessionContext, SessionEvent};

// Test-only printing helper: expands to eprintln! during tests and debug builds and is absent otherwise.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
