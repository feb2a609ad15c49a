//! In-memory session state for the client: access token, current user, and the
//! event feed a front-end listens on to react to login/logout.
//! Nothing here touches durable storage.

mod manager;
mod user_store;
mod context;

pub use manager::SessionManager;
pub use user_store::UserStore;
pub use context::{SessionContext, SessionEvent};
