//! Application layer - Session orchestration
//!
//! This layer drives the domain types over live connections:
//! - One handler per call session (parse, dispatch, reply, forward)
//! - The directory of live sessions, one per call id

pub mod call_session;
pub mod session_directory;

pub use call_session::{CallSessionHandler, SessionOutcome, SessionSettings};
pub use session_directory::{SessionDirectory, SessionLease};
