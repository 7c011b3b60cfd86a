//! Authenticated request gateway for the opsdeck platform API
//!
//! Wraps every outbound API call with credential attachment, authorization
//! failure detection, and transparent recovery, so callers never handle
//! token mechanics. The gateway owns the session lifecycle:
//!
//! 1. Startup loads the credential store; a stored pair means the session is
//!    optimistically authenticated
//! 2. `Gateway::send()` attaches `Authorization: Bearer <access>` when a
//!    pair is present
//! 3. A 401 response triggers at most one refresh call, shared by all
//!    concurrently failing requests, followed by a single replay
//! 4. A rejected refresh clears the store and ends the session; callers see
//!    `Error::SessionExpired` and decide where to send the user
//!
//! Session transitions run through the pure state machine in `session` so
//! the lifecycle is testable without any I/O.

pub mod error;
pub mod gateway;
pub mod session;

pub use error::{Error, Result};
pub use gateway::{Gateway, RequestDescriptor};
pub use session::{SessionAction, SessionEvent, SessionState, handle_event};
