//! Session state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The gateway executes the I/O implied by each action; no I/O happens here.
//!
//! Per logical session:
//! - `Anonymous` is the rest state (no token pair stored)
//! - `Authenticated` means a pair is stored; it is optimistic on startup and
//!   not revalidated until the first request
//! - `Refreshing` covers the window between an authorization failure and the
//!   refresh outcome; all concurrently failing requests share it

/// Session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token pair; requests go out without an Authorization header
    Anonymous,
    /// Token pair stored, attached to every outbound request
    Authenticated,
    /// A refresh call is in flight; concurrent 401s wait on its outcome
    Refreshing,
}

impl SessionState {
    /// Status label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        }
    }

    /// Derived flag: true iff a credential pair backs this session.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionState::Anonymous)
    }
}

/// Events that drive session transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Startup found a stored token pair
    CredentialsLoaded,
    /// Login or registration completed and the pair was stored
    LoginSucceeded,
    /// A request came back 401 and a refresh is being initiated
    AuthorizationFailed,
    /// The refresh call returned a rotated pair
    RefreshSucceeded,
    /// The refresh call was rejected; the session is void
    RefreshFailed,
    /// Explicit logout
    LoggedOut,
}

/// Actions the gateway should execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Clear the credential store and the cached user profile
    ClearCredentials,
    /// No-op
    None,
}

/// Handle a session transition. Pure function: no I/O.
pub fn handle_event(state: SessionState, event: SessionEvent) -> (SessionState, SessionAction) {
    match (state, event) {
        // --- Anonymous ---
        (
            SessionState::Anonymous,
            SessionEvent::CredentialsLoaded | SessionEvent::LoginSucceeded,
        ) => (SessionState::Authenticated, SessionAction::None),

        // Logout from the rest state is a no-op: nothing stored, nothing cleared
        (SessionState::Anonymous, SessionEvent::LoggedOut) => {
            (SessionState::Anonymous, SessionAction::None)
        }

        // --- Authenticated ---
        (SessionState::Authenticated, SessionEvent::AuthorizationFailed) => {
            (SessionState::Refreshing, SessionAction::None)
        }

        // Re-login over an existing session just rotates the pair
        (SessionState::Authenticated, SessionEvent::LoginSucceeded) => {
            (SessionState::Authenticated, SessionAction::None)
        }

        // --- Refreshing ---
        (SessionState::Refreshing, SessionEvent::RefreshSucceeded) => {
            (SessionState::Authenticated, SessionAction::None)
        }

        (SessionState::Refreshing, SessionEvent::RefreshFailed) => {
            (SessionState::Anonymous, SessionAction::ClearCredentials)
        }

        // --- Any authenticated-ish state + logout = teardown ---
        (SessionState::Authenticated | SessionState::Refreshing, SessionEvent::LoggedOut) => {
            (SessionState::Anonymous, SessionAction::ClearCredentials)
        }

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, SessionAction::None),
    }
}
