//! Typed domain clients for the opsdeck platform API
//!
//! Thin, typed wrappers over `opsdeck_gateway::Gateway` for the platform's
//! resource endpoints: projects, configuration versioning, policies, the
//! audit log, the cloud cost optimizer, billing, and user administration.
//! Every call goes through the gateway, so token attachment and
//! refresh-and-replay are handled uniformly; these modules own only the
//! payload shapes and paths.

pub mod audit;
pub mod billing;
pub mod configs;
pub mod cost;
pub mod policies;
pub mod projects;
pub mod users;
