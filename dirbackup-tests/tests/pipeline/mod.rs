//! Pipeline tests for dirbackup
//!
//! The remote-directory pipeline against mocked channels and storage, and
//! the runner's per-interface isolation with recording interfaces.

mod remote;
mod runner;
