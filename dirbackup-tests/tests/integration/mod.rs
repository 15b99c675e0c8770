//! Integration tests for dirbackup
//!
//! End-to-end runs of the remote-directory pipeline on this machine: commands
//! go through `sh` via the shell channel and archives land in filesystem
//! storage inside a temp directory. Requires `sh` and `tar` (unix only).

#![cfg(unix)]

mod scenarios;
