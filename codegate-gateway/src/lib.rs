//! HTTP gateway for archived code submissions.
//!
//! Every `POST /execute` is written to the run archive before it is
//! forwarded to the sandbox service. Archived runs are browsable through
//! the token-gated admin endpoints.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod admin;
pub mod caller;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
