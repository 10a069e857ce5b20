//! MCP server that exposes GitHub notifications to LLMs.
//!
//! Provides tools for listing and reading notification threads, marking
//! them read or done, and managing thread and repository subscriptions.
//! Every identifier is validated before a request is built, and upstream
//! failures are classified into [`error::GithubError`].

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod request;
pub mod response;
pub mod server;
pub mod validation;
