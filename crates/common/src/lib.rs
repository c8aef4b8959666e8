//! Process-level plumbing shared by the binary and the service crate:
//! logging setup, data directory checks and the admin HTTP endpoints.

pub mod utils;
pub mod env;
pub mod admin_http;
