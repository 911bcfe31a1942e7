//! HTTP middleware stack: per-request tracing, CORS, optional bearer auth.

pub mod auth;
pub mod cors;
pub mod trace;
