//! HTTP handlers. Thin: envelope in, service call, envelope out.

pub mod auth;
pub mod grants;
pub mod profile;
