//! Cookie sessions for signed in users.
pub mod domain;
pub mod http;
