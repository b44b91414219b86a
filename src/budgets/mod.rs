pub mod changes;
pub mod domain;
pub mod http;
pub mod models;
pub mod services;
