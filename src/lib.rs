pub mod authentication;
pub mod budgets;
pub mod cli;
mod client_ip;
mod database;
mod email;
mod http_err;
pub mod identities;
mod models;
mod passwords;
mod rate_limit;
mod repos;
pub mod server;
