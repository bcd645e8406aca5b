pub mod errors;
pub mod handlers;
pub mod router;
pub mod server;
pub mod types;

#[cfg(test)]
mod http_test;

pub use router::routes;
pub use server::{serve, start_http_server};
