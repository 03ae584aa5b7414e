pub mod client;
pub mod envelope;
pub mod error;
pub mod token;

#[cfg(test)]
pub mod test_server;

pub use client::{FormData, HttpClient};
