//! Talking to a Pebble daemon.

pub mod client;
pub mod multipart;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{PebbleClient, Transport, SOCKET_FILE_NAME};
