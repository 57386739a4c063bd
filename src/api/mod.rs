// JSON-over-TCP interface for editors and CI daemons.

pub mod dto;
pub mod server;

pub use server::{start_server, Server};
