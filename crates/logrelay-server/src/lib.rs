//! Live-stream server for logrelay
//!
//! Authenticated viewers connect to `GET /logs`, send a handshake frame with
//! their token and the stream they want, then receive every record published
//! on that stream.

pub mod auth;
pub mod server;

pub use auth::{AuthError, Session, TokenVerifier};
pub use server::{Status, StreamServer};
