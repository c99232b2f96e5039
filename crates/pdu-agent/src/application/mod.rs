//! Application layer for the agent.
//!
//! - **`session`** – the [`Session`](session::Session) state machine that
//!   owns one connection to a device and its scratch files.
//! - **`edit_config`** – read and edit round trips built on a session,
//!   plus parsing of `KEY=VALUE` edit arguments.
//!
//! Both are generic over the transport traits in
//! `infrastructure::transport`, so they run unchanged against the real FTP
//! client and against test doubles.

pub mod edit_config;
pub mod session;
