//! Connection Handler Module
//!
//! This module manages individual client connections. Each client
//! connection is handled by its own async task; commands on one connection
//! run strictly one after another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept(), spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Decode cmd  │───>│ dispatch()  │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                   ┌───────────────────┐     │
//! │                                   │ ConnectionWriter  │     │
//! │                                   │  (ResponseSink)   │     │
//! │                                   └───────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use kvbridge::connection::{handle_connection, ConnectionStats};
//! use kvbridge::context::Context;
//! use std::sync::Arc;
//!
//! let stats = Arc::new(ConnectionStats::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, context.clone(), stats));
//! ```

pub mod handler;
pub mod sink;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
pub use sink::{
    close_if_failed, send_reply, BufferedSink, ConnectionWriter, ReplyError, ResponseSink,
};
