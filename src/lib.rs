//! # kvbridge - Redis Commands over a Map-Oriented Record Store
//!
//! kvbridge speaks the Redis protocol and translates sorted-set and hash
//! commands into operations on a record store whose records hold named
//! bins. A sorted set becomes one record: a map bin of
//! `member -> encoded score` plus a type bin naming the container type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              kvbridge                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐              │
//! │  │ TCP Server  │───>│ Connection  │───>│ CommandListener │              │
//! │  │ (Listener)  │    │  Handler    │    │   (dispatch)    │              │
//! │  └─────────────┘    └─────────────┘    └────────┬────────┘              │
//! │                                                 │ operate(policy,       │
//! │                                                 │   key, ops)           │
//! │                                                 ▼                       │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Score     │    │            dyn Store (MemoryStore)           │   │
//! │  │   Codec     │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use kvbridge::config::StoreConfig;
//! use kvbridge::connection::{handle_connection, ConnectionStats};
//! use kvbridge::context::Context;
//! use kvbridge::store::{MemoryStore, Policies};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Context::new(
//!         &StoreConfig::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(Policies::new()),
//!     );
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(stream, addr, context.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `ZCARD key` / `HLEN key`
//! - `ZCOUNT key min max`
//! - `ZREMRANGEBYSCORE key min max`
//! - `ZREMRANGEBYRANK key start stop`
//! - `ZADD key [NX|XX] score member [score member ...]`
//! - `SETNX key value`
//! - `TYPE key`
//! - `PING [message]`
//!
//! Score bounds accept `inf`, `+inf`, `-inf` and a `(` prefix for an
//! exclusive bound. Negative ranks count from the highest rank.
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoding and reply encoding
//! - [`connection`]: client connections and response sinks
//! - [`commands`]: one listener per command
//! - [`score`]: order-preserving score encoding
//! - [`store`]: the record store boundary and the in-memory store
//! - [`config`]: TOML configuration
//! - [`context`]: per-connection store coordinates
//!
//! ## Failure Replies
//!
//! Cardinality commands answer a store failure with `ERR Internal error`.
//! The count and range-removal commands answer it with `:0`. Bad argument
//! text is always reported as an error, before the store is touched.

pub mod commands;
pub mod config;
pub mod connection;
pub mod context;
pub mod protocol;
pub mod score;
pub mod store;

// Re-export commonly used types for convenience
pub use commands::{dispatch, CommandListener};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats, ResponseSink};
pub use context::Context;
pub use protocol::{CommandDecoder, ParseError, RequestCommand, RespValue};
pub use store::{MemoryStore, Policies, Store};

/// The default port kvbridge listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host kvbridge binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of kvbridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
