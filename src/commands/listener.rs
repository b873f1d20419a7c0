//! Command Listener Base
//!
//! Every command is served by a [`CommandListener`]. A listener only
//! supplies its name, its arity and the store work in
//! [`execute`](CommandListener::execute); the provided methods take care of
//! validating the request, writing exactly one reply and flushing it, and
//! closing the connection when a reply cannot be delivered.
//!
//! ## Flow of one command
//!
//! ```text
//! handle()
//!   │
//!   ├── arity mismatch ────────────> "ERR wrong number of arguments ..."
//!   │
//!   ▼
//! execute() ──awaits──> Store
//!   │
//!   ├── Ok(value) ─────────────────> write_response() + flush
//!   ├── Err(Store(e)) ─────────────> on_failure() -> write_error() + flush
//!   └── Err(InvalidArgument) ──────> "ERR <message>"
//! ```
//!
//! Listeners override [`write_error`](CommandListener::write_error) to
//! change what a store failure looks like to the client.

use crate::connection::{close_if_failed, send_reply, ReplyError, ResponseSink};
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use crate::score::ScoreError;
use crate::store::{Bin, Key, Operation, Record, StoreError, Value, ValueType};
use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tracing::debug;

/// Reply text for store failures nobody handles specifically.
pub const INTERNAL_ERROR: &str = "ERR Internal error";

/// Number of arguments a command accepts, counting the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, arg_count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => arg_count == n,
            Arity::AtLeast(n) => arg_count >= n,
        }
    }
}

/// Why a command did not produce a normal reply.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str },

    /// Bad argument text, reported before any store access.
    #[error("ERR {0}")]
    InvalidArgument(String),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl CommandError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CommandError::InvalidArgument(msg.into())
    }
}

impl From<ScoreError> for CommandError {
    fn from(err: ScoreError) -> Self {
        CommandError::InvalidArgument(err.to_string())
    }
}

/// A handler for one command.
#[async_trait]
pub trait CommandListener: Send + Sync {
    /// Lower-case command name, as used in error replies.
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Performs the store work for `cmd` and returns the reply value.
    async fn execute(&self, ctx: &Context, cmd: &RequestCommand)
        -> Result<RespValue, CommandError>;

    /// Runs `cmd` to completion: exactly one reply is written and flushed,
    /// or the sink is closed and a [`ReplyError`] returned.
    async fn handle(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), ReplyError> {
        if !self.arity().accepts(cmd.arg_count()) {
            let err = CommandError::WrongArity {
                command: self.name(),
            };
            return send_reply(sink, &RespValue::error(err.to_string())).await;
        }

        match self.execute(ctx, cmd).await {
            Ok(value) => {
                let result = match self.write_response(sink, &value) {
                    Ok(()) => sink.flush().await,
                    Err(e) => Err(e),
                };
                close_if_failed(sink, result).await
            }
            Err(CommandError::Store(err)) => self.on_failure(sink, &err).await,
            Err(err) => send_reply(sink, &RespValue::error(err.to_string())).await,
        }
    }

    fn write_response(&self, sink: &mut dyn ResponseSink, value: &RespValue) -> io::Result<()> {
        sink.write_value(value)
    }

    /// Writes the reply for a failed store operation.
    fn write_error(&self, sink: &mut dyn ResponseSink, _err: &StoreError) -> io::Result<()> {
        sink.write_error_text(INTERNAL_ERROR)
    }

    async fn on_failure(
        &self,
        sink: &mut dyn ResponseSink,
        err: &StoreError,
    ) -> Result<(), ReplyError> {
        debug!(command = self.name(), error = %err, "Store operation failed");

        let result = match self.write_error(sink, err) {
            Ok(()) => sink.flush().await,
            Err(e) => Err(e),
        };
        close_if_failed(sink, result).await
    }

    /// Builds the record key for a command's key argument.
    fn create_key(&self, ctx: &Context, key: &[u8]) -> Key {
        Key::new(
            ctx.namespace.as_str(),
            ctx.set.as_str(),
            String::from_utf8_lossy(key),
        )
    }

    /// An operation tagging the record with its container type.
    fn type_op(&self, ctx: &Context, value_type: ValueType) -> Operation {
        Operation::put(Bin::new(ctx.type_bin.as_str(), value_type.as_str()))
    }
}

/// Converts a store value into a reply value.
pub fn value_to_resp(value: &Value) -> RespValue {
    match value {
        Value::Nil => RespValue::null(),
        Value::Int(n) => RespValue::integer(*n),
        Value::Str(s) => RespValue::bulk_string(s.clone()),
        Value::Blob(b) => RespValue::bulk_string(b.clone()),
        Value::List(items) => RespValue::array(items.iter().map(value_to_resp).collect()),
        Value::Map(map) => RespValue::array(
            map.iter()
                .flat_map(|(k, v)| [value_to_resp(k), value_to_resp(v)])
                .collect(),
        ),
    }
}

/// The data bin of an operate result as a reply; an absent record is 0.
pub fn data_bin_reply(ctx: &Context, record: Option<&Record>) -> RespValue {
    record
        .and_then(|r| r.get(&ctx.bin))
        .map_or_else(|| RespValue::integer(0), value_to_resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::connection::BufferedSink;
    use crate::store::{MemoryStore, Policies};
    use bytes::Bytes;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CommandListener for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn arity(&self) -> Arity {
            Arity::Exactly(2)
        }

        async fn execute(
            &self,
            _ctx: &Context,
            cmd: &RequestCommand,
        ) -> Result<RespValue, CommandError> {
            match cmd.arg_str(1) {
                Some("fail") => Err(StoreError::Timeout.into()),
                Some("bad") => Err(CommandError::invalid("bad input")),
                _ => Ok(RespValue::bulk_string(cmd.key().to_vec())),
            }
        }
    }

    fn context() -> Context {
        Context::new(
            &StoreConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(Policies::new()),
        )
    }

    fn cmd(parts: &[&str]) -> RequestCommand {
        RequestCommand::from_parts(parts).unwrap()
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exactly(2).accepts(2));
        assert!(!Arity::Exactly(2).accepts(3));
        assert!(Arity::AtLeast(4).accepts(6));
        assert!(!Arity::AtLeast(4).accepts(3));
    }

    #[tokio::test]
    async fn test_handle_writes_one_flushed_reply() {
        let mut sink = BufferedSink::new();
        Echo.handle(&context(), &cmd(&["ECHO", "hi"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.replies, vec![RespValue::bulk_string("hi")]);
        assert_eq!(sink.flushes, 1);
    }

    #[tokio::test]
    async fn test_handle_rejects_wrong_arity() {
        let mut sink = BufferedSink::new();
        Echo.handle(&context(), &cmd(&["ECHO"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(
            sink.last(),
            Some(&RespValue::error(
                "ERR wrong number of arguments for 'echo' command"
            ))
        );
    }

    #[tokio::test]
    async fn test_store_failure_uses_default_error() {
        let mut sink = BufferedSink::new();
        Echo.handle(&context(), &cmd(&["ECHO", "fail"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.last(), Some(&RespValue::error(INTERNAL_ERROR)));
        assert_eq!(sink.flushes, 1);
    }

    #[tokio::test]
    async fn test_invalid_argument_is_reported() {
        let mut sink = BufferedSink::new();
        Echo.handle(&context(), &cmd(&["ECHO", "bad"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.last(), Some(&RespValue::error("ERR bad input")));
    }

    #[tokio::test]
    async fn test_failed_flush_closes_and_reports() {
        let mut sink = BufferedSink::failing();
        let result = Echo
            .handle(&context(), &cmd(&["ECHO", "fail"]), &mut sink)
            .await;

        assert!(result.is_err());
        assert!(sink.closed);
        assert!(sink.replies.is_empty());
    }

    #[test]
    fn test_create_key_and_type_op() {
        let ctx = context();
        let key = Echo.create_key(&ctx, b"myset");
        assert_eq!(key, Key::new("test", "redis", "myset"));

        assert_eq!(
            Echo.type_op(&ctx, ValueType::ZSet),
            Operation::put(Bin::new("t", "zset"))
        );
    }

    #[test]
    fn test_value_to_resp() {
        assert_eq!(value_to_resp(&Value::Int(4)), RespValue::integer(4));
        assert_eq!(value_to_resp(&Value::Nil), RespValue::null());
        assert_eq!(
            value_to_resp(&Value::Blob(Bytes::from_static(b"x"))),
            RespValue::bulk_string("x")
        );
        assert_eq!(
            value_to_resp(&Value::List(vec![Value::Int(1), Value::from("a")])),
            RespValue::array(vec![RespValue::integer(1), RespValue::bulk_string("a")])
        );
    }

    #[test]
    fn test_data_bin_reply() {
        let ctx = context();
        assert_eq!(data_bin_reply(&ctx, None), RespValue::integer(0));

        let mut record = Record::new();
        record.bins.insert("b".to_string(), Value::Int(3));
        assert_eq!(data_bin_reply(&ctx, Some(&record)), RespValue::integer(3));
    }
}
