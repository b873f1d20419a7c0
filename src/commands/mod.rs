//! Command Listener Module
//!
//! This module translates decoded commands into store operations. Each
//! command has a [`CommandListener`]; [`dispatch`] finds it by name and
//! lets it run to exactly one reply.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandDecoder  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   dispatch()    │  (this module)
//! │                 │
//! │  - Lookup       │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   dyn Store     │  (store module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Sorted Set Commands
//! - `ZCARD`, `ZCOUNT`, `ZADD`
//! - `ZREMRANGEBYSCORE`, `ZREMRANGEBYRANK`
//!
//! ### Hash Commands
//! - `HLEN`
//!
//! ### String Commands
//! - `SETNX`
//!
//! ### Generic Commands
//! - `TYPE`, `PING`

pub mod generic;
pub mod listener;
pub mod map;
pub mod string;
pub mod zset;

pub use generic::{PingListener, TypeListener};
pub use listener::{value_to_resp, Arity, CommandError, CommandListener, INTERNAL_ERROR};
pub use map::MapSizeListener;
pub use string::SetnxListener;
pub use zset::{RangeKind, RangeListener, ZaddListener};

use crate::connection::{send_reply, ReplyError, ResponseSink};
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use tracing::debug;

static ZCARD: MapSizeListener = MapSizeListener::new("zcard");
static HLEN: MapSizeListener = MapSizeListener::new("hlen");
static ZCOUNT: RangeListener = RangeListener::new(RangeKind::Count);
static ZREMRANGEBYSCORE: RangeListener = RangeListener::new(RangeKind::RemoveByScore);
static ZREMRANGEBYRANK: RangeListener = RangeListener::new(RangeKind::RemoveByRank);
static ZADD: ZaddListener = ZaddListener::new();
static SETNX: SetnxListener = SetnxListener::new();
static TYPE: TypeListener = TypeListener::new();
static PING: PingListener = PingListener::new();

/// Finds the listener for an upper-case command name.
pub fn lookup(name: &str) -> Option<&'static dyn CommandListener> {
    let listener: &'static dyn CommandListener = match name {
        "ZCARD" => &ZCARD,
        "HLEN" => &HLEN,
        "ZCOUNT" => &ZCOUNT,
        "ZREMRANGEBYSCORE" => &ZREMRANGEBYSCORE,
        "ZREMRANGEBYRANK" => &ZREMRANGEBYRANK,
        "ZADD" => &ZADD,
        "SETNX" => &SETNX,
        "TYPE" => &TYPE,
        "PING" => &PING,
        _ => return None,
    };
    Some(listener)
}

/// Runs `cmd` and writes its reply to `sink`.
///
/// Unknown commands get an error reply. An `Err` means the reply could not
/// be delivered and the sink has been closed.
pub async fn dispatch(
    ctx: &Context,
    cmd: &RequestCommand,
    sink: &mut dyn ResponseSink,
) -> Result<(), ReplyError> {
    match lookup(cmd.name()) {
        Some(listener) => listener.handle(ctx, cmd, sink).await,
        None => {
            debug!(command = cmd.name(), "Unknown command");
            let original = cmd.arg(0).map(|a| String::from_utf8_lossy(a).into_owned());
            let reply = RespValue::error(format!(
                "ERR unknown command '{}'",
                original.as_deref().unwrap_or_default()
            ));
            send_reply(sink, &reply).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::connection::BufferedSink;
    use crate::store::{
        Key, MemoryStore, Operation, Policies, Record, Store, StoreError, StoreResult, WritePolicy,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts operate calls before handing them to a memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn operate(
            &self,
            policy: Option<&WritePolicy>,
            key: &Key,
            ops: &[Operation],
        ) -> StoreResult<Option<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.operate(policy, key, ops).await
        }
    }

    /// Fails every operate call with the same error.
    struct FailingStore(StoreError);

    #[async_trait]
    impl Store for FailingStore {
        async fn operate(
            &self,
            _policy: Option<&WritePolicy>,
            _key: &Key,
            _ops: &[Operation],
        ) -> StoreResult<Option<Record>> {
            Err(self.0.clone())
        }
    }

    fn context_with(store: Arc<dyn Store>) -> Context {
        Context::new(&StoreConfig::default(), store, Arc::new(Policies::new()))
    }

    async fn send(ctx: &Context, parts: &[&str]) -> RespValue {
        let mut sink = BufferedSink::new();
        let cmd = RequestCommand::from_parts(parts).unwrap();
        dispatch(ctx, &cmd, &mut sink).await.unwrap();
        assert_eq!(sink.replies.len(), 1);
        assert_eq!(sink.flushes, 1);
        sink.replies.remove(0)
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("ZCARD").map(|l| l.name()), Some("zcard"));
        assert_eq!(lookup("HLEN").map(|l| l.name()), Some("hlen"));
        assert_eq!(
            lookup("ZREMRANGEBYRANK").map(|l| l.name()),
            Some("zremrangebyrank")
        );
        assert_eq!(ZREMRANGEBYRANK.kind(), RangeKind::RemoveByRank);
        assert!(lookup("zcard").is_none());
        assert!(lookup("GET").is_none());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let ctx = context_with(Arc::new(MemoryStore::new()));
        assert_eq!(
            send(&ctx, &["foo", "bar"]).await,
            RespValue::error("ERR unknown command 'foo'")
        );
    }

    #[tokio::test]
    async fn test_sorted_set_scenario() {
        let ctx = context_with(Arc::new(MemoryStore::new()));

        assert_eq!(send(&ctx, &["ZCARD", "myset"]).await, RespValue::integer(0));
        assert_eq!(
            send(&ctx, &["ZADD", "myset", "1", "a", "2", "b", "3", "c"]).await,
            RespValue::integer(3)
        );
        assert_eq!(send(&ctx, &["ZCARD", "myset"]).await, RespValue::integer(3));
        assert_eq!(
            send(&ctx, &["ZCOUNT", "myset", "1", "2"]).await,
            RespValue::integer(2)
        );
        assert_eq!(
            send(&ctx, &["ZREMRANGEBYSCORE", "myset", "2", "3"]).await,
            RespValue::integer(2)
        );
        assert_eq!(
            send(&ctx, &["ZCOUNT", "myset", "1", "3"]).await,
            RespValue::integer(1)
        );
        assert_eq!(send(&ctx, &["HLEN", "myset"]).await, RespValue::integer(1));
    }

    #[tokio::test]
    async fn test_wrong_arity_never_reaches_store() {
        let store = Arc::new(CountingStore::default());
        let ctx = context_with(store.clone());

        for parts in [
            &["ZCARD"][..],
            &["ZCARD", "a", "b"],
            &["HLEN"],
            &["ZCOUNT", "z", "1"],
            &["ZREMRANGEBYSCORE", "z", "1", "2", "3"],
            &["ZREMRANGEBYRANK", "z"],
            &["ZADD", "z", "1"],
            &["SETNX", "k"],
            &["TYPE"],
        ] {
            let reply = send(&ctx, parts).await;
            let expected = format!(
                "ERR wrong number of arguments for '{}' command",
                parts[0].to_lowercase()
            );
            assert_eq!(reply, RespValue::error(expected));
        }

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_arguments_never_reach_store() {
        let store = Arc::new(CountingStore::default());
        let ctx = context_with(store.clone());

        send(&ctx, &["ZCOUNT", "z", "a", "1"]).await;
        send(&ctx, &["ZREMRANGEBYSCORE", "z", "1", "(b"]).await;
        send(&ctx, &["ZREMRANGEBYRANK", "z", "1.5", "-1"]).await;
        send(&ctx, &["ZADD", "z", "nan", "a"]).await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rank_removal_store_calls() {
        let store = Arc::new(CountingStore::default());
        let ctx = context_with(store.clone());

        // Missing record: the size fetch finds nothing, no removal follows.
        assert_eq!(
            send(&ctx, &["ZREMRANGEBYRANK", "z", "0", "-1"]).await,
            RespValue::integer(0)
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        send(&ctx, &["ZADD", "z", "1", "a", "2", "b"]).await;
        store.calls.store(0, Ordering::SeqCst);

        // Non-negative ranks need no size fetch.
        assert_eq!(
            send(&ctx, &["ZREMRANGEBYRANK", "z", "0", "0"]).await,
            RespValue::integer(1)
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        assert_eq!(
            send(&ctx, &["ZREMRANGEBYRANK", "z", "0", "-1"]).await,
            RespValue::integer(1)
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_store_failure_replies() {
        for err in [StoreError::Timeout, StoreError::Io("connection refused".into())] {
            let ctx = context_with(Arc::new(FailingStore(err)));

            assert_eq!(
                send(&ctx, &["ZCARD", "z"]).await,
                RespValue::error(INTERNAL_ERROR)
            );
            assert_eq!(
                send(&ctx, &["HLEN", "z"]).await,
                RespValue::error(INTERNAL_ERROR)
            );
            assert_eq!(
                send(&ctx, &["ZCOUNT", "z", "0", "1"]).await,
                RespValue::integer(0)
            );
            assert_eq!(
                send(&ctx, &["ZREMRANGEBYSCORE", "z", "0", "1"]).await,
                RespValue::integer(0)
            );
            assert_eq!(
                send(&ctx, &["ZREMRANGEBYRANK", "z", "0", "-1"]).await,
                RespValue::integer(0)
            );
            assert_eq!(
                send(&ctx, &["ZREMRANGEBYRANK", "z", "0", "1"]).await,
                RespValue::integer(0)
            );
        }
    }

    #[tokio::test]
    async fn test_type_conflict() {
        let ctx = context_with(Arc::new(MemoryStore::new()));
        assert_eq!(send(&ctx, &["SETNX", "s", "v"]).await, RespValue::integer(1));
        assert_eq!(
            send(&ctx, &["TYPE", "s"]).await,
            RespValue::simple_string("string")
        );

        assert_eq!(
            send(&ctx, &["ZCARD", "s"]).await,
            RespValue::error(INTERNAL_ERROR)
        );
        assert_eq!(
            send(&ctx, &["ZCOUNT", "s", "-inf", "+inf"]).await,
            RespValue::integer(0)
        );
        assert_eq!(
            send(&ctx, &["ZREMRANGEBYRANK", "s", "0", "-1"]).await,
            RespValue::integer(0)
        );
    }

    #[tokio::test]
    async fn test_failed_reply_closes_sink() {
        let ctx = context_with(Arc::new(FailingStore(StoreError::Timeout)));
        let cmd = RequestCommand::from_parts(["ZCOUNT", "z", "0", "1"]).unwrap();
        let mut sink = BufferedSink::failing();

        let result = dispatch(&ctx, &cmd, &mut sink).await;
        assert!(result.is_err());
        assert!(sink.closed);
        assert!(sink.replies.is_empty());
    }
}
