//! String Commands
//!
//! - `SETNX key value`: set only if the key does not exist

use crate::commands::listener::{Arity, CommandError, CommandListener, INTERNAL_ERROR};
use crate::connection::ResponseSink;
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use crate::store::{Bin, Operation, StoreError, Value, ValueType};
use async_trait::async_trait;
use std::io;

/// Writes the value with the create-only policy.
///
/// Replies 1 when the record was created and 0 when it already existed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetnxListener;

impl SetnxListener {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandListener for SetnxListener {
    fn name(&self) -> &'static str {
        "setnx"
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(3)
    }

    async fn execute(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<RespValue, CommandError> {
        let value = cmd.arg(2).cloned().unwrap_or_default();
        let key = self.create_key(ctx, cmd.key());
        let ops = [
            Operation::put(Bin::new(ctx.bin.as_str(), Value::Blob(value))),
            self.type_op(ctx, ValueType::String),
        ];

        ctx.client
            .operate(Some(&ctx.policies.create_only), &key, &ops)
            .await?;

        Ok(RespValue::integer(1))
    }

    fn write_error(&self, sink: &mut dyn ResponseSink, err: &StoreError) -> io::Result<()> {
        match err {
            StoreError::KeyExists => sink.write_integer(0),
            _ => sink.write_error_text(INTERNAL_ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::connection::BufferedSink;
    use crate::store::{Key, MemoryStore, Policies};
    use bytes::Bytes;
    use std::sync::Arc;

    async fn setnx(ctx: &Context, key: &str, value: &str) -> RespValue {
        let mut sink = BufferedSink::new();
        let cmd = RequestCommand::from_parts(["SETNX", key, value]).unwrap();
        SetnxListener.handle(ctx, &cmd, &mut sink).await.unwrap();
        sink.replies.remove(0)
    }

    #[tokio::test]
    async fn test_setnx_creates_once() {
        let ctx = Context::new(
            &StoreConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(Policies::new()),
        );

        assert_eq!(setnx(&ctx, "k", "first").await, RespValue::integer(1));
        assert_eq!(setnx(&ctx, "k", "second").await, RespValue::integer(0));

        let record = ctx
            .client
            .operate(
                None,
                &Key::new("test", "redis", "k"),
                &[Operation::get("b"), Operation::get("t")],
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.get("b"),
            Some(&Value::Blob(Bytes::from_static(b"first")))
        );
        assert_eq!(record.get("t"), Some(&Value::from("string")));
    }
}
