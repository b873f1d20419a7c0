//! Map Cardinality
//!
//! `ZCARD key` and `HLEN key` both report the number of entries in the
//! map held by the data bin.

use crate::commands::listener::{data_bin_reply, Arity, CommandError, CommandListener};
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use crate::store::MapOperation;
use async_trait::async_trait;

/// Replies with the size of the map at the key, 0 if the key is absent.
///
/// Store failures use the default `ERR Internal error` reply.
#[derive(Debug, Clone, Copy)]
pub struct MapSizeListener {
    name: &'static str,
}

impl MapSizeListener {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl CommandListener for MapSizeListener {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(2)
    }

    async fn execute(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<RespValue, CommandError> {
        let key = self.create_key(ctx, cmd.key());
        let record = ctx
            .client
            .operate(None, &key, &[MapOperation::size(&ctx.bin)])
            .await?;

        Ok(data_bin_reply(ctx, record.as_ref()))
    }
}
