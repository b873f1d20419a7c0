//! Generic Commands
//!
//! - `TYPE key`: the container type recorded in the type bin
//! - `PING [message]`: answered locally

use crate::commands::listener::{Arity, CommandError, CommandListener};
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use crate::store::{Operation, Value};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeListener;

impl TypeListener {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandListener for TypeListener {
    fn name(&self) -> &'static str {
        "type"
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
            .operate(None, &key, &[Operation::get(&ctx.type_bin)])
            .await?;

        let name = match record.as_ref().and_then(|r| r.get(&ctx.type_bin)) {
            Some(Value::Str(name)) => name.as_str(),
            _ => "none",
        };
        Ok(RespValue::simple_string(name))
    }
}

/// Replies `PONG`, or echoes the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingListener;

impl PingListener {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandListener for PingListener {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    async fn execute(
        &self,
        _ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<RespValue, CommandError> {
        match cmd.arg_count() {
            1 => Ok(RespValue::pong()),
            2 => Ok(RespValue::bulk_string(cmd.key().to_vec())),
            _ => Err(CommandError::WrongArity {
                command: self.name(),
            }),
        }
    }
}
