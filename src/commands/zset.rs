//! Sorted Set Commands
//!
//! A sorted set lives in the data bin as a map of `member -> encoded score`
//! (see [`crate::score`]). The store ranks map entries by value, so score
//! intervals become value ranges and score ranks become value ranks.
//!
//! - `ZCOUNT key min max`
//! - `ZREMRANGEBYSCORE key min max`
//! - `ZREMRANGEBYRANK key start stop`
//! - `ZADD key [NX|XX] score member [score member ...]`

use crate::commands::listener::{
    data_bin_reply, Arity, CommandError, CommandListener, INTERNAL_ERROR,
};
use crate::connection::ResponseSink;
use crate::context::Context;
use crate::protocol::{RequestCommand, RespValue};
use crate::score::{lower_bound, parse_score, score_value, upper_bound, ScoreError};
use crate::store::{
    Key, MapOperation, MapReturnType, MapWriteMode, Operation, StoreError, Value, ValueType,
};
use async_trait::async_trait;
use std::io;

/// Which range command a [`RangeListener`] serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// `ZCOUNT`
    Count,
    /// `ZREMRANGEBYSCORE`
    RemoveByScore,
    /// `ZREMRANGEBYRANK`
    RemoveByRank,
}

/// Counts or removes a range of sorted set members.
///
/// Every store failure is answered with integer 0 instead of an error.
#[derive(Debug, Clone, Copy)]
pub struct RangeListener {
    kind: RangeKind,
}

impl RangeListener {
    pub const fn new(kind: RangeKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> RangeKind {
        self.kind
    }

    /// Builds the store operation for a score interval command.
    fn score_range_op(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<Operation, CommandError> {
        let begin = lower_bound(bound_arg(cmd, 2)?)?;
        let end = upper_bound(bound_arg(cmd, 3)?)?;

        Ok(match self.kind {
            RangeKind::Count => MapOperation::get_by_value_range(
                &ctx.bin,
                Some(begin),
                Some(end),
                MapReturnType::Count,
            ),
            _ => MapOperation::remove_by_value_range(
                &ctx.bin,
                Some(begin),
                Some(end),
                MapReturnType::Count,
            ),
        })
    }

    /// Turns `start stop` ranks into `(index, count)`.
    ///
    /// Negative ranks need the current size, fetched first. Returns `None`
    /// when that fetch finds no record.
    async fn resolve_ranks(
        &self,
        ctx: &Context,
        key: &Key,
        start: i64,
        stop: i64,
    ) -> Result<Option<(i64, i64)>, CommandError> {
        if start >= 0 && stop >= 0 {
            return Ok(Some((start, rank_count(start, stop))));
        }

        let record = ctx
            .client
            .operate(None, key, &[MapOperation::size(&ctx.bin)])
            .await?;
        let Some(record) = record else {
            return Ok(None);
        };
        let size = record.get_int(&ctx.bin).unwrap_or(0);

        let start = if start < 0 {
            size.saturating_add(start).max(0)
        } else {
            start
        };
        let stop = if stop < 0 { size.saturating_add(stop) } else { stop };

        Ok(Some((start, rank_count(start, stop))))
    }
}

#[async_trait]
impl CommandListener for RangeListener {
    fn name(&self) -> &'static str {
        match self.kind {
            RangeKind::Count => "zcount",
            RangeKind::RemoveByScore => "zremrangebyscore",
            RangeKind::RemoveByRank => "zremrangebyrank",
        }
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(4)
    }

    async fn execute(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<RespValue, CommandError> {
        let key = self.create_key(ctx, cmd.key());

        let op = match self.kind {
            RangeKind::Count | RangeKind::RemoveByScore => self.score_range_op(ctx, cmd)?,
            RangeKind::RemoveByRank => {
                let start = rank_arg(cmd, 2)?;
                let stop = rank_arg(cmd, 3)?;
                match self.resolve_ranks(ctx, &key, start, stop).await? {
                    Some((index, count)) => MapOperation::remove_by_rank_range(
                        &ctx.bin,
                        index,
                        count,
                        MapReturnType::Count,
                    ),
                    None => return Ok(RespValue::integer(0)),
                }
            }
        };

        let policy = op.is_write().then_some(&ctx.policies.default);
        let record = ctx.client.operate(policy, &key, &[op]).await?;

        Ok(data_bin_reply(ctx, record.as_ref()))
    }

    fn write_error(&self, sink: &mut dyn ResponseSink, _err: &StoreError) -> io::Result<()> {
        sink.write_integer(0)
    }
}

/// Members in ranks `start..=stop`, never negative.
fn rank_count(start: i64, stop: i64) -> i64 {
    stop.saturating_sub(start).saturating_add(1).max(0)
}

fn bound_arg(cmd: &RequestCommand, index: usize) -> Result<&str, ScoreError> {
    cmd.arg_str(index).ok_or(ScoreError::InvalidBound)
}

fn rank_arg(cmd: &RequestCommand, index: usize) -> Result<i64, CommandError> {
    cmd.arg_str(index)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CommandError::invalid("value is not an integer or out of range"))
}

/// `ZADD key [NX|XX] score member [score member ...]`
///
/// Replies with the number of members added. Tags the record as a sorted
/// set in the same operate call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZaddListener;

impl ZaddListener {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandListener for ZaddListener {
    fn name(&self) -> &'static str {
        "zadd"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(4)
    }

    async fn execute(
        &self,
        ctx: &Context,
        cmd: &RequestCommand,
    ) -> Result<RespValue, CommandError> {
        let mut nx = false;
        let mut xx = false;
        let mut next = 2;
        while let Some(flag) = cmd.arg_str(next) {
            if flag.eq_ignore_ascii_case("NX") {
                nx = true;
            } else if flag.eq_ignore_ascii_case("XX") {
                xx = true;
            } else {
                break;
            }
            next += 1;
        }

        if nx && xx {
            return Err(CommandError::invalid(
                "XX and NX options at the same time are not compatible",
            ));
        }

        let pairs = &cmd.args()[next..];
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(CommandError::invalid("syntax error"));
        }

        let items = pairs
            .chunks(2)
            .map(|pair| -> Result<(Value, Value), ScoreError> {
                let score = std::str::from_utf8(&pair[0])
                    .map_err(|_| ScoreError::InvalidScore)
                    .and_then(parse_score)?;
                let member = Value::Str(String::from_utf8_lossy(&pair[1]).into_owned());
                Ok((member, score_value(score)))
            })
            .collect::<Result<Vec<_>, ScoreError>>()?;

        let (policy, mode) = if xx {
            (&ctx.policies.update_only, MapWriteMode::UpdateOnly)
        } else if nx {
            (&ctx.policies.default, MapWriteMode::CreateOnly)
        } else {
            (&ctx.policies.default, MapWriteMode::Update)
        };

        let key = self.create_key(ctx, cmd.key());
        let ops = [
            MapOperation::size(&ctx.bin),
            self.type_op(ctx, ValueType::ZSet),
            MapOperation::put_items(&ctx.bin, items, mode),
        ];
        let record = ctx.client.operate(Some(policy), &key, &ops).await?;

        // The data bin holds [size before, size after].
        let added = match record.as_ref().and_then(|r| r.get(&ctx.bin)) {
            Some(Value::List(sizes)) => match (sizes.first(), sizes.last()) {
                (Some(Value::Int(before)), Some(Value::Int(after))) => after - before,
                _ => 0,
            },
            _ => 0,
        };

        Ok(RespValue::integer(added))
    }

    fn write_error(&self, sink: &mut dyn ResponseSink, err: &StoreError) -> io::Result<()> {
        match err {
            StoreError::KeyNotFound => sink.write_integer(0),
            _ => sink.write_error_text(INTERNAL_ERROR),
        }
    }
}
