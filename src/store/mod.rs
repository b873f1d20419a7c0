//! Record Store Boundary
//!
//! This module defines the contract between the command layer and the
//! map/document-oriented record store it translates commands onto.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   operate(policy, key, ops)   ┌─────────────────┐
//! │ CommandListener │──────────────────────────────>│   dyn Store     │
//! │                 │<──────────────────────────────│                 │
//! └─────────────────┘   Result<Option<Record>>      └────────┬────────┘
//!                                                            │
//!                                                            ▼
//!                                                   ┌─────────────────┐
//!                                                   │  MemoryStore    │
//!                                                   │  (64 shards)    │
//!                                                   └─────────────────┘
//! ```
//!
//! ## Persisted Record Layout
//!
//! One record per external key, with two bins:
//! - the data bin holds the container value (a map for sorted sets)
//! - the type bin holds the name of the logical container type
//!
//! ## Modules
//!
//! - `value`: values, bins, keys and records
//! - `operation`: the operations an operate call can carry
//! - `policy`: the shared write policies
//! - `memory`: the in-memory store

pub mod error;
pub mod memory;
pub mod operation;
pub mod policy;
pub mod value;

use async_trait::async_trait;
use std::fmt;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreStats};
pub use operation::{MapOperation, MapReturnType, MapWriteMode, Operation};
pub use policy::{Policies, RecordExistsAction, WritePolicy};
pub use value::{Bin, Key, Record, Value};

/// A store client shared by all connections.
///
/// Implementations must be safe for concurrent use; the command layer adds
/// no locking of its own.
#[async_trait]
pub trait Store: Send + Sync {
    /// Applies `ops` to the record at `key` and completes exactly once.
    ///
    /// Returns `Ok(None)` when the record does not exist and none of the
    /// operations create it. Otherwise the returned record holds one result
    /// per operated bin.
    async fn operate(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        ops: &[Operation],
    ) -> StoreResult<Option<Record>>;
}

/// The logical container type recorded in a record's type bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    List,
    Set,
    ZSet,
    Hash,
    Stream,
}

impl ValueType {
    /// The name stored in the type bin.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Set => "set",
            ValueType::ZSet => "zset",
            ValueType::Hash => "hash",
            ValueType::Stream => "stream",
        }
    }

    /// Parses a stored type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ValueType::String),
            "list" => Some(ValueType::List),
            "set" => Some(ValueType::Set),
            "zset" => Some(ValueType::ZSet),
            "hash" => Some(ValueType::Hash),
            "stream" => Some(ValueType::Stream),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names_round_trip() {
        for ty in [
            ValueType::String,
            ValueType::List,
            ValueType::Set,
            ValueType::ZSet,
            ValueType::Hash,
            ValueType::Stream,
        ] {
            assert_eq!(ValueType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(ValueType::from_name("none"), None);
    }
}
