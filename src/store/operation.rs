//! Store Operations
//!
//! The operations a command can ask the store to apply to one record in a
//! single operate call. Map operations work on a bin holding a
//! [`Value::Map`]; entries are ranked by value (ties broken by map key),
//! which is the only ordering primitive the store offers.

use crate::store::value::{Bin, Value};

/// What a map operation hands back for the entries it selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapReturnType {
    /// Nothing; the bin result is `Nil`.
    None,
    /// The number of selected entries.
    Count,
}

/// Write mode for map item puts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapWriteMode {
    /// Insert new entries and overwrite existing ones.
    #[default]
    Update,
    /// Insert new entries only; existing entries are left untouched.
    CreateOnly,
    /// Overwrite existing entries only; new keys are skipped.
    UpdateOnly,
}

/// An operation on a map bin.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOperation {
    /// Number of entries in the map. A missing bin has size 0.
    Size { bin: String },

    /// Put entries into the map, creating it when missing.
    /// Returns the map size after the write.
    PutItems {
        bin: String,
        items: Vec<(Value, Value)>,
        mode: MapWriteMode,
    },

    /// Select entries whose value lies in `[begin, end)`.
    /// `None` leaves that side unbounded.
    GetByValueRange {
        bin: String,
        begin: Option<Value>,
        end: Option<Value>,
        return_type: MapReturnType,
    },

    /// Remove entries whose value lies in `[begin, end)`.
    RemoveByValueRange {
        bin: String,
        begin: Option<Value>,
        end: Option<Value>,
        return_type: MapReturnType,
    },

    /// Remove `count` entries starting at rank `index`.
    /// A negative `index` counts from the highest rank.
    RemoveByRankRange {
        bin: String,
        index: i64,
        count: i64,
        return_type: MapReturnType,
    },
}

impl MapOperation {
    pub fn size(bin: &str) -> Operation {
        Operation::Map(MapOperation::Size {
            bin: bin.to_string(),
        })
    }

    pub fn put_items(bin: &str, items: Vec<(Value, Value)>, mode: MapWriteMode) -> Operation {
        Operation::Map(MapOperation::PutItems {
            bin: bin.to_string(),
            items,
            mode,
        })
    }

    pub fn get_by_value_range(
        bin: &str,
        begin: Option<Value>,
        end: Option<Value>,
        return_type: MapReturnType,
    ) -> Operation {
        Operation::Map(MapOperation::GetByValueRange {
            bin: bin.to_string(),
            begin,
            end,
            return_type,
        })
    }

    pub fn remove_by_value_range(
        bin: &str,
        begin: Option<Value>,
        end: Option<Value>,
        return_type: MapReturnType,
    ) -> Operation {
        Operation::Map(MapOperation::RemoveByValueRange {
            bin: bin.to_string(),
            begin,
            end,
            return_type,
        })
    }

    pub fn remove_by_rank_range(
        bin: &str,
        index: i64,
        count: i64,
        return_type: MapReturnType,
    ) -> Operation {
        Operation::Map(MapOperation::RemoveByRankRange {
            bin: bin.to_string(),
            index,
            count,
            return_type,
        })
    }

    /// The bin this operation targets.
    pub fn bin(&self) -> &str {
        match self {
            MapOperation::Size { bin }
            | MapOperation::PutItems { bin, .. }
            | MapOperation::GetByValueRange { bin, .. }
            | MapOperation::RemoveByValueRange { bin, .. }
            | MapOperation::RemoveByRankRange { bin, .. } => bin,
        }
    }
}

/// A single operation inside an operate call.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Overwrite a bin. Produces no result.
    Put(Bin),
    /// Read a bin as stored.
    Get(String),
    Map(MapOperation),
}

impl Operation {
    pub fn put(bin: Bin) -> Self {
        Operation::Put(bin)
    }

    pub fn get(bin: &str) -> Self {
        Operation::Get(bin.to_string())
    }

    /// True if the operation modifies the record.
    pub fn is_write(&self) -> bool {
        match self {
            Operation::Put(_) => true,
            Operation::Get(_) => false,
            Operation::Map(op) => matches!(
                op,
                MapOperation::PutItems { .. }
                    | MapOperation::RemoveByValueRange { .. }
                    | MapOperation::RemoveByRankRange { .. }
            ),
        }
    }

    /// True if the operation brings a missing record into existence.
    pub fn creates_record(&self) -> bool {
        matches!(
            self,
            Operation::Put(_) | Operation::Map(MapOperation::PutItems { .. })
        )
    }
}
