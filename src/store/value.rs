//! Record Model
//!
//! Values, bins, keys and records as they cross the store boundary.
//!
//! A record is a flat mapping from bin name to [`Value`]. The data bin of a
//! sorted set holds a [`Value::Map`] of `member -> encoded score`, and the
//! type bin holds a [`Value::Str`] naming the logical container type.

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A value stored in (or returned from) a record bin.
///
/// Values are totally ordered so that map entries can be ranked by value.
/// Variants order by kind first (`Nil < Int < Str < Blob < List < Map`),
/// then by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
    Blob(Bytes),
    List(Vec<Value>),
    Map(BTreeMap<Value, Value>),
}

impl Value {
    /// Returns the inner integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the inner map, if this is a `Map`.
    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Blob(_) => "blob",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Blob(b)
    }
}

/// A named value written into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    pub name: String,
    pub value: Value,
}

impl Bin {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Address of a single record: namespace, set and user key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub namespace: String,
    pub set: String,
    pub user_key: String,
}

impl Key {
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key: user_key.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.user_key)
    }
}

/// Bins returned by the store for one record.
///
/// For an operate call, each operated bin holds that operation's result
/// rather than the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub bins: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bin: &str) -> Option<&Value> {
        self.bins.get(bin)
    }

    /// Returns the integer held in `bin`, if any.
    pub fn get_int(&self, bin: &str) -> Option<i64> {
        self.get(bin).and_then(Value::as_int)
    }

    /// Builds a record from per-operation results.
    ///
    /// A bin that received more than one result holds a list of all of
    /// them, in operation order.
    pub(crate) fn from_results(results: Vec<(String, Value)>) -> Self {
        let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
        for (bin, value) in results {
            grouped.entry(bin).or_default().push(value);
        }

        let bins = grouped
            .into_iter()
            .map(|(bin, mut values)| {
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::List(values)
                };
                (bin, value)
            })
            .collect();

        Self { bins }
    }
}
