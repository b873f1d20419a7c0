//! In-Memory Record Store
//!
//! A thread-safe, in-process implementation of [`Store`]. It keeps records
//! in sharded `RwLock<HashMap>`s and implements every [`Operation`] with the
//! semantics the command listeners rely on:
//!
//! - map entries are ranked by value, ties broken by map key
//! - value ranges are half-open `[begin, end)`; `None` is unbounded
//! - rank indices may be negative (counted from the highest rank)
//! - a map operation on a bin holding anything but a map fails with
//!   [`StoreError::BinType`]
//! - several results for one bin come back as a [`Value::List`]
//!
//! An operate call is atomic per record: operations run against a copy of
//! the record and the copy is only written back when all of them succeed.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MemoryStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::store::error::{StoreError, StoreResult};
use crate::store::operation::{MapOperation, MapReturnType, MapWriteMode, Operation};
use crate::store::policy::{RecordExistsAction, WritePolicy};
use crate::store::value::{Key, Record, Value};
use crate::store::Store;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

type Bins = HashMap<String, Value>;
type Shard = RwLock<HashMap<Key, Bins>>;

/// Store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub records: u64,
    pub reads: u64,
    pub writes: u64,
    pub failures: u64,
}

/// Sharded in-memory record store.
///
/// Designed to be wrapped in an `Arc` and shared by every connection.
pub struct MemoryStore {
    shards: Vec<Shard>,
    record_count: AtomicU64,
    read_count: AtomicU64,
    write_count: AtomicU64,
    failure_count: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("shards", &self.shards.len())
            .field("records", &self.record_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            shards,
            record_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &Key) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Number of records currently stored.
    pub fn len(&self) -> u64 {
        self.record_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            records: self.record_count.load(Ordering::Relaxed),
            reads: self.read_count.load(Ordering::Relaxed),
            writes: self.write_count.load(Ordering::Relaxed),
            failures: self.failure_count.load(Ordering::Relaxed),
        }
    }

    fn apply(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        ops: &[Operation],
    ) -> StoreResult<Option<Record>> {
        let shard = self.shard(key);

        if !ops.iter().any(Operation::is_write) {
            self.read_count.fetch_add(1, Ordering::Relaxed);
            let records = shard.read().unwrap_or_else(PoisonError::into_inner);
            return match records.get(key) {
                Some(bins) => apply_ops(&mut bins.clone(), ops).map(Some),
                None => Ok(None),
            };
        }

        self.write_count.fetch_add(1, Ordering::Relaxed);
        let action = policy
            .map(|p| p.record_exists_action)
            .unwrap_or_default();

        let mut records = shard.write().unwrap_or_else(PoisonError::into_inner);
        let exists = records.contains_key(key);

        match (action, exists) {
            (RecordExistsAction::CreateOnly, true) => return Err(StoreError::KeyExists),
            (RecordExistsAction::UpdateOnly, false) => return Err(StoreError::KeyNotFound),
            _ => {}
        }

        if !exists && !ops.iter().any(Operation::creates_record) {
            return Ok(None);
        }

        let mut bins = records.get(key).cloned().unwrap_or_default();
        let record = apply_ops(&mut bins, ops)?;

        if records.insert(key.clone(), bins).is_none() {
            self.record_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(Some(record))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn operate(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        ops: &[Operation],
    ) -> StoreResult<Option<Record>> {
        let result = self.apply(policy, key, ops);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

/// Runs `ops` in order against `bins`, collecting per-bin results.
fn apply_ops(bins: &mut Bins, ops: &[Operation]) -> StoreResult<Record> {
    let mut results = Vec::new();

    for op in ops {
        match op {
            Operation::Put(bin) => {
                bins.insert(bin.name.clone(), bin.value.clone());
            }
            Operation::Get(name) => {
                let value = bins.get(name).cloned().unwrap_or(Value::Nil);
                results.push((name.clone(), value));
            }
            Operation::Map(map_op) => {
                let value = apply_map_op(bins, map_op)?;
                results.push((map_op.bin().to_string(), value));
            }
        }
    }

    Ok(Record::from_results(results))
}

fn apply_map_op(bins: &mut Bins, op: &MapOperation) -> StoreResult<Value> {
    match op {
        MapOperation::Size { bin } => {
            let size = map_ref(bins, bin)?.map_or(0, BTreeMap::len);
            Ok(Value::Int(size as i64))
        }
        MapOperation::PutItems { bin, items, mode } => {
            let map = map_mut(bins, bin)?;
            for (k, v) in items {
                match mode {
                    MapWriteMode::Update => {
                        map.insert(k.clone(), v.clone());
                    }
                    MapWriteMode::CreateOnly => {
                        map.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                    MapWriteMode::UpdateOnly => {
                        if let Some(existing) = map.get_mut(k) {
                            *existing = v.clone();
                        }
                    }
                }
            }
            Ok(Value::Int(map.len() as i64))
        }
        MapOperation::GetByValueRange {
            bin,
            begin,
            end,
            return_type,
        } => {
            let matched = map_ref(bins, bin)?.map_or(0, |map| {
                map.values()
                    .filter(|v| in_range(v, begin.as_ref(), end.as_ref()))
                    .count()
            });
            Ok(returned(*return_type, matched))
        }
        MapOperation::RemoveByValueRange {
            bin,
            begin,
            end,
            return_type,
        } => {
            let removed = match map_opt_mut(bins, bin)? {
                Some(map) => {
                    let before = map.len();
                    map.retain(|_, v| !in_range(v, begin.as_ref(), end.as_ref()));
                    before - map.len()
                }
                None => 0,
            };
            Ok(returned(*return_type, removed))
        }
        MapOperation::RemoveByRankRange {
            bin,
            index,
            count,
            return_type,
        } => {
            if *count < 0 {
                return Err(StoreError::ParameterError(format!(
                    "negative rank count {}",
                    count
                )));
            }

            let removed = match map_opt_mut(bins, bin)? {
                Some(map) => {
                    let victims: Vec<Value> = rank_window(map, *index, *count)
                        .into_iter()
                        .cloned()
                        .collect();
                    for k in &victims {
                        map.remove(k);
                    }
                    victims.len()
                }
                None => 0,
            };
            Ok(returned(*return_type, removed))
        }
    }
}

/// Keys of the entries at ranks `[index, index + count)`.
fn rank_window(map: &BTreeMap<Value, Value>, index: i64, count: i64) -> Vec<&Value> {
    let len = map.len() as i64;
    let start = if index < 0 { (len + index).max(0) } else { index };
    if start >= len || count == 0 {
        return Vec::new();
    }
    let end = start.saturating_add(count).min(len);

    let mut ranked: Vec<(&Value, &Value)> = map.iter().collect();
    ranked.sort_by(|(ka, va), (kb, vb)| va.cmp(vb).then_with(|| ka.cmp(kb)));

    ranked[start as usize..end as usize]
        .iter()
        .map(|(k, _)| *k)
        .collect()
}

#[inline]
fn in_range(value: &Value, begin: Option<&Value>, end: Option<&Value>) -> bool {
    begin.map_or(true, |b| value >= b) && end.map_or(true, |e| value < e)
}

fn returned(return_type: MapReturnType, count: usize) -> Value {
    match return_type {
        MapReturnType::None => Value::Nil,
        MapReturnType::Count => Value::Int(count as i64),
    }
}

fn bin_type_error(bin: &str, found: &Value) -> StoreError {
    StoreError::BinType {
        bin: bin.to_string(),
        found: found.kind(),
    }
}

fn map_ref<'a>(bins: &'a Bins, bin: &str) -> StoreResult<Option<&'a BTreeMap<Value, Value>>> {
    match bins.get(bin) {
        None => Ok(None),
        Some(Value::Map(map)) => Ok(Some(map)),
        Some(other) => Err(bin_type_error(bin, other)),
    }
}

fn map_opt_mut<'a>(
    bins: &'a mut Bins,
    bin: &str,
) -> StoreResult<Option<&'a mut BTreeMap<Value, Value>>> {
    match bins.get_mut(bin) {
        None => Ok(None),
        Some(Value::Map(map)) => Ok(Some(map)),
        Some(other) => Err(bin_type_error(bin, other)),
    }
}

fn map_mut<'a>(bins: &'a mut Bins, bin: &str) -> StoreResult<&'a mut BTreeMap<Value, Value>> {
    let value = bins
        .entry(bin.to_string())
        .or_insert_with(|| Value::Map(BTreeMap::new()));
    match value {
        Value::Map(map) => Ok(map),
        other => Err(bin_type_error(bin, other)),
    }
}
