//! Debug change history.
//!
//! While the debug flag is on, every successful update is recorded with
//! before/after snapshots and a structural diff of their JSON views.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::patch::values_equal;
use crate::state::AppState;

/// Maximum number of records kept; the oldest is evicted first.
pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Removed,
    TypeChanged,
    Changed,
}

/// One difference between two JSON trees, addressed by dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<Value>| v.as_ref().map(Value::to_string).unwrap_or_else(|| "-".to_string());
        write!(f, "{:?} {}: {} -> {}", self.kind, self.path, show(&self.before), show(&self.after))
    }
}

/// Computes the key-wise differences between two JSON values.
///
/// Objects recurse. Arrays and scalars are compared structurally as leaves.
pub fn diff_values(before: &Value, after: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_into(String::new(), before, after, &mut entries);
    entries
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn diff_into(path: String, before: &Value, after: &Value, entries: &mut Vec<DiffEntry>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let child = join(&path, key);
                match new.get(key) {
                    Some(new_value) => diff_into(child, old_value, new_value, entries),
                    None => entries.push(DiffEntry {
                        path: child,
                        kind: DiffKind::Removed,
                        before: Some(old_value.clone()),
                        after: None,
                    }),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    entries.push(DiffEntry {
                        path: join(&path, key),
                        kind: DiffKind::Added,
                        before: None,
                        after: Some(new_value.clone()),
                    });
                }
            }
        }
        (old, new) if !values_equal(old, new) => {
            let kind = if same_kind(old, new) { DiffKind::Changed } else { DiffKind::TypeChanged };
            entries.push(DiffEntry {
                path,
                kind,
                before: Some(old.clone()),
                after: Some(new.clone()),
            });
        }
        _ => {}
    }
}

/// A recorded update.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub timestamp: SystemTime,
    /// Label passed by the caller of `update_state`.
    pub source: String,
    /// Time since the previous successful update, if there was one.
    pub since_previous: Option<Duration>,
    pub diff: Vec<DiffEntry>,
    pub before: AppState,
    pub after: AppState,
}

impl ChangeRecord {
    pub fn new(source: &str, since_previous: Option<Duration>, before: AppState, after: AppState) -> Self {
        let diff = diff_values(&before.to_value(), &after.to_value());
        Self {
            timestamp: SystemTime::now(),
            source: source.to_string(),
            since_previous,
            diff,
            before,
            after,
        }
    }
}

/// Bounded FIFO of change records.
#[derive(Debug, Default)]
pub struct ChangeHistory {
    records: VecDeque<ChangeRecord>,
}

impl ChangeHistory {
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, record: ChangeRecord) {
        while self.records.len() >= HISTORY_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ChangeRecord> {
        self.records.iter()
    }
}
