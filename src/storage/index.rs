//! Secondary indexes: key to row-identifier mappings.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::types::{RowId, Value};

/// Key-to-RID mapping kept consistent with primary row storage.
///
/// The key is the tuple of values at the index's key columns. Inserts are
/// infallible under a valid key; implementations provide their own internal
/// concurrency control so concurrent maintenance from different
/// transactions is safe.
pub trait RowIndex: Send + Sync {
    /// Adds an entry mapping `key` to `rid`.
    fn insert(&self, key: &[Value], rid: RowId);

    /// Removes the entry mapping `key` to `rid`. Returns `false` if no such
    /// entry existed.
    fn delete(&self, key: &[Value], rid: RowId) -> bool;

    /// Returns all row identifiers stored under `key`, in RID order.
    fn get(&self, key: &[Value]) -> Vec<RowId>;

    /// Returns the number of (key, rid) entries.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes a key value tuple into an unambiguous byte string.
///
/// One tag byte per value, fixed-width big-endian for numerics and a
/// length prefix for variable-width values. The encoding is injective,
/// which is all point lookups need; byte ordering follows value ordering
/// within a type for integers but is not a full ordering contract.
fn encode_key(key: &[Value]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(key.len() * 9);
    for value in key {
        match value {
            Value::Null => buf.push(0x00),
            Value::Bool(b) => {
                buf.push(0x01);
                buf.push(u8::from(*b));
            }
            Value::Int(i) => {
                buf.push(0x02);
                // Flip the sign bit so byte order matches numeric order.
                buf.extend_from_slice(&(*i as u64 ^ (1 << 63)).to_be_bytes());
            }
            Value::Float(f) => {
                buf.push(0x03);
                buf.extend_from_slice(&f.to_bits().to_be_bytes());
            }
            Value::String(s) => {
                buf.push(0x04);
                buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                buf.push(0x05);
                buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
                buf.extend_from_slice(b);
            }
        }
    }
    buf
}

/// In-memory ordered index over encoded keys.
#[derive(Debug, Default)]
pub struct BTreeIndex {
    /// Encoded key to the set of rows carrying that key.
    entries: RwLock<BTreeMap<Vec<u8>, BTreeSet<RowId>>>,
}

impl BTreeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowIndex for BTreeIndex {
    fn insert(&self, key: &[Value], rid: RowId) {
        self.entries
            .write()
            .entry(encode_key(key))
            .or_default()
            .insert(rid);
    }

    fn delete(&self, key: &[Value], rid: RowId) -> bool {
        let mut entries = self.entries.write();
        let encoded = encode_key(key);
        let Some(rids) = entries.get_mut(&encoded) else {
            return false;
        };
        let removed = rids.remove(&rid);
        if rids.is_empty() {
            entries.remove(&encoded);
        }
        removed
    }

    fn get(&self, key: &[Value]) -> Vec<RowId> {
        self.entries
            .read()
            .get(&encode_key(key))
            .map(|rids| rids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.entries.read().values().map(BTreeSet::len).sum()
    }
}
