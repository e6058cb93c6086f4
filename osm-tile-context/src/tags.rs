//! Tag decoding over the two PBF tag encodings.
//!
//! Keys and values are ids into the block's string table. Nodes from a
//! `DenseNodes` group share one flat `keys_vals` array: each node's tags are
//! `(key, value)` id pairs terminated by a key id of zero. Ways and relations
//! carry parallel `keys`/`vals` id arrays of equal length.

use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::Arc;

/// Block-scoped string table with a reverse lookup map.
///
/// Replaced wholesale at every block boundary; `generation` counts the
/// replacements so tag sources can tell which table they were decoded
/// against.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    positions: FxHashMap<String, u32>,
    generation: u64,
}

impl StringTable {
    /// Create an empty, never-loaded table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a new block's strings.
    ///
    /// For repeated strings the first position wins.
    pub fn load(&mut self, strings: Vec<String>) {
        self.positions.clear();
        for (i, s) in strings.iter().enumerate() {
            self.positions.entry(s.clone()).or_insert(i as u32);
        }
        self.strings = strings;
        self.generation += 1;
    }

    /// True once a block has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    /// Number of loads so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Position of a string, `None` if the block never uses it.
    pub fn position(&self, s: &str) -> Option<u32> {
        self.positions.get(s).copied()
    }

    /// String at a position; out-of-range ids read as empty.
    pub fn get(&self, id: u32) -> &str {
        self.strings.get(id as usize).map_or("", String::as_str)
    }

    /// Number of strings in the table.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table holds no strings.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Tag storage of the current primitive.
#[derive(Debug, Clone, Default)]
pub enum TagSource {
    /// No primitive active, or the table it was decoded against was replaced.
    #[default]
    None,

    /// Dense node: a `[start, end)` slice of the group's shared `keys_vals`.
    Dense {
        key_vals: Arc<[u32]>,
        range: Range<usize>,
        generation: u64,
    },

    /// Way or relation: parallel key/value id arrays.
    List {
        keys: Vec<u32>,
        vals: Vec<u32>,
        generation: u64,
    },
}

impl TagSource {
    /// String-table generation the source was decoded against.
    pub fn generation(&self) -> Option<u64> {
        match self {
            TagSource::None => None,
            TagSource::Dense { generation, .. } | TagSource::List { generation, .. } => {
                Some(*generation)
            }
        }
    }

    /// Value id for `key_id`, if the primitive carries that key.
    pub fn find_value_id(&self, key_id: u32) -> Option<u32> {
        match self {
            TagSource::None => None,
            TagSource::Dense {
                key_vals, range, ..
            } => dense_pairs(key_vals, range.clone())
                .find(|&(k, _)| k == key_id)
                .map(|(_, v)| v),
            TagSource::List { keys, vals, .. } => keys
                .iter()
                .zip(vals.iter())
                .find(|(&k, _)| k == key_id)
                .map(|(_, &v)| v),
        }
    }

    /// All `(key_id, value_id)` pairs in storage order.
    pub fn pairs(&self) -> Box<dyn Iterator<Item = (u32, u32)> + '_> {
        match self {
            TagSource::None => Box::new(std::iter::empty()),
            TagSource::Dense {
                key_vals, range, ..
            } => Box::new(dense_pairs(key_vals, range.clone())),
            TagSource::List { keys, vals, .. } => {
                Box::new(keys.iter().copied().zip(vals.iter().copied()))
            }
        }
    }
}

/// Walk the `(key, value)` pairs of one dense node, stopping at the zero
/// terminator or the end of the range.
///
/// The value id is always consumed with its key; a trailing key with no
/// value is treated as the end of the list.
fn dense_pairs(key_vals: &[u32], range: Range<usize>) -> impl Iterator<Item = (u32, u32)> + '_ {
    let end = range.end.min(key_vals.len());
    let mut pos = range.start;
    std::iter::from_fn(move || {
        if pos >= end {
            return None;
        }
        let key = key_vals[pos];
        if key == 0 || pos + 1 >= end {
            return None;
        }
        let val = key_vals[pos + 1];
        pos += 2;
        Some((key, val))
    })
}

/// Split a `DenseNodes.keys_vals` array into per-node `[start, end)` ranges.
///
/// Node `i` of the group owns `ranges[i]`; the range excludes the zero
/// terminator. An empty `keys_vals` means no node in the group has tags, and
/// `node_count` empty ranges are returned.
pub fn dense_tag_ranges(key_vals: &[u32], node_count: usize) -> Vec<Range<usize>> {
    if key_vals.is_empty() {
        return vec![0..0; node_count];
    }

    let mut ranges = Vec::with_capacity(node_count);
    let mut pos = 0;
    while ranges.len() < node_count {
        let start = pos;
        while pos < key_vals.len() && key_vals[pos] != 0 {
            pos += 2;
        }
        let end = pos.min(key_vals.len());
        ranges.push(start..end);
        // step over the terminator
        pos = (pos + 1).min(key_vals.len());
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StringTable {
        let mut t = StringTable::new();
        t.load(
            ["", "highway", "primary", "name", "Main St", "amenity", "cafe"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        t
    }

    #[test]
    fn test_string_table_positions() {
        let t = table();
        assert!(t.is_loaded());
        assert_eq!(t.position("name"), Some(3));
        assert_eq!(t.position("surface"), None);
        assert_eq!(t.get(4), "Main St");
        assert_eq!(t.get(99), "");
        assert_eq!(t.len(), 7);
    }

    #[test]
    fn test_reload_bumps_generation() {
        let mut t = table();
        let g = t.generation();
        t.load(vec![String::new(), "other".into()]);
        assert_eq!(t.generation(), g + 1);
        assert_eq!(t.position("highway"), None);
        assert_eq!(t.position("other"), Some(1));
    }

    #[test]
    fn test_dense_lookup_stops_at_terminator() {
        // node A: highway=primary, name=Main St; node B: amenity=cafe
        let kv: Arc<[u32]> = Arc::from(vec![1, 2, 3, 4, 0, 5, 6, 0]);
        let a = TagSource::Dense {
            key_vals: kv.clone(),
            range: 0..5,
            generation: 1,
        };
        assert_eq!(a.find_value_id(1), Some(2));
        assert_eq!(a.find_value_id(3), Some(4));
        assert_eq!(a.find_value_id(5), None);

        let b = TagSource::Dense {
            key_vals: kv,
            range: 5..8,
            generation: 1,
        };
        assert_eq!(b.find_value_id(5), Some(6));
        assert_eq!(b.find_value_id(1), None);
    }

    #[test]
    fn test_dense_value_equal_to_key_id_is_not_a_key() {
        // name=<string 1>; a lookup of key 1 must not match the value slot
        let kv: Arc<[u32]> = Arc::from(vec![3, 1, 0]);
        let src = TagSource::Dense {
            key_vals: kv,
            range: 0..3,
            generation: 1,
        };
        assert_eq!(src.find_value_id(1), None);
        assert_eq!(src.find_value_id(3), Some(1));
    }

    #[test]
    fn test_list_lookup() {
        let src = TagSource::List {
            keys: vec![1, 3],
            vals: vec![2, 4],
            generation: 1,
        };
        assert_eq!(src.find_value_id(3), Some(4));
        assert_eq!(src.find_value_id(5), None);
        assert_eq!(src.pairs().collect::<Vec<_>>(), vec![(1, 2), (3, 4)]);
        assert_eq!(src.generation(), Some(1));
        assert_eq!(TagSource::None.generation(), None);
    }

    #[test]
    fn test_dense_tag_ranges() {
        let kv = [1, 2, 3, 4, 0, 0, 5, 6, 0];
        let ranges = dense_tag_ranges(&kv, 3);
        assert_eq!(ranges, vec![0..4, 5..5, 6..8]);
    }

    #[test]
    fn test_dense_tag_ranges_without_tags() {
        assert_eq!(dense_tag_ranges(&[], 2), vec![0..0, 0..0]);
    }
}
