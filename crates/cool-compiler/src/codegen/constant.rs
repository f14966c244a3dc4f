//! Constant pools for integer and string literals.
//!
//! Both pools deduplicate: a literal's index is assigned the first time it is
//! seen and returned again on every later request. Indexes become the label
//! suffix of the emitted constant (`int_const3`, `str_const5`).
//!
//! Every string also records its byte length in the integer pool, because a
//! string object's length field points at an `Int` constant.

use rustc_hash::FxHashMap;

use cool_core::{BOOL, INT, IO, OBJECT, STRING};

/// Integers present in every program.
const SEEDED_INTS: std::ops::RangeInclusive<i32> = 0..=6;

/// Strings present in every program: the empty string and the names of the
/// predefined classes.
const SEEDED_STRINGS: [&str; 6] = ["", OBJECT, IO, INT, STRING, BOOL];

/// A pooled string with the index of its length in the integer pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConstant {
    pub value: String,
    pub length_index: u32,
}

impl StringConstant {
    /// Object size in words: header, length pointer and the NUL-terminated
    /// bytes rounded up to whole words.
    pub fn size_words(&self) -> u32 {
        4 + (self.value.len() as u32 + 4) / 4
    }
}

/// Program-wide literal pools.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    ints: Vec<i32>,
    int_index: FxHashMap<i32, u32>,
    strings: Vec<StringConstant>,
    string_index: FxHashMap<String, u32>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Create a pool holding the seeded integers and strings.
    pub fn new() -> Self {
        let mut pool = Self {
            ints: Vec::new(),
            int_index: FxHashMap::default(),
            strings: Vec::new(),
            string_index: FxHashMap::default(),
        };
        for value in SEEDED_INTS {
            pool.add_int(value);
        }
        for value in SEEDED_STRINGS {
            pool.add_string(value);
        }
        pool
    }

    /// Add or get an integer, returns its index.
    pub fn add_int(&mut self, value: i32) -> u32 {
        if let Some(&idx) = self.int_index.get(&value) {
            return idx;
        }
        let idx = self.ints.len() as u32;
        self.ints.push(value);
        self.int_index.insert(value, idx);
        idx
    }

    /// Add or get a string, returns its index. A new string also adds its
    /// length to the integer pool.
    pub fn add_string(&mut self, value: &str) -> u32 {
        if let Some(&idx) = self.string_index.get(value) {
            return idx;
        }
        let length_index = self.add_int(value.len() as i32);
        let idx = self.strings.len() as u32;
        self.strings.push(StringConstant {
            value: value.to_string(),
            length_index,
        });
        self.string_index.insert(value.to_string(), idx);
        idx
    }

    /// Index of a string already in the pool.
    pub fn string_index(&self, value: &str) -> Option<u32> {
        self.string_index.get(value).copied()
    }

    /// Index of the empty string.
    pub fn empty_string(&self) -> u32 {
        0
    }

    /// Index of the integer zero.
    pub fn zero(&self) -> u32 {
        0
    }

    /// Integers in index order.
    pub fn ints(&self) -> &[i32] {
        &self.ints
    }

    /// Strings in index order.
    pub fn strings(&self) -> &[StringConstant] {
        &self.strings
    }

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }
}
