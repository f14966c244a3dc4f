//! Unique label generation for control flow.
//!
//! Every construct that needs jump targets (`if`, `while`, comparisons,
//! dispatch null checks, `case`) asks for labels of its own kind. Each kind
//! has an independent, monotonically increasing counter, so `else_0`,
//! `else_1`, ... never collide however often a construct repeats.

use rustc_hash::FxHashMap;

/// Hands out `kind_N` labels.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    counters: FxHashMap<&'static str, u32>,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next number for `kind`.
    pub fn next_id(&mut self, kind: &'static str) -> u32 {
        let counter = self.counters.entry(kind).or_insert(0);
        let id = *counter;
        *counter += 1;
        id
    }

    /// Reserve the next label of `kind`.
    pub fn next(&mut self, kind: &'static str) -> String {
        let id = self.next_id(kind);
        format!("{kind}_{id}")
    }

    /// Total number of labels handed out.
    pub fn issued(&self) -> u32 {
        self.counters.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generator_issued_nothing() {
        let labels = LabelGenerator::new();
        assert_eq!(labels.issued(), 0);
    }

    #[test]
    fn counters_are_per_kind() {
        let mut labels = LabelGenerator::new();
        assert_eq!(labels.next("else"), "else_0");
        assert_eq!(labels.next("else"), "else_1");
        assert_eq!(labels.next("while"), "while_0");
        assert_eq!(labels.next("else"), "else_2");
        assert_eq!(labels.issued(), 4);
    }

    #[test]
    fn shared_id_for_label_families() {
        let mut labels = LabelGenerator::new();
        let id = labels.next_id("if");
        assert_eq!(format!("else_{id}"), "else_0");
        assert_eq!(labels.next_id("if"), 1);
    }
}
