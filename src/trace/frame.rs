use std::{collections::HashMap, sync::Arc};

use imbl::HashMap as ImHashMap;

use crate::{
    program::{BlockId, Instruction, Method, Value},
    term::Term,
    types::SymType,
};

/// Per-invocation translation state.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// The invoked method
    pub(crate) method: Arc<Method>,
    /// Term currently bound to each value of the method
    pub(crate) values: ImHashMap<Value, Term>,
    /// Caller value and term receiving the return value of this invocation
    pub(crate) return_receiver: Option<(Value, Term)>,
    /// Value map snapshots, one per exception type handled around the last instruction
    pub(crate) catch_map: HashMap<SymType, ImHashMap<Value, Term>>,
    /// Block control last arrived from, for phi resolution
    pub(crate) previous_block: BlockId,
}

impl Frame {
    pub(crate) fn new(method: Arc<Method>, return_receiver: Option<(Value, Term)>) -> Self {
        Self {
            method,
            values: ImHashMap::new(),
            return_receiver,
            catch_map: HashMap::new(),
            previous_block: 0,
        }
    }
}

/// A call whose callee has not been entered (or left) yet.
#[derive(Debug, Clone)]
pub(crate) struct CallFrame {
    /// The call instruction
    pub(crate) call: Arc<Instruction>,
    /// The instruction the caller resumes at
    pub(crate) next: Arc<Instruction>,
}

/// Generator of unique value names, `{name}_{n}` with a counter per base name.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameGenerator {
    counters: HashMap<String, usize>,
}

impl NameGenerator {
    pub(crate) fn next(&mut self, name: &str) -> String {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        let fresh = format!("{name}_{counter}");
        *counter += 1;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_per_base() {
        let mut names = NameGenerator::default();
        assert_eq!(names.next("%0"), "%0_0");
        assert_eq!(names.next("%0"), "%0_1");
        assert_eq!(names.next("%1"), "%1_0");
    }
}
