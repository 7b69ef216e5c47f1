use std::sync::RwLock;

use hashbrown::HashMap;
use once_cell::sync::Lazy;

#[derive(Debug, Default)]
struct InterningTable {
    strings: Vec<&'static str>,
    indices: HashMap<&'static str, u32>,
}

static INTERNING_TABLE: Lazy<RwLock<InterningTable>> = Lazy::new(Default::default);

/// An index into the string interning table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn intern(value: &str) -> Self {
        if let Some(&index) = INTERNING_TABLE.read().unwrap().indices.get(value) {
            return Self(index);
        }

        let mut table = INTERNING_TABLE.write().unwrap();

        // Another thread may have inserted it between the two locks.
        if let Some(&index) = table.indices.get(value) {
            return Self(index);
        }

        let leaked: &'static str = Box::leak(value.to_owned().into_boxed_str());
        let index = table.strings.len() as u32;

        table.strings.push(leaked);
        table.indices.insert(leaked, index);

        Self(index)
    }

    pub fn value(self) -> &'static str {
        INTERNING_TABLE.read().unwrap().strings[self.0 as usize]
    }
}

impl core::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Symbol").field(&self.value()).finish()
    }
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::Symbol;

    #[test]
    fn interning_is_idempotent() {
        let first = Symbol::intern("counter");
        let second = Symbol::intern("counter");

        assert_eq!(first, second);
        assert_eq!(first.value(), "counter");
        assert_ne!(first, Symbol::intern("counter2"));
    }
}
