use std::collections::HashSet;
use std::rc::Rc;

/// Deduplicating string store.
///
/// Interning an equal string returns a handle to the existing
/// allocation. Handles are reference counted, so they remain valid
/// independent of the pool growing; the backing storage never moves.
///
/// A pool is created per rule at build time (literal rule text) and a
/// scratch copy is made per evaluation (strings produced by coercion,
/// `cat` and `substr`), so concurrent evaluations of one rule never
/// share mutable state.
#[derive(Debug, Clone, Default)]
pub(crate) struct StringPool {
    strings: HashSet<Rc<str>>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Rc<str> {
        match self.strings.get(s) {
            Some(existing) => existing.clone(),
            None => {
                let interned: Rc<str> = Rc::from(s);
                self.strings.insert(interned.clone());
                interned
            }
        }
    }

    pub fn intern_owned(&mut self, s: String) -> Rc<str> {
        match self.strings.get(s.as_str()) {
            Some(existing) => existing.clone(),
            None => {
                let interned: Rc<str> = Rc::from(s);
                self.strings.insert(interned.clone());
                interned
            }
        }
    }
}
