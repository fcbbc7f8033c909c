//! Unique type names

use parking_lot::Mutex;
use std::collections::HashMap;

/// Hands out names that are unique within the scope
///
/// The first request for a name gets it unchanged; later requests get
/// `name_1`, `name_2` and so on.
#[derive(Debug, Default)]
pub struct NamingScope {
    used: Mutex<HashMap<String, usize>>,
}

impl NamingScope {
    /// Scope with no names taken
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique name derived from `suggested`
    pub fn get_unique_name(&self, suggested: &str) -> String {
        let mut used = self.used.lock();
        let Some(mut counter) = used.get(suggested).copied() else {
            used.insert(suggested.to_string(), 0);
            return suggested.to_string();
        };
        let candidate = loop {
            counter += 1;
            let candidate = format!("{suggested}_{counter}");
            if !used.contains_key(&candidate) {
                break candidate;
            }
        };
        used.insert(suggested.to_string(), counter);
        used.insert(candidate.clone(), 0);
        candidate
    }

    /// Reserve `name` so it is never handed out (names of reloaded types)
    pub fn reserve(&self, name: &str) {
        self.used.lock().entry(name.to_string()).or_insert(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_repeats() {
        let scope = NamingScope::new();
        assert_eq!(scope.get_unique_name("FooProxy"), "FooProxy");
        assert_eq!(scope.get_unique_name("FooProxy"), "FooProxy_1");
        assert_eq!(scope.get_unique_name("FooProxy"), "FooProxy_2");
        assert_eq!(scope.get_unique_name("BarProxy"), "BarProxy");
    }

    #[test]
    fn reserved_names_are_skipped() {
        let scope = NamingScope::new();
        scope.reserve("FooProxy");
        assert_eq!(scope.get_unique_name("FooProxy"), "FooProxy_1");
    }
}
