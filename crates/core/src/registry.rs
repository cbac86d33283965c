//! In-memory set of job keys believed to be in flight.

use crate::types::JobKey;

/// Ordered set of in-flight job keys.
///
/// Keys enter either through a successful submission or through resume;
/// a key leaves exactly once, when its outcome is first observed. The
/// registry keeps insertion order and never holds duplicates.
#[derive(Debug, Clone, Default)]
pub struct RunningJobRegistry {
    keys: Vec<JobKey>,
}

impl RunningJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `false` if it was already tracked.
    pub fn insert(&mut self, key: JobKey) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Remove a key. Returns `false` if it was not tracked.
    pub fn remove(&mut self, key: &JobKey) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Tracked keys in insertion order.
    pub fn keys(&self) -> &[JobKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_ignores_duplicates() {
        let mut registry = RunningJobRegistry::new();
        assert!(registry.insert("1/1/1".into()));
        assert!(!registry.insert("1/1/1".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_only_once() {
        let mut registry = RunningJobRegistry::new();
        registry.insert("1/1/1".into());
        assert!(registry.remove(&"1/1/1".into()));
        assert!(!registry.remove(&"1/1/1".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn keeps_insertion_order() {
        let mut registry = RunningJobRegistry::new();
        for key in ["1/1/3", "1/1/1", "1/1/2"] {
            registry.insert(key.into());
        }
        registry.remove(&"1/1/1".into());
        let keys: Vec<&str> = registry.keys().iter().map(JobKey::as_str).collect();
        assert_eq!(keys, vec!["1/1/3", "1/1/2"]);
    }
}
