//! A per-file access list: a small set of usernames, bounded and
//! serialized as a comma-separated string at the sidecar/wire boundary.
//!
//! The wire/sidecar representation stays a comma-separated list bounded
//! at 512 bytes, but the in-memory form is a real set rather than a
//! buffer re-parsed on every check.

use std::collections::BTreeSet;
use std::fmt;

/// Maximum serialized length of an [`AccessList`] on the wire or in its
/// sidecar file.
pub const MAX_SERIALIZED_LEN: usize = 512;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList(BTreeSet<String>);

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user: &str) -> bool {
        self.0.contains(user)
    }

    pub fn insert(&mut self, user: &str) -> bool {
        self.0.insert(user.to_string())
    }

    pub fn remove(&mut self, user: &str) -> bool {
        self.0.remove(user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_csv(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Parses a comma-separated list, trimming whitespace around each
    /// entry and silently dropping blanks.
    pub fn from_csv(csv: &str) -> Self {
        let set = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self(set)
    }
}

impl fmt::Display for AccessList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_csv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace_around_entries() {
        let list = AccessList::from_csv("alice, bob ,  carol");
        assert!(list.contains("alice"));
        assert!(list.contains("bob"));
        assert!(list.contains("carol"));
    }

    #[test]
    fn drops_blank_entries() {
        let list = AccessList::from_csv("alice,,bob,");
        assert_eq!(list.iter().count(), 2);
    }

    #[test]
    fn round_trips_through_csv() {
        let mut list = AccessList::new();
        list.insert("alice");
        list.insert("bob");
        let csv = list.to_csv();
        assert_eq!(AccessList::from_csv(&csv), list);
    }
}
