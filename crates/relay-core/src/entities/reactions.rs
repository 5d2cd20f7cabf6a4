//! Reaction set carried inside a message
//!
//! Maps a reaction symbol to the set of users who reacted with it. Serializes as
//! a JSON object of arrays, e.g. `{"👍": ["alice", "bob"]}`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Reactions on a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reactions(BTreeMap<String, BTreeSet<String>>);

impl Reactions {
    /// Record that `user_id` reacted with `symbol`
    ///
    /// Returns `false` when the user had already reacted with that symbol, in
    /// which case nothing changes.
    pub fn add(&mut self, symbol: &str, user_id: &str) -> bool {
        self.0
            .entry(symbol.to_string())
            .or_default()
            .insert(user_id.to_string())
    }

    /// Users who reacted with `symbol`
    pub fn reactors(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.0.get(symbol)
    }

    /// Number of users who reacted with `symbol`
    pub fn count(&self, symbol: &str) -> usize {
        self.0.get(symbol).map_or(0, BTreeSet::len)
    }

    /// Check whether `user_id` reacted with `symbol`
    pub fn contains(&self, symbol: &str, user_id: &str) -> bool {
        self.0.get(symbol).is_some_and(|users| users.contains(user_id))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(symbol, reactors)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }
}
