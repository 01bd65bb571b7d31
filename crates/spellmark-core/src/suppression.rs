//! Session-lifetime suppression sets.

use indexmap::IndexSet;
use smol_str::SmolStr;

/// Tokens the user ignored or added to their dictionary.
///
/// Both sets suppress identically; they are kept apart so the dictionary can
/// grow different semantics (e.g. persistence) later. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct SuppressionStore {
    ignored: IndexSet<SmolStr>,
    dictionary: IndexSet<SmolStr>,
}

impl SuppressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore a token for the rest of the session. Returns false if already ignored.
    pub fn ignore(&mut self, token: impl Into<SmolStr>) -> bool {
        self.ignored.insert(token.into())
    }

    /// Add a token to the personal dictionary. Returns false if already present.
    pub fn add_to_dictionary(&mut self, token: impl Into<SmolStr>) -> bool {
        self.dictionary.insert(token.into())
    }

    pub fn is_ignored(&self, token: &str) -> bool {
        self.ignored.contains(token)
    }

    pub fn in_dictionary(&self, token: &str) -> bool {
        self.dictionary.contains(token)
    }

    /// Whether the token is in either set.
    pub fn is_suppressed(&self, token: &str) -> bool {
        self.is_ignored(token) || self.in_dictionary(token)
    }

    /// Ignored tokens, in the order they were added.
    pub fn ignored(&self) -> impl Iterator<Item = &SmolStr> {
        self.ignored.iter()
    }

    /// Dictionary tokens, in the order they were added.
    pub fn dictionary(&self) -> impl Iterator<Item = &SmolStr> {
        self.dictionary.iter()
    }
}
