//! Author entries, deduplicated author lists and declared-vs-actual comparison.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A contributor identified by name and email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorEntry {
    /// Author name.
    pub name: String,
    /// Author email, empty when unknown.
    pub email: String,
}

impl AuthorEntry {
    /// Create a new entry, trimming surrounding whitespace.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
        }
    }

    /// Parse `Name <email>` or a bare name.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        match (input.find('<'), input.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = input[..open].trim();
                let email = input[open + 1..close].trim();
                if name.is_empty() && email.is_empty() {
                    None
                } else {
                    Some(Self::new(name, email))
                }
            }
            _ => Some(Self::new(input, "")),
        }
    }

    /// Case-insensitive aggregation key, `name <email>` lowercased.
    pub fn key(&self) -> String {
        format!("{} <{}>", self.name, self.email).to_lowercase()
    }
}

impl fmt::Display for AuthorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

/// Insertion-ordered list of authors, unique by [`AuthorEntry::key`].
#[derive(Debug, Clone, Default)]
pub struct AuthorList {
    entries: Vec<AuthorEntry>,
    seen: HashSet<String>,
}

impl AuthorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an entry with the same key exists. Returns whether it was added.
    pub fn push(&mut self, entry: AuthorEntry) -> bool {
        if self.seen.insert(entry.key()) {
            self.entries.push(entry);
            true
        } else {
            false
        }
    }

    /// Move `entry` to the end, removing an earlier occurrence with the same key.
    pub fn push_last(&mut self, entry: AuthorEntry) {
        let key = entry.key();
        if !self.seen.insert(key.clone()) {
            self.entries.retain(|e| e.key() != key);
        }
        self.entries.push(entry);
    }

    pub fn contains(&self, entry: &AuthorEntry) -> bool {
        self.seen.contains(&entry.key())
    }

    /// Sort by name, then email, ignoring case.
    pub fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.key());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<AuthorEntry> {
        self.entries
    }
}

impl FromIterator<AuthorEntry> for AuthorList {
    fn from_iter<T: IntoIterator<Item = AuthorEntry>>(iter: T) -> Self {
        let mut list = Self::new();
        for entry in iter {
            list.push(entry);
        }
        list
    }
}

/// Difference between declared authors and the authors found in history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorDiff {
    /// Present in history but not declared.
    pub missing: Vec<AuthorEntry>,
    /// Declared but never found in history.
    pub unexpected: Vec<AuthorEntry>,
}

impl AuthorDiff {
    /// Compare declared authors against actual ones, case-insensitively.
    pub fn compare(declared: &[AuthorEntry], actual: &[AuthorEntry]) -> Self {
        let declared_list: AuthorList = declared.iter().cloned().collect();
        let actual_list: AuthorList = actual.iter().cloned().collect();

        let missing = actual_list
            .clone()
            .into_vec()
            .into_iter()
            .filter(|a| !declared_list.contains(a))
            .collect();
        let unexpected = declared_list
            .into_vec()
            .into_iter()
            .filter(|d| !actual_list.contains(d))
            .collect();

        Self { missing, unexpected }
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}
