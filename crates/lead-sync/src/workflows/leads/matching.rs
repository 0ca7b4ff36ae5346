use std::collections::HashMap;
use std::fmt::Debug;

use tracing::{debug, warn};

use super::normalizer::normalize_name;
use super::properties::property;
use super::record::IncomingRecord;
use crate::notion::NotionPage;

/// The parts of a contact a match key may look at. `None` means the source
/// does not carry the field at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactFields<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl<'a> ContactFields<'a> {
    /// Incoming records always expose a name; an absent key reads as empty.
    pub fn from_record(record: &'a IncomingRecord) -> Self {
        Self {
            name: Some(record.display_name()),
            email: record.email.as_deref(),
        }
    }
}

/// Identity used to decide that two contacts are the same person.
pub trait MatchKey: Debug {
    fn label(&self) -> &'static str;

    /// Matching key, or `None` when the contact cannot be matched at all.
    fn key(&self, contact: ContactFields<'_>) -> Option<String>;

    fn matches(&self, a: ContactFields<'_>, b: ContactFields<'_>) -> bool {
        match (self.key(a), self.key(b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

/// Attendee name with all whitespace removed. Empty names share one key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedNameKey;

impl MatchKey for NormalizedNameKey {
    fn label(&self) -> &'static str {
        "name"
    }

    fn key(&self, contact: ContactFields<'_>) -> Option<String> {
        contact.name.map(normalize_name)
    }
}

/// Trimmed, ASCII-lowercased e-mail. Contacts without an address never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailKey;

impl MatchKey for EmailKey {
    fn label(&self) -> &'static str {
        "email"
    }

    fn key(&self, contact: ContactFields<'_>) -> Option<String> {
        contact
            .email
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Name,
    Email,
}

impl MatchStrategy {
    pub fn into_key(self) -> Box<dyn MatchKey> {
        match self {
            MatchStrategy::Name => Box::new(NormalizedNameKey),
            MatchStrategy::Email => Box::new(EmailKey),
        }
    }
}

/// An existing database page reduced to what matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPageRef {
    pub page_id: String,
}

/// Existing contacts keyed by match key; the first page seen for a key wins.
#[derive(Debug, Default)]
pub struct ContactIndex {
    pages: HashMap<String, ExistingPageRef>,
    duplicates: usize,
    unmatched: usize,
}

impl ContactIndex {
    pub fn build<K>(pages: &[NotionPage], match_key: &K) -> Self
    where
        K: MatchKey + ?Sized,
    {
        let mut index = Self::default();

        for page in pages {
            let name = page.property_text(property::ATTENDEE_NAME);
            let email = page.property_text(property::EMAIL);
            let fields = ContactFields {
                name: name.as_deref(),
                email: email.as_deref(),
            };

            let Some(key) = match_key.key(fields) else {
                if name.is_none() {
                    warn!(page_id = %page.id, "existing page has no attendee name property; skipping");
                } else {
                    debug!(page_id = %page.id, key = match_key.label(), "existing page has no match key");
                }
                index.unmatched += 1;
                continue;
            };

            if index.pages.contains_key(&key) {
                debug!(page_id = %page.id, %key, "duplicate existing page ignored");
                index.duplicates += 1;
                continue;
            }

            index.pages.insert(
                key,
                ExistingPageRef {
                    page_id: page.id.clone(),
                },
            );
        }

        index
    }

    pub fn lookup(&self, key: &str) -> Option<&ExistingPageRef> {
        self.pages.get(key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages dropped because an earlier page already held their key.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Pages that could not produce a key.
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }
}
