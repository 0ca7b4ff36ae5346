use std::collections::HashSet;

use serde_json::Value;

use super::matching::{ContactFields, MatchKey, NormalizedNameKey};
use super::record::{IncomingRecord, RawRecord, ATTENDEE_NAME_KEY};

/// Collapse raw export entries sharing a normalized `担当者氏名`. The first
/// entry for a name is kept exactly as loaded; later ones are dropped.
pub fn merge_records(records: Vec<RawRecord>) -> Vec<RawRecord> {
    first_by_key(records, |record| {
        let name = raw_name(record);
        NormalizedNameKey.key(ContactFields {
            name: Some(&name),
            email: None,
        })
    })
}

/// Same first-wins collapse over parsed records using any match key.
/// Records without a key are never merged with anything.
pub fn merge_records_by<K>(records: Vec<IncomingRecord>, match_key: &K) -> Vec<IncomingRecord>
where
    K: MatchKey + ?Sized,
{
    first_by_key(records, |record| match_key.key(ContactFields::from_record(record)))
}

fn first_by_key<T, F>(records: Vec<T>, key_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<String>,
{
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

    records
        .into_iter()
        .filter(|record| match key_of(record) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

// Absent and null names read as empty; numbers are compared by their text.
fn raw_name(record: &RawRecord) -> String {
    match record.get(ATTENDEE_NAME_KEY) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
