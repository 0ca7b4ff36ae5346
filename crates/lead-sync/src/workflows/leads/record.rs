use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RecordLoadError {
    #[error("failed to read lead export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lead export JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) const ATTENDEE_NAME_KEY: &str = "担当者氏名";

/// A lead exactly as it appears in the export, key order included.
pub type RawRecord = Map<String, Value>;

/// One lead capture event. Fields are kept optional so an absent key can be
/// told apart from an empty one; unknown keys survive in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingRecord {
    #[serde(
        rename = "会社名",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub company: Option<String>,
    #[serde(
        rename = "担当者氏名",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub attendee_name: Option<String>,
    #[serde(
        rename = "正式部署名",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub department: Option<String>,
    #[serde(
        rename = "役職区分",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
    #[serde(
        rename = "電話番号",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        rename = "E-mail",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        rename = "リード獲得日",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub lead_date: Option<String>,
    #[serde(
        rename = "商談メモ",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    #[serde(
        rename = "郵便番号",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub postal_code: Option<String>,
    #[serde(
        rename = "都道府県",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub prefecture: Option<String>,
    #[serde(
        rename = "住所",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IncomingRecord {
    pub fn named(name: &str) -> Self {
        Self {
            attendee_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_lead_date(mut self, lead_date: &str) -> Self {
        self.lead_date = Some(lead_date.to_string());
        self
    }

    /// Name as entered, or an empty string when the key is absent.
    pub fn display_name(&self) -> &str {
        self.attendee_name.as_deref().unwrap_or_default()
    }

    /// Trimmed meeting note; empty when absent.
    pub fn note_text(&self) -> &str {
        trimmed(&self.note)
    }
}

pub(crate) fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

/// Accept strings, numbers and booleans as text; `null` reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => Some(other.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text, found {other}"
            )))
        }
    })
}

pub fn load_records<R: Read>(reader: R) -> Result<Vec<IncomingRecord>, RecordLoadError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_records_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<IncomingRecord>, RecordLoadError> {
    let file = std::fs::File::open(path)?;
    load_records(std::io::BufReader::new(file))
}

/// Load the export without interpreting any field, for rewriting it as-is.
pub fn load_raw_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, RecordLoadError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_raw_records_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<RawRecord>, RecordLoadError> {
    let file = std::fs::File::open(path)?;
    load_raw_records(std::io::BufReader::new(file))
}

/// Write records as a pretty-printed UTF-8 JSON array.
pub fn write_records<W: Write, T: Serialize>(
    mut writer: W,
    records: &[T],
) -> Result<(), RecordLoadError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn write_records_to_path<P: AsRef<Path>, T: Serialize>(
    path: P,
    records: &[T],
) -> Result<(), RecordLoadError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_records(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}
