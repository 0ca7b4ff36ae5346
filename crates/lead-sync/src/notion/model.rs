use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One run of plain text inside a title or rich-text property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichText {
    Text { text: TextContent },
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        RichText::Text {
            text: TextContent {
                content: content.into(),
            },
        }
    }

    pub fn content(&self) -> &str {
        match self {
            RichText::Text { text } => &text.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub name: String,
}

impl SelectOption {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateValue {
    pub start: String,
}

/// Property types the lead database declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    RichText,
    Select,
    MultiSelect,
    PhoneNumber,
    Email,
    Date,
    Status,
    Number,
    Checkbox,
}

impl PropertyKind {
    pub fn label(self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::Email => "email",
            PropertyKind::Date => "date",
            PropertyKind::Status => "status",
            PropertyKind::Number => "number",
            PropertyKind::Checkbox => "checkbox",
        }
    }
}

/// A typed property value, serialized as `{"<type>": <payload>}`.
///
/// Nullable kinds carry an `Option`; list kinds are always a list, empty when
/// there is nothing to set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Select(Option<SelectOption>),
    MultiSelect(Vec<SelectOption>),
    PhoneNumber(Option<String>),
    Email(Option<String>),
    Date(Option<DateValue>),
    Status(Option<SelectOption>),
    Number(Option<f64>),
    Checkbox(bool),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Title(_) => PropertyKind::Title,
            PropertyValue::RichText(_) => PropertyKind::RichText,
            PropertyValue::Select(_) => PropertyKind::Select,
            PropertyValue::MultiSelect(_) => PropertyKind::MultiSelect,
            PropertyValue::PhoneNumber(_) => PropertyKind::PhoneNumber,
            PropertyValue::Email(_) => PropertyKind::Email,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::Status(_) => PropertyKind::Status,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Checkbox(_) => PropertyKind::Checkbox,
        }
    }

    /// Concatenated text for text-like values, mainly for logging and tests.
    pub fn text(&self) -> Option<String> {
        match self {
            PropertyValue::Title(runs) | PropertyValue::RichText(runs) => {
                Some(runs.iter().map(RichText::content).collect())
            }
            PropertyValue::Select(option) | PropertyValue::Status(option) => {
                option.as_ref().map(|o| o.name.clone())
            }
            PropertyValue::PhoneNumber(value) | PropertyValue::Email(value) => value.clone(),
            PropertyValue::Date(value) => value.as_ref().map(|d| d.start.clone()),
            PropertyValue::MultiSelect(options) => Some(
                options
                    .iter()
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            PropertyValue::Number(_) | PropertyValue::Checkbox(_) => None,
        }
    }
}

/// Property name to typed value, as submitted in create/update payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeMap<String, PropertyValue>);

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }
}

/// Paragraph block appended to a page body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    object: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    paragraph: Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Paragraph {
    rich_text: Vec<RichText>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            object: "block",
            kind: "paragraph",
            paragraph: Paragraph {
                rich_text: vec![RichText::plain(text)],
            },
        }
    }

    pub fn plain_text(&self) -> String {
        self.paragraph
            .rich_text
            .iter()
            .map(RichText::content)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DatabaseParent<'a> {
    pub(crate) database_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePageRequest<'a> {
    pub(crate) parent: DatabaseParent<'a>,
    pub(crate) properties: &'a PropertySet,
    pub(crate) children: &'a [Block],
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatePageRequest<'a> {
    pub(crate) properties: &'a PropertySet,
}

#[derive(Debug, Serialize)]
pub(crate) struct AppendBlocksRequest<'a> {
    pub(crate) children: &'a [Block],
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryDatabaseRequest {
    pub(crate) page_size: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPage {
    pub(crate) id: String,
}

/// Response of `POST /databases/{id}/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseQueryResponse {
    #[serde(default)]
    pub results: Vec<NotionPage>,
    #[serde(default)]
    pub has_more: bool,
}

/// A page as returned by the database query. Properties stay untyped JSON
/// because only a few of them are ever read back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotionPage {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl NotionPage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach a rich-text property shaped the way the API returns it.
    pub fn with_rich_text(mut self, name: &str, text: &str) -> Self {
        let runs = if text.is_empty() {
            json!([])
        } else {
            json!([{ "type": "text", "plain_text": text, "text": { "content": text } }])
        };
        self.properties
            .insert(name.to_string(), json!({ "type": "rich_text", "rich_text": runs }));
        self
    }

    pub fn with_email(mut self, name: &str, email: Option<&str>) -> Self {
        self.properties
            .insert(name.to_string(), json!({ "type": "email", "email": email }));
        self
    }

    /// Text of a property, or `None` when the page does not carry it at all.
    ///
    /// Title and rich-text runs are concatenated using `plain_text`, falling
    /// back to `text.content`. A null value reads as an empty string.
    pub fn property_text(&self, name: &str) -> Option<String> {
        let property = self.properties.get(name)?;
        let kind = property.get("type").and_then(Value::as_str);

        let payload = match kind {
            Some(kind) => property.get(kind),
            None => ["rich_text", "title", "email", "phone_number"]
                .iter()
                .find_map(|key| property.get(*key)),
        };

        let text = match payload {
            Some(Value::Array(runs)) => runs.iter().map(run_text).collect(),
            Some(Value::String(value)) => value.clone(),
            _ => String::new(),
        };
        Some(text)
    }
}

fn run_text(run: &Value) -> &str {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| {
            run.get("text")
                .and_then(|text| text.get("content"))
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
}
