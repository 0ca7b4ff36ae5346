use chrono::NaiveDateTime;
use tracing::warn;

use super::record::{trimmed, IncomingRecord};
use crate::config::CampaignConfig;
use crate::enrichment::Inference;
use crate::notion::{
    DateValue, PropertyKind, PropertySet, PropertyValue, RichText, SelectOption,
};

/// Property names declared by the lead database.
pub mod property {
    pub const COMPANY: &str = "会社名";
    pub const ATTENDEE_NAME: &str = "担当者氏名";
    pub const INDUSTRY: &str = "業種";
    pub const DEPARTMENT: &str = "部署";
    pub const DEPARTMENT_RAW: &str = "正式部署名";
    pub const ROLE: &str = "役職";
    pub const ROLE_RAW: &str = "役職区分";
    pub const PHONE: &str = "電話番号";
    pub const EMAIL: &str = "メール";
    pub const LEAD_DATE: &str = "リード獲得日";
    pub const NOTE: &str = "商談メモ";
    pub const OWNER: &str = "担当";
    pub const TAG: &str = "タグ";
    pub const STATUS: &str = "ステータス";
    pub const PERSONA: &str = "ペルソナ";
    pub const DEAL_STATUS: &str = "商談ステータス";
    pub const NEXT_ACTION: &str = "次アクション";
    pub const BANT: &str = "BANT";
    pub const CONTRACT_START: &str = "契約開始日";
    pub const PRODUCTS: &str = "製品";
    pub const CONTRACT_PLAN: &str = "契約プラン";
    pub const PRICING: &str = "料金形態";
    pub const DISCOUNT: &str = "割引";
    pub const CONTRACT_STATUS: &str = "契約ステータス";
    pub const AUTO_RENEW: &str = "自動更新";
    pub const TEAM_ID: &str = "チームID";
    pub const COMPLAINTS: &str = "クレーム";
    pub const CANCELLATION_REASON: &str = "解約理由";
    pub const POSTAL_CODE: &str = "郵便番号";
    pub const PREFECTURE: &str = "都道府県";
    pub const ADDRESS: &str = "住所";
    pub const LEAD_SOURCE: &str = "情報源";
}

/// Every property a created page must carry, with its declared type.
pub const LEAD_SCHEMA: &[(&str, PropertyKind)] = &[
    (property::COMPANY, PropertyKind::Title),
    (property::ATTENDEE_NAME, PropertyKind::RichText),
    (property::INDUSTRY, PropertyKind::Select),
    (property::DEPARTMENT, PropertyKind::MultiSelect),
    (property::DEPARTMENT_RAW, PropertyKind::RichText),
    (property::ROLE, PropertyKind::MultiSelect),
    (property::ROLE_RAW, PropertyKind::RichText),
    (property::PHONE, PropertyKind::PhoneNumber),
    (property::EMAIL, PropertyKind::Email),
    (property::LEAD_DATE, PropertyKind::Date),
    (property::NOTE, PropertyKind::RichText),
    (property::OWNER, PropertyKind::MultiSelect),
    (property::TAG, PropertyKind::Select),
    (property::STATUS, PropertyKind::Status),
    (property::PERSONA, PropertyKind::Select),
    (property::DEAL_STATUS, PropertyKind::Status),
    (property::NEXT_ACTION, PropertyKind::RichText),
    (property::BANT, PropertyKind::RichText),
    (property::CONTRACT_START, PropertyKind::Date),
    (property::PRODUCTS, PropertyKind::MultiSelect),
    (property::CONTRACT_PLAN, PropertyKind::Select),
    (property::PRICING, PropertyKind::Select),
    (property::DISCOUNT, PropertyKind::Number),
    (property::CONTRACT_STATUS, PropertyKind::Select),
    (property::AUTO_RENEW, PropertyKind::Checkbox),
    (property::TEAM_ID, PropertyKind::RichText),
    (property::COMPLAINTS, PropertyKind::RichText),
    (property::CANCELLATION_REASON, PropertyKind::RichText),
    (property::POSTAL_CODE, PropertyKind::RichText),
    (property::PREFECTURE, PropertyKind::RichText),
    (property::ADDRESS, PropertyKind::RichText),
    (property::LEAD_SOURCE, PropertyKind::Select),
];

const LEAD_DATE_INPUT_FORMAT: &str = "%Y/%m/%d %H:%M";
const LEAD_DATE_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Full property set for a new page. Blank sources map to the empty value
/// of their type; campaign fields are always stamped.
pub fn build_properties(
    record: &IncomingRecord,
    inference: &Inference,
    campaign: &CampaignConfig,
) -> PropertySet {
    let mut properties = PropertySet::new();

    properties.insert(property::COMPANY, title(trimmed(&record.company)));
    properties.insert(property::ATTENDEE_NAME, rich_text(trimmed(&record.attendee_name)));

    properties.insert(property::INDUSTRY, select(inference.industry.trim()));
    properties.insert(property::DEPARTMENT, multi_select(inference.department.trim()));
    properties.insert(property::DEPARTMENT_RAW, rich_text(trimmed(&record.department)));

    let inferred_role = inference.role.trim();
    properties.insert(property::ROLE, multi_select(inferred_role));
    let role_raw = match trimmed(&record.role) {
        "" => inferred_role,
        raw => raw,
    };
    properties.insert(property::ROLE_RAW, rich_text(role_raw));

    properties.insert(
        property::PHONE,
        PropertyValue::PhoneNumber(non_blank(trimmed(&record.phone))),
    );
    properties.insert(
        property::EMAIL,
        PropertyValue::Email(non_blank(trimmed(&record.email))),
    );

    let lead_date = match trimmed(&record.lead_date) {
        "" => None,
        raw => {
            let parsed = parse_lead_date(raw);
            if parsed.is_none() {
                warn!(
                    value = raw,
                    expected = LEAD_DATE_INPUT_FORMAT,
                    "lead date did not parse; leaving it empty"
                );
            }
            parsed
        }
    };
    properties.insert(
        property::LEAD_DATE,
        PropertyValue::Date(lead_date.map(|start| DateValue { start })),
    );

    properties.insert(property::NOTE, rich_text(record.note_text()));
    properties.insert(property::OWNER, multi_select(inference.owner.trim()));

    properties.insert(property::TAG, select(campaign.tag.trim()));
    properties.insert(property::STATUS, PropertyValue::Status(None));
    properties.insert(property::PERSONA, PropertyValue::Select(None));
    properties.insert(property::DEAL_STATUS, PropertyValue::Status(None));
    properties.insert(property::NEXT_ACTION, PropertyValue::RichText(Vec::new()));
    properties.insert(property::BANT, PropertyValue::RichText(Vec::new()));
    properties.insert(property::CONTRACT_START, PropertyValue::Date(None));
    properties.insert(property::PRODUCTS, PropertyValue::MultiSelect(Vec::new()));
    properties.insert(property::CONTRACT_PLAN, PropertyValue::Select(None));
    properties.insert(property::PRICING, PropertyValue::Select(None));
    properties.insert(property::DISCOUNT, PropertyValue::Number(None));
    properties.insert(property::CONTRACT_STATUS, PropertyValue::Select(None));
    properties.insert(property::AUTO_RENEW, PropertyValue::Checkbox(false));
    properties.insert(property::TEAM_ID, PropertyValue::RichText(Vec::new()));
    properties.insert(property::COMPLAINTS, PropertyValue::RichText(Vec::new()));
    properties.insert(property::CANCELLATION_REASON, PropertyValue::RichText(Vec::new()));

    properties.insert(property::POSTAL_CODE, rich_text(trimmed(&record.postal_code)));
    let prefecture = trimmed(&record.prefecture)
        .split_whitespace()
        .next()
        .unwrap_or_default();
    properties.insert(property::PREFECTURE, rich_text(prefecture));
    properties.insert(property::ADDRESS, rich_text(trimmed(&record.address)));

    properties.insert(property::LEAD_SOURCE, select(campaign.lead_source.trim()));

    properties
}

/// Properties patched on an existing page when a new note arrives.
pub fn note_update(note: &str) -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert(
        property::NOTE,
        PropertyValue::RichText(vec![RichText::plain(note)]),
    );
    properties
}

/// Convert `YYYY/MM/DD HH:MM` into the API's `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_lead_date(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), LEAD_DATE_INPUT_FORMAT)
        .ok()
        .map(|dt| dt.format(LEAD_DATE_OUTPUT_FORMAT).to_string())
}

/// Schema problems in a property set: missing keys and type mismatches.
pub fn schema_violations(properties: &PropertySet) -> Vec<String> {
    LEAD_SCHEMA
        .iter()
        .filter_map(|(name, kind)| match properties.get(name) {
            None => Some(format!("missing property '{name}'")),
            Some(value) if value.kind() != *kind => Some(format!(
                "property '{name}' must be {} but is {}",
                kind.label(),
                value.kind().label()
            )),
            Some(_) => None,
        })
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn title(value: &str) -> PropertyValue {
    PropertyValue::Title(text_runs(value))
}

fn rich_text(value: &str) -> PropertyValue {
    PropertyValue::RichText(text_runs(value))
}

fn text_runs(value: &str) -> Vec<RichText> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![RichText::plain(value)]
    }
}

fn select(value: &str) -> PropertyValue {
    PropertyValue::Select(non_blank(value).map(SelectOption::named))
}

fn multi_select(value: &str) -> PropertyValue {
    PropertyValue::MultiSelect(
        non_blank(value)
            .map(|name| vec![SelectOption::named(name)])
            .unwrap_or_default(),
    )
}
