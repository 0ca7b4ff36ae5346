use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use lead_sync::config::CampaignConfig;
use lead_sync::enrichment::{EnrichmentError, Inference, LeadInference};
use lead_sync::notion::{
    Block, DatabaseQueryResponse, NotionError, NotionGateway, NotionPage, PropertySet,
    PropertyValue,
};
use lead_sync::workflows::leads::{
    property, schema_violations, EmailKey, IncomingRecord, LeadSyncError, LeadSyncService,
    RecordError, RecordOutcome, CREATED_BLOCK_TEXT,
};

#[derive(Debug, Clone, PartialEq)]
enum NotionCall {
    Create {
        properties: PropertySet,
        children: Vec<Block>,
    },
    Update {
        page_id: String,
        properties: PropertySet,
    },
    Append {
        page_id: String,
        children: Vec<Block>,
    },
}

#[derive(Debug, Clone, Default)]
struct FakeNotion {
    pages: Vec<NotionPage>,
    has_more: bool,
    fail_query: bool,
    fail_create_for: Option<String>,
    fail_update_for: Option<String>,
    fail_append_for: Option<String>,
    calls: Arc<Mutex<Vec<NotionCall>>>,
}

impl FakeNotion {
    fn with_pages(pages: Vec<NotionPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<NotionCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    fn record(&self, call: NotionCall) {
        self.calls.lock().expect("calls mutex").push(call);
    }

    fn api_error() -> NotionError {
        NotionError::Api {
            status: 400,
            body: "validation_error".to_string(),
        }
    }
}

impl NotionGateway for FakeNotion {
    fn query_database(&self, page_size: u32) -> Result<DatabaseQueryResponse, NotionError> {
        assert_eq!(page_size, 100);
        if self.fail_query {
            return Err(NotionError::Api {
                status: 401,
                body: "unauthorized".to_string(),
            });
        }
        Ok(DatabaseQueryResponse {
            results: self.pages.clone(),
            has_more: self.has_more,
        })
    }

    fn create_page(
        &self,
        properties: &PropertySet,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let name = properties
            .get(property::ATTENDEE_NAME)
            .and_then(PropertyValue::text)
            .unwrap_or_default();
        if self.fail_create_for.as_deref() == Some(name.as_str()) {
            return Err(Self::api_error());
        }
        self.record(NotionCall::Create {
            properties: properties.clone(),
            children: children.to_vec(),
        });
        Ok(format!("new-{}", self.calls().len()))
    }

    fn update_page_properties(
        &self,
        page_id: &str,
        properties: &PropertySet,
    ) -> Result<(), NotionError> {
        if self.fail_update_for.as_deref() == Some(page_id) {
            return Err(Self::api_error());
        }
        self.record(NotionCall::Update {
            page_id: page_id.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }

    fn append_blocks(&self, block_id: &str, children: &[Block]) -> Result<(), NotionError> {
        if self.fail_append_for.as_deref() == Some(block_id) {
            return Err(Self::api_error());
        }
        self.record(NotionCall::Append {
            page_id: block_id.to_string(),
            children: children.to_vec(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct StubInference {
    fail: bool,
    seen: Arc<Mutex<Vec<String>>>,
}

impl LeadInference for StubInference {
    fn infer(&self, record: &IncomingRecord) -> Result<Inference, EnrichmentError> {
        self.seen
            .lock()
            .expect("seen mutex")
            .push(record.display_name().to_string());
        if self.fail {
            return Err(EnrichmentError::Malformed("model unavailable".to_string()));
        }
        Ok(Inference {
            industry: "製造業".to_string(),
            department: "営業".to_string(),
            role: "部長".to_string(),
            owner: String::new(),
        })
    }
}

fn existing_page(id: &str, name: &str) -> NotionPage {
    NotionPage::new(id).with_rich_text(property::ATTENDEE_NAME, name)
}

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 12)
        .expect("valid date")
        .and_hms_opt(18, 0, 0)
        .expect("valid time")
}

fn service(notion: &FakeNotion, inference: &StubInference) -> LeadSyncService {
    LeadSyncService::new(
        Box::new(notion.clone()),
        Box::new(inference.clone()),
        CampaignConfig::default(),
    )
}

#[test]
fn matching_name_with_note_issues_single_update() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_1", "TaroYamada")]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(
            vec![IncomingRecord::named("Taro Yamada").with_note("Interested in plan X")],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.updated(), 1);
    assert_eq!(report.created(), 0);

    let calls = notion.calls();
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        NotionCall::Update {
            page_id,
            properties,
        } => {
            assert_eq!(page_id, "page_1");
            assert_eq!(
                serde_json::to_value(properties).expect("serializes"),
                json!({ "商談メモ": { "rich_text": [
                    { "type": "text", "text": { "content": "Interested in plan X" } }
                ] } })
            );
            assert_eq!(
                properties.get(property::NOTE).and_then(PropertyValue::text).as_deref(),
                Some("Interested in plan X")
            );
        }
        other => panic!("expected update, got {other:?}"),
    }
    match &calls[1] {
        NotionCall::Append { page_id, children } => {
            assert_eq!(page_id, "page_1");
            assert_eq!(
                children[0].plain_text(),
                "[*] 2025-03-12 18:00 QR情報から商談メモが更新されました: Interested in plan X"
            );
        }
        other => panic!("expected append, got {other:?}"),
    }
    assert!(inference.seen.lock().expect("seen mutex").is_empty());
}

#[test]
fn unmatched_name_creates_page_with_campaign_fields() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_1", "TaroYamada")]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(vec![IncomingRecord::named("Jiro Suzuki")], fixed_now())
        .expect("sync runs");

    assert_eq!(report.created(), 1);
    assert_eq!(report.updated(), 0);

    let calls = notion.calls();
    assert_eq!(calls.len(), 1);
    let NotionCall::Create {
        properties,
        children,
    } = &calls[0]
    else {
        panic!("expected create, got {:?}", calls[0]);
    };

    assert!(schema_violations(properties).is_empty());
    let text = |name: &str| properties.get(name).and_then(PropertyValue::text);
    assert_eq!(text(property::TAG).as_deref(), Some("DXPO大阪'25"));
    assert_eq!(text(property::LEAD_SOURCE).as_deref(), Some("QR"));
    assert_eq!(text(property::INDUSTRY).as_deref(), Some("製造業"));
    assert_eq!(properties.get(property::COMPANY), Some(&PropertyValue::Title(Vec::new())));
    assert_eq!(properties.get(property::EMAIL), Some(&PropertyValue::Email(None)));
    assert_eq!(properties.get(property::LEAD_DATE), Some(&PropertyValue::Date(None)));
    assert_eq!(properties.get(property::OWNER), Some(&PropertyValue::MultiSelect(Vec::new())));
    assert_eq!(children[0].plain_text(), CREATED_BLOCK_TEXT);

    assert_eq!(
        *inference.seen.lock().expect("seen mutex"),
        vec!["Jiro Suzuki".to_string()]
    );
}

#[test]
fn matching_name_without_note_makes_no_calls() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_1", "Taro Yamada")]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(
            vec![IncomingRecord::named("Taro\u{3000}Yamada").with_note("   ")],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.skipped(), 1);
    assert!(notion.calls().is_empty());
    assert!(matches!(
        report.entries[0].result,
        Ok(RecordOutcome::Skipped { ref page_id }) if page_id == "page_1"
    ));
}

#[test]
fn every_record_gets_exactly_one_outcome() {
    let notion = FakeNotion::with_pages(vec![
        existing_page("page_1", "Taro Yamada"),
        existing_page("page_2", "Hanako Sato"),
    ]);
    let inference = StubInference::default();
    let records = vec![
        IncomingRecord::named("Taro Yamada").with_note("follow up"),
        IncomingRecord::named("Hanako Sato"),
        IncomingRecord::named("Jiro Suzuki"),
        IncomingRecord::default(),
    ];

    let report = service(&notion, &inference)
        .sync_at(records, fixed_now())
        .expect("sync runs");

    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.updated(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.created(), 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.entries[3].result,
        Err(RecordError::MissingName)
    ));
}

#[test]
fn duplicate_incoming_names_are_processed_once() {
    let notion = FakeNotion::default();
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(
            vec![
                IncomingRecord::named("Hanako Sato").with_note("first"),
                IncomingRecord::named("HanakoSato").with_note("second"),
            ],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.created(), 1);
    let calls = notion.calls();
    assert_eq!(calls.len(), 1);
    let NotionCall::Create { properties, .. } = &calls[0] else {
        panic!("expected create");
    };
    assert_eq!(
        properties.get(property::NOTE).and_then(PropertyValue::text).as_deref(),
        Some("first")
    );
}

#[test]
fn unparsable_lead_date_still_creates_page() {
    let notion = FakeNotion::default();
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(
            vec![IncomingRecord::named("Jiro Suzuki").with_lead_date("2025-03-12")],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.created(), 1);
    let calls = notion.calls();
    let NotionCall::Create { properties, .. } = &calls[0] else {
        panic!("expected create");
    };
    assert_eq!(properties.get(property::LEAD_DATE), Some(&PropertyValue::Date(None)));
}

#[test]
fn failures_are_reported_per_record_and_run_continues() {
    let notion = FakeNotion {
        pages: vec![
            existing_page("page_1", "Taro Yamada"),
            existing_page("page_2", "Hanako Sato"),
        ],
        fail_create_for: Some("Jiro Suzuki".to_string()),
        fail_update_for: Some("page_1".to_string()),
        fail_append_for: Some("page_2".to_string()),
        ..FakeNotion::default()
    };
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(
            vec![
                IncomingRecord::named("Taro Yamada").with_note("a"),
                IncomingRecord::named("Hanako Sato").with_note("b"),
                IncomingRecord::named("Jiro Suzuki"),
                IncomingRecord::named("Saburo Tanaka"),
            ],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.failed(), 3);
    assert_eq!(report.created(), 1);
    assert!(matches!(
        report.entries[0].result,
        Err(RecordError::UpdatePage { ref page_id, .. }) if page_id == "page_1"
    ));
    assert!(matches!(
        report.entries[1].result,
        Err(RecordError::AppendBlock { ref page_id, .. }) if page_id == "page_2"
    ));
    assert!(matches!(
        report.entries[2].result,
        Err(RecordError::CreatePage(_))
    ));
    // The note patch on page_2 stays applied even though the block append failed.
    assert!(notion
        .calls()
        .iter()
        .any(|call| matches!(call, NotionCall::Update { page_id, .. } if page_id == "page_2")));
}

#[test]
fn enrichment_failure_skips_creation() {
    let notion = FakeNotion::default();
    let inference = StubInference {
        fail: true,
        ..StubInference::default()
    };

    let report = service(&notion, &inference)
        .sync_at(vec![IncomingRecord::named("Jiro Suzuki")], fixed_now())
        .expect("sync runs");

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.entries[0].result,
        Err(RecordError::Enrichment(_))
    ));
    assert!(notion.calls().is_empty());
}

#[test]
fn query_failure_aborts_run() {
    let notion = FakeNotion {
        fail_query: true,
        ..FakeNotion::default()
    };
    let inference = StubInference::default();

    let error = service(&notion, &inference)
        .sync_at(vec![IncomingRecord::named("Taro")], fixed_now())
        .expect_err("query failure is fatal");

    assert!(matches!(error, LeadSyncError::ExistingPages(_)));
    assert!(notion.calls().is_empty());
}

#[test]
fn truncated_query_is_flagged() {
    let notion = FakeNotion {
        has_more: true,
        ..FakeNotion::default()
    };
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(Vec::new(), fixed_now())
        .expect("sync runs");

    assert!(report.existing_truncated);
    assert!(report.entries.is_empty());
}

#[test]
fn dry_run_classifies_without_side_effects() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_1", "Taro Yamada")]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .with_dry_run(true)
        .sync_at(
            vec![
                IncomingRecord::named("Taro Yamada").with_note("memo"),
                IncomingRecord::named("Jiro Suzuki"),
            ],
            fixed_now(),
        )
        .expect("sync runs");

    assert!(report.dry_run);
    assert_eq!(report.updated(), 1);
    assert_eq!(report.created(), 1);
    assert!(notion.calls().is_empty());
    assert!(inference.seen.lock().expect("seen mutex").is_empty());
}

#[test]
fn email_match_key_updates_by_address() {
    let notion = FakeNotion::with_pages(vec![NotionPage::new("page_7")
        .with_rich_text(property::ATTENDEE_NAME, "T. Yamada")
        .with_email(property::EMAIL, Some("taro@example.com"))]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .with_match_key(Box::new(EmailKey))
        .sync_at(
            vec![IncomingRecord::named("Taro Yamada")
                .with_email("TARO@example.com")
                .with_note("booth visit")],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.updated(), 1);
    assert!(matches!(
        &notion.calls()[0],
        NotionCall::Update { page_id, .. } if page_id == "page_7"
    ));
}

// Empty incoming names match an existing page with an empty name; kept, not fixed.
#[test]
fn empty_name_matches_anonymous_existing_page() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_anon", "")]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(vec![IncomingRecord::named(" ").with_note("who?")], fixed_now())
        .expect("sync runs");

    assert_eq!(report.updated(), 1);
    assert!(matches!(
        &notion.calls()[0],
        NotionCall::Update { page_id, .. } if page_id == "page_anon"
    ));
}

#[test]
fn pages_without_attendee_name_are_counted_as_unmatched() {
    let notion = FakeNotion::with_pages(vec![
        NotionPage::new("page_blank"),
        existing_page("page_1", "Taro Yamada"),
    ]);
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .sync_at(Vec::new(), fixed_now())
        .expect("sync runs");

    assert_eq!(report.existing_pages, 1);
    assert_eq!(report.existing_unmatched, 1);
}

#[test]
fn email_matching_still_collapses_same_name_without_address() {
    let notion = FakeNotion::default();
    let inference = StubInference::default();

    let report = service(&notion, &inference)
        .with_match_key(Box::new(EmailKey))
        .sync_at(
            vec![
                IncomingRecord::named("Hanako Sato").with_note("first"),
                IncomingRecord::named("Hanako\u{3000}Sato").with_note("second"),
            ],
            fixed_now(),
        )
        .expect("sync runs");

    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.created(), 1);
    assert_eq!(notion.calls().len(), 1);
}

#[test]
fn update_sends_note_without_surrounding_whitespace() {
    let notion = FakeNotion::with_pages(vec![existing_page("page_1", "Taro Yamada")]);
    let inference = StubInference::default();

    service(&notion, &inference)
        .sync_at(
            vec![IncomingRecord::named("Taro Yamada").with_note("  call back \n")],
            fixed_now(),
        )
        .expect("sync runs");

    let calls = notion.calls();
    let NotionCall::Update { properties, .. } = &calls[0] else {
        panic!("expected update, got {:?}", calls[0]);
    };
    assert_eq!(
        properties.get(property::NOTE).and_then(PropertyValue::text).as_deref(),
        Some("call back")
    );
}
