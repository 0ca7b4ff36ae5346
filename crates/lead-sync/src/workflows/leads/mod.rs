mod matching;
mod merge;
mod normalizer;
mod properties;
mod record;
mod report;

pub use matching::{
    ContactFields, ContactIndex, EmailKey, ExistingPageRef, MatchKey, MatchStrategy,
    NormalizedNameKey,
};
pub use merge::{merge_records, merge_records_by};
pub use normalizer::normalize_name;
pub use properties::{
    build_properties, note_update, parse_lead_date, property, schema_violations, LEAD_SCHEMA,
};
pub use record::{
    load_raw_records, load_raw_records_from_path, load_records, load_records_from_path,
    write_records, write_records_to_path, IncomingRecord, RawRecord, RecordLoadError,
};
pub use report::{RecordEntry, RecordError, RecordOutcome, ReportError, SyncReport};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::config::CampaignConfig;
use crate::enrichment::{Inference, LeadInference};
use crate::notion::{Block, NotionError, NotionGateway};

/// Largest page the database query asks for; anything beyond is not seen.
pub const EXISTING_PAGE_LIMIT: u32 = 100;

pub const CREATED_BLOCK_TEXT: &str = "[*] QR情報から取得しました。名刺はありません.";

#[derive(Debug, thiserror::Error)]
pub enum LeadSyncError {
    #[error("could not read existing pages: {0}")]
    ExistingPages(#[source] NotionError),
}

/// Drives one sync run: index existing pages, then create or update a page
/// for each incoming record, one call at a time.
#[derive(Debug)]
pub struct LeadSyncService {
    notion: Box<dyn NotionGateway>,
    inference: Box<dyn LeadInference>,
    match_key: Box<dyn MatchKey>,
    campaign: CampaignConfig,
    dry_run: bool,
}

impl LeadSyncService {
    pub fn new(
        notion: Box<dyn NotionGateway>,
        inference: Box<dyn LeadInference>,
        campaign: CampaignConfig,
    ) -> Self {
        Self {
            notion,
            inference,
            match_key: Box::new(NormalizedNameKey),
            campaign,
            dry_run: false,
        }
    }

    pub fn with_match_key(mut self, match_key: Box<dyn MatchKey>) -> Self {
        self.match_key = match_key;
        self
    }

    /// Classify records without creating or updating anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn sync(&self, records: Vec<IncomingRecord>) -> Result<SyncReport, LeadSyncError> {
        self.sync_at(records, Local::now().naive_local())
    }

    /// Same as [`sync`](Self::sync) with an explicit timestamp for update blocks.
    pub fn sync_at(
        &self,
        records: Vec<IncomingRecord>,
        now: NaiveDateTime,
    ) -> Result<SyncReport, LeadSyncError> {
        let incoming = records.len();
        let records = merge_records_by(records, &NormalizedNameKey);
        let records = merge_records_by(records, self.match_key.as_ref());
        let duplicates_dropped = incoming - records.len();
        if duplicates_dropped > 0 {
            info!(duplicates_dropped, "dropped duplicate incoming records");
        }

        info!("querying existing pages");
        let response = self
            .notion
            .query_database(EXISTING_PAGE_LIMIT)
            .map_err(LeadSyncError::ExistingPages)?;
        if response.has_more {
            warn!(
                limit = EXISTING_PAGE_LIMIT,
                "existing page query was truncated; later pages are not matched"
            );
        }

        let index = ContactIndex::build(&response.results, self.match_key.as_ref());
        info!(
            existing = index.len(),
            duplicates = index.duplicates(),
            unmatched = index.unmatched(),
            key = self.match_key.label(),
            "indexed existing pages"
        );

        let mut report = SyncReport {
            entries: Vec::with_capacity(records.len()),
            duplicates_dropped,
            existing_pages: index.len(),
            existing_unmatched: index.unmatched(),
            existing_truncated: response.has_more,
            dry_run: self.dry_run,
        };

        for record in &records {
            let result = self.process(record, &index, now);
            if let Err(err) = &result {
                warn!(name = record.display_name(), error = %err, "record not synced");
            }
            report.entries.push(RecordEntry {
                name: record.display_name().to_string(),
                result,
            });
        }

        info!(
            created = report.created(),
            updated = report.updated(),
            skipped = report.skipped(),
            failed = report.failed(),
            "sync finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        record: &IncomingRecord,
        index: &ContactIndex,
        now: NaiveDateTime,
    ) -> Result<RecordOutcome, RecordError> {
        if record.attendee_name.is_none() {
            return Err(RecordError::MissingName);
        }

        let existing = self
            .match_key
            .key(ContactFields::from_record(record))
            .and_then(|key| index.lookup(&key));

        match existing {
            Some(page) if record.note_text().is_empty() => {
                info!(name = record.display_name(), page_id = %page.page_id, "note empty; skipping existing contact");
                Ok(RecordOutcome::Skipped {
                    page_id: page.page_id.clone(),
                })
            }
            Some(page) => self.update(&page.page_id, record.note_text(), now),
            None => self.create(record),
        }
    }

    fn update(
        &self,
        page_id: &str,
        note: &str,
        now: NaiveDateTime,
    ) -> Result<RecordOutcome, RecordError> {
        info!(%page_id, "updating existing page");
        let outcome = RecordOutcome::Updated {
            page_id: page_id.to_string(),
        };
        if self.dry_run {
            return Ok(outcome);
        }

        self.notion
            .update_page_properties(page_id, &note_update(note))
            .map_err(|source| RecordError::UpdatePage {
                page_id: page_id.to_string(),
                source,
            })?;

        let block = Block::paragraph(update_block_text(note, now));
        self.notion
            .append_blocks(page_id, &[block])
            .map_err(|source| RecordError::AppendBlock {
                page_id: page_id.to_string(),
                source,
            })?;

        Ok(outcome)
    }

    fn create(&self, record: &IncomingRecord) -> Result<RecordOutcome, RecordError> {
        info!(name = record.display_name(), "creating new page");

        let inference = if self.dry_run {
            Inference::default()
        } else {
            self.inference.infer(record)?
        };

        let properties = build_properties(record, &inference, &self.campaign);
        let violations = schema_violations(&properties);
        if !violations.is_empty() {
            return Err(RecordError::SchemaViolation(violations));
        }

        if self.dry_run {
            return Ok(RecordOutcome::Created { page_id: None });
        }

        let children = [Block::paragraph(CREATED_BLOCK_TEXT)];
        let page_id = self
            .notion
            .create_page(&properties, &children)
            .map_err(RecordError::CreatePage)?;
        info!(%page_id, "page created");

        Ok(RecordOutcome::Created {
            page_id: Some(page_id),
        })
    }
}

/// Body text announcing a note update.
pub fn update_block_text(note: &str, now: NaiveDateTime) -> String {
    format!(
        "[*] {} QR情報から商談メモが更新されました: {}",
        now.format("%Y-%m-%d %H:%M"),
        note
    )
}
