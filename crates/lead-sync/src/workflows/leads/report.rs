use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::enrichment::EnrichmentError;
use crate::notion::NotionError;

/// What happened to one incoming record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New page created. `page_id` is `None` on dry runs.
    Created { page_id: Option<String> },
    /// Existing page received the new note and a follow-up block.
    Updated { page_id: String },
    /// Existing page matched but the record carried no note.
    Skipped { page_id: String },
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Created { .. } => "created",
            RecordOutcome::Updated { .. } => "updated",
            RecordOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            RecordOutcome::Created { page_id } => page_id.as_deref(),
            RecordOutcome::Updated { page_id } | RecordOutcome::Skipped { page_id } => {
                Some(page_id)
            }
        }
    }
}

/// Why one record could not be synced. Never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record has no 担当者氏名 field")]
    MissingName,
    #[error("could not classify lead: {0}")]
    Enrichment(#[from] EnrichmentError),
    #[error("property set violates lead schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),
    #[error("page creation failed: {0}")]
    CreatePage(#[source] NotionError),
    #[error("updating note on page {page_id} failed: {source}")]
    UpdatePage {
        page_id: String,
        #[source]
        source: NotionError,
    },
    #[error("note updated on page {page_id} but appending the follow-up block failed: {source}")]
    AppendBlock {
        page_id: String,
        #[source]
        source: NotionError,
    },
}

#[derive(Debug)]
pub struct RecordEntry {
    pub name: String,
    pub result: Result<RecordOutcome, RecordError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write sync report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode sync report: {0}")]
    Csv(#[from] csv::Error),
}

/// Aggregate of a sync run: one entry per processed record plus run facts.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub entries: Vec<RecordEntry>,
    pub duplicates_dropped: usize,
    pub existing_pages: usize,
    /// Existing pages that produced no match key and can never be updated.
    pub existing_unmatched: usize,
    pub existing_truncated: bool,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    outcome: &'static str,
    page_id: &'a str,
    detail: String,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Updated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Skipped { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RecordError)> {
        self.entries.iter().filter_map(|entry| match &entry.result {
            Err(err) => Some((entry.name.as_str(), err)),
            Ok(_) => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RecordOutcome) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| entry.result.as_ref().is_ok_and(&predicate))
            .count()
    }

    /// One CSV row per record: name, outcome, page_id, detail.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for entry in &self.entries {
            let row = match &entry.result {
                Ok(outcome) => ReportRow {
                    name: &entry.name,
                    outcome: outcome.label(),
                    page_id: outcome.page_id().unwrap_or_default(),
                    detail: match outcome {
                        RecordOutcome::Skipped { .. } => "note empty".to_string(),
                        RecordOutcome::Created { page_id: None } => "dry run".to_string(),
                        _ => String::new(),
                    },
                },
                Err(err) => ReportRow {
                    name: &entry.name,
                    outcome: "failed",
                    page_id: "",
                    detail: err.to_string(),
                },
            };
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}
