use crate::config::ConfigError;
use crate::enrichment::EnrichmentError;
use crate::notion::NotionError;
use crate::telemetry::TelemetryError;
use crate::workflows::leads::{LeadSyncError, RecordLoadError, ReportError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Records(RecordLoadError),
    Notion(NotionError),
    Enrichment(EnrichmentError),
    Sync(LeadSyncError),
    Report(ReportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Records(err) => write!(f, "input error: {}", err),
            AppError::Notion(err) => write!(f, "notion client error: {}", err),
            AppError::Enrichment(err) => write!(f, "enrichment client error: {}", err),
            AppError::Sync(err) => write!(f, "sync error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Records(err) => Some(err),
            AppError::Notion(err) => Some(err),
            AppError::Enrichment(err) => Some(err),
            AppError::Sync(err) => Some(err),
            AppError::Report(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<RecordLoadError> for AppError {
    fn from(value: RecordLoadError) -> Self {
        Self::Records(value)
    }
}

impl From<NotionError> for AppError {
    fn from(value: NotionError) -> Self {
        Self::Notion(value)
    }
}

impl From<EnrichmentError> for AppError {
    fn from(value: EnrichmentError) -> Self {
        Self::Enrichment(value)
    }
}

impl From<LeadSyncError> for AppError {
    fn from(value: LeadSyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}
