use std::fmt::Debug;

use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::debug;

use super::model::{
    AppendBlocksRequest, Block, CreatePageRequest, CreatedPage, DatabaseParent,
    DatabaseQueryResponse, PropertySet, QueryDatabaseRequest, UpdatePageRequest,
};
use crate::config::{HttpConfig, NotionConfig};

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("notion request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("notion api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected notion response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("notion runtime unavailable: {0}")]
    Runtime(String),
}

/// Remote surface the sync driver needs from the lead database.
pub trait NotionGateway: Debug {
    /// Single unfiltered query against the configured database.
    fn query_database(&self, page_size: u32) -> Result<DatabaseQueryResponse, NotionError>;

    /// Create a page in the configured database, returning its id.
    fn create_page(
        &self,
        properties: &PropertySet,
        children: &[Block],
    ) -> Result<String, NotionError>;

    fn update_page_properties(
        &self,
        page_id: &str,
        properties: &PropertySet,
    ) -> Result<(), NotionError>;

    fn append_blocks(&self, block_id: &str, children: &[Block]) -> Result<(), NotionError>;
}

/// Blocking wrapper around an async reqwest client so the sync driver can stay
/// sequential.
pub struct NotionClient {
    http: reqwest::Client,
    runtime: Runtime,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig, http: &HttpConfig) -> Result<Self, NotionError> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .build()
            .map_err(NotionError::Transport)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| NotionError::Runtime(err.to_string()))?;

        Ok(Self {
            http: client,
            runtime,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, NotionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%method, %url, "calling notion");

        self.runtime.block_on(async {
            let response = self
                .http
                .request(method, &url)
                .bearer_auth(&self.config.api_token)
                .header("Notion-Version", &self.config.version)
                .json(body)
                .send()
                .await
                .map_err(NotionError::Transport)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NotionError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            response.json::<T>().await.map_err(NotionError::Decode)
        })
    }
}

impl Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("database_id", &self.config.database_id)
            .finish_non_exhaustive()
    }
}

impl NotionGateway for NotionClient {
    fn query_database(&self, page_size: u32) -> Result<DatabaseQueryResponse, NotionError> {
        let path = format!("databases/{}/query", self.config.database_id);
        self.send(Method::POST, &path, &QueryDatabaseRequest { page_size })
    }

    fn create_page(
        &self,
        properties: &PropertySet,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let request = CreatePageRequest {
            parent: DatabaseParent {
                database_id: &self.config.database_id,
            },
            properties,
            children,
        };
        let created: CreatedPage = self.send(Method::POST, "pages", &request)?;
        Ok(created.id)
    }

    fn update_page_properties(
        &self,
        page_id: &str,
        properties: &PropertySet,
    ) -> Result<(), NotionError> {
        let path = format!("pages/{page_id}");
        let _: IgnoredAny = self.send(Method::PATCH, &path, &UpdatePageRequest { properties })?;
        Ok(())
    }

    fn append_blocks(&self, block_id: &str, children: &[Block]) -> Result<(), NotionError> {
        let path = format!("blocks/{block_id}/children");
        let _: IgnoredAny = self.send(Method::PATCH, &path, &AppendBlocksRequest { children })?;
        Ok(())
    }
}
