use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::runtime::Runtime;
use tracing::debug;

use super::{parse_inference, EnrichmentError, Inference, LeadInference};
use crate::config::{EnrichmentConfig, HttpConfig};
use crate::workflows::leads::IncomingRecord;

const SYSTEM_PROMPT: &str = "\
あなたは展示会で獲得した名刺リードを分類するアシスタントです。
入力は1件のリード情報(JSON)です。会社名・正式部署名・役職区分・商談メモなどから次の4項目を推定してください。
- 業種: 会社の業種(例: 製造業, IT・通信, 小売, 金融, 不動産, 医療・福祉, 官公庁, その他)
- 部署: 部署の分類(例: 経営, 営業, マーケティング, 情報システム, 人事, 総務, 経理, 製造, 研究開発, その他)
- 役職: 役職の分類(例: 経営者・役員, 部長, 課長, 係長・主任, 担当者)
- 担当: 自社側の担当者名。判断できなければ空文字
必ず {\"業種\": \"\", \"部署\": \"\", \"役職\": \"\", \"担当\": \"\"} の形のJSONオブジェクトのみを返してください。推定できない項目は空文字にしてください。";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: serde_json::Value,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionInference {
    http: reqwest::Client,
    runtime: Runtime,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatCompletionInference {
    pub fn new(config: &EnrichmentConfig, http: &HttpConfig) -> Result<Self, EnrichmentError> {
        let api_key = config.api_key.clone().ok_or(EnrichmentError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .build()
            .map_err(EnrichmentError::Transport)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| EnrichmentError::Runtime(err.to_string()))?;

        Ok(Self {
            http: client,
            runtime,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_for(&self, record: &IncomingRecord) -> Result<ChatRequest<'_>, EnrichmentError> {
        let lead = serde_json::to_string(record)
            .map_err(|err| EnrichmentError::Malformed(err.to_string()))?;

        Ok(ChatRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: json!({ "type": "json_object" }),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: lead,
                },
            ],
        })
    }
}

impl std::fmt::Debug for ChatCompletionInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionInference")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LeadInference for ChatCompletionInference {
    fn infer(&self, record: &IncomingRecord) -> Result<Inference, EnrichmentError> {
        let request = self.request_for(record)?;
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, "requesting lead classification");

        let reply: ChatResponse = self.runtime.block_on(async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(EnrichmentError::Transport)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EnrichmentError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<ChatResponse>()
                .await
                .map_err(|err| EnrichmentError::Malformed(err.to_string()))
        })?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EnrichmentError::Malformed("reply had no content".to_string()))?;

        parse_inference(&content)
    }
}
