//! HTTP OCR Client - 调用外部文字识别服务
//!
//! POST {url}，body 为图片原始字节 (application/octet-stream)
//! 成功: {"words_result": [{"words": "..."}, ...]}
//! 失败: {"error_code": 110, "error_msg": "..."}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{OcrEnginePort, OcrError};

#[derive(Debug, Deserialize)]
struct OcrWords {
    words: String,
}

#[derive(Debug, Deserialize)]
struct OcrHttpResponse {
    #[serde(default)]
    words_result: Option<Vec<OcrWords>>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_msg: Option<String>,
}

/// HTTP OCR 客户端配置
#[derive(Debug, Clone)]
pub struct HttpOcrClientConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl HttpOcrClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP OCR 客户端
pub struct HttpOcrClient {
    client: Client,
    config: HttpOcrClientConfig,
}

impl HttpOcrClient {
    pub fn new(config: HttpOcrClientConfig) -> Result<Self, OcrError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }
}

/// 把服务响应转换成按行拼接的文本
fn parse_response(body: &str) -> Result<String, OcrError> {
    let parsed: OcrHttpResponse =
        serde_json::from_str(body).map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

    if let Some(code) = parsed.error_code {
        return Err(OcrError::ApiError {
            code,
            message: parsed.error_msg.unwrap_or_default(),
        });
    }

    let words = parsed
        .words_result
        .ok_or_else(|| OcrError::InvalidResponse("missing words_result".to_string()))?;

    Ok(words
        .into_iter()
        .map(|w| w.words)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[async_trait]
impl OcrEnginePort for HttpOcrClient {
    async fn recognize(&self, image: Vec<u8>) -> Result<String, OcrError> {
        tracing::debug!(
            url = %self.config.url,
            image_size = image.len(),
            "Sending OCR request"
        );

        let response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Timeout
                } else {
                    OcrError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(OcrError::ApiError {
                code: i64::from(status.as_u16()),
                message: body,
            });
        }

        let text = parse_response(&body)?;
        tracing::info!(lines = text.lines().count(), "OCR completed");
        Ok(text)
    }
}
