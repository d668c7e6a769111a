//! OCR Engine Port - 图片文字识别抽象

use async_trait::async_trait;
use thiserror::Error;

/// OCR 错误
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("OCR API error ({code}): {message}")]
    ApiError { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// OCR Engine Port
///
/// 返回识别出的原始文本（按行拼接），过滤在应用层完成
#[async_trait]
pub trait OcrEnginePort: Send + Sync {
    async fn recognize(&self, image: Vec<u8>) -> Result<String, OcrError>;
}
