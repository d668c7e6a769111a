//! OCR Adapter - HTTP 文字识别客户端

mod http_ocr_client;

pub use http_ocr_client::{HttpOcrClient, HttpOcrClientConfig};
