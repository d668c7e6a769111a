//! ShadowTTS - 跟读练习用的 TTS 播放会话
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 文本分割、音色目录与语速、重复策略与按钮使能、OCR 文本过滤
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, AudioCache, AudioPlayer, OcrEngine）
//! - Pipeline: 音频生成管线
//! - Playback: 重复播放引擎
//! - Controller: 会话编排
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: TTS / OCR 客户端、文件缓存、播放器
//! - Events: 控制器事件发布
//!
//! 命令行 (cli.rs): 参数解析

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
