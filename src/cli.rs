//! 命令行参数
//!
//! 命令行给出的设置覆盖配置文件中的会话初始值

use clap::Parser;
use std::path::PathBuf;

use crate::domain::RepeatMode;

#[derive(Debug, Parser)]
#[command(name = "shadowtts")]
#[command(about = "Synthesize text to speech and replay it for shadowing practice")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径，缺省时搜索 shadowtts.toml
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// 音色显示名
    #[arg(long)]
    pub voice: Option<String>,

    /// 语速百分比（-50 到 100）
    #[arg(long, allow_hyphen_values = true)]
    pub speed: Option<i32>,

    /// 重复次数
    #[arg(short = 'r', long = "repeat")]
    pub repeat: Option<u32>,

    /// 无限循环直到 Ctrl-C
    #[arg(long)]
    pub infinite: bool,

    /// 两次重复之间的间隔（毫秒）
    #[arg(long = "interval")]
    pub interval_ms: Option<u64>,

    /// 只播放指定序号（从 0 开始）的单句
    #[arg(short = 's', long = "sentence")]
    pub sentence: Option<usize>,

    /// 从图片识别文本
    #[arg(long, conflicts_with = "text")]
    pub image: Option<PathBuf>,

    /// 只生成音频，不播放
    #[arg(long = "no-play")]
    pub no_play: bool,

    /// 列出可用音色后退出
    #[arg(long = "list-voices")]
    pub list_voices: bool,

    /// 要朗读的文本，缺省时从标准输入读取
    pub text: Vec<String>,
}

impl Cli {
    /// 命令行中给出的文本
    pub fn inline_text(&self) -> Option<String> {
        (!self.text.is_empty()).then(|| self.text.join(" "))
    }

    /// 播放目标模式
    pub fn repeat_mode(&self, configured: RepeatMode) -> RepeatMode {
        if self.sentence.is_some() {
            RepeatMode::Single
        } else {
            configured
        }
    }
}
