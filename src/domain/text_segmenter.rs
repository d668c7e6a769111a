//! 文本分割器
//!
//! 按句末标点把输入文本切成有序的句子片段。
//! 片段拼接后与原文只有空白差异（round-trip），顺序即 UI 选择下标。

/// 默认句末分隔符
pub const DEFAULT_DELIMITERS: &[char] = &['。', '？', '！', '；', '?', '!'];

/// 文本分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 句末分隔符（总是分割，分隔符保留在片段末尾）
    pub delimiters: Vec<char>,
    /// 最小字符数限制（用于合并短句），0 表示不合并
    pub min_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            min_chars: 0,
        }
    }
}

impl SegmentConfig {
    #[inline]
    fn is_delimiter(&self, ch: char) -> bool {
        self.delimiters.contains(&ch)
    }
}

/// 右引号/右括号
#[inline]
fn is_closing(ch: char) -> bool {
    matches!(
        ch,
        '"' | '\u{201D}' | '\'' | '\u{2019}' | '」' | '』' | '》' | '）' | ')'
    )
}

/// 检查片段是否只包含引号、空白或分隔符（应该被合并到相邻片段）
#[inline]
fn is_trivial_segment(s: &str, config: &SegmentConfig) -> bool {
    s.chars().all(|c| {
        matches!(c, '\u{201C}' | '\u{2018}' | '「' | '『')
            || is_closing(c)
            || c.is_whitespace()
            || config.is_delimiter(c)
    })
}

/// 按分隔符分割（不做合并）
fn split_by_delimiters(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        current.push(ch);

        if config.is_delimiter(ch) {
            // 紧跟的右引号、右括号和连续标点归入当前句
            while let Some(&next) = chars.peek() {
                if !is_closing(next) && !config.is_delimiter(next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                segments.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    // 剩余内容（没有句末标点的尾巴）
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }

    segments
}

/// 合并短片段直到满足 min_chars
fn merge_until_min_chars(segments: Vec<String>, min_chars: usize) -> Vec<String> {
    if segments.is_empty() || min_chars == 0 {
        return segments;
    }

    let mut result: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for seg in segments {
        buffer.push_str(&seg);

        if buffer.chars().count() >= min_chars {
            result.push(std::mem::take(&mut buffer));
        }
    }

    // 处理剩余buffer
    if !buffer.is_empty() {
        if let Some(last) = result.last_mut() {
            last.push_str(&buffer);
        } else {
            result.push(buffer);
        }
    }

    result
}

/// 对文本进行分段
///
/// 分段策略：
/// 1. 扫描句末分隔符，每个片段包含其结尾的分隔符，去掉两端空白
/// 2. 只有引号/标点的片段合并到前一个片段（位于开头时并入下一个片段）
/// 3. min_chars > 0 时合并短句
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut pending_prefix = String::new();

    for sentence in split_by_delimiters(text, config) {
        if is_trivial_segment(&sentence, config) {
            match segments.last_mut() {
                Some(last) => last.push_str(&sentence),
                None => pending_prefix.push_str(&sentence),
            }
            continue;
        }

        if pending_prefix.is_empty() {
            segments.push(sentence);
        } else {
            let mut merged = std::mem::take(&mut pending_prefix);
            merged.push_str(&sentence);
            segments.push(merged);
        }
    }

    if !pending_prefix.is_empty() {
        segments.push(pending_prefix);
    }

    merge_until_min_chars(segments, config.min_chars)
}

/// 使用默认配置分段（便捷方法）
pub fn segment_text_default(text: &str) -> Vec<String> {
    segment_text(text, &SegmentConfig::default())
}

/// 去掉所有空白，作为缓存 key 的输入
pub fn normalize_for_key(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        normalize_for_key(s)
    }

    #[test]
    fn test_delimiter_kept_on_segment() {
        let segments = segment_text_default("你好。今天天气怎么样？很好！");
        assert_eq!(segments, vec!["你好。", "今天天气怎么样？", "很好！"]);
    }

    #[test]
    fn test_trailing_text_without_delimiter() {
        let segments = segment_text_default("第一句；第二句没有结尾");
        assert_eq!(segments, vec!["第一句；", "第二句没有结尾"]);
    }

    #[test]
    fn test_whitespace_trimmed_and_empty_dropped() {
        let segments = segment_text_default("  前面有空格。   \n  。后面。  \n");
        // 单独的 "。" 合并到前一个片段
        assert_eq!(segments, vec!["前面有空格。。", "后面。"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_text_default("").is_empty());
        assert!(segment_text_default("   \n\t ").is_empty());
    }

    #[test]
    fn test_quote_only_segment_merged() {
        let segments = segment_text_default("他说：“走吧。”然后离开了。");
        assert_eq!(segments, vec!["他说：“走吧。”", "然后离开了。"]);
    }

    #[test]
    fn test_leading_trivial_segment_prefixed() {
        let segments = segment_text_default("。开头是标点。");
        assert_eq!(segments, vec!["。开头是标点。"]);
    }

    #[test]
    fn test_round_trip_modulo_whitespace() {
        let texts = [
            "我想谈一谈中国在过去四十年中的非凡发展。我选择这个主题，是因为中国如今在许多领域已经成为世界领军者。",
            "政府 认识到，为了与其他国家竞争！\n中国必须实现发展；因此\n\n在世纪年代初",
            "Hello there! How are you? Fine",
            "“引号”。。！？ 结尾",
        ];
        for text in texts {
            let joined: String = segment_text_default(text).concat();
            assert_eq!(strip(&joined), strip(text), "round trip failed for {text:?}");
        }
    }

    #[test]
    fn test_min_chars_merges_short_sentences() {
        let config = SegmentConfig {
            min_chars: 10,
            ..SegmentConfig::default()
        };
        let segments = segment_text("短。短？这一句已经足够长了吧。", &config);
        assert_eq!(segments, vec!["短。短？这一句已经足够长了吧。"]);
    }

    #[test]
    fn test_custom_delimiters() {
        let config = SegmentConfig {
            delimiters: vec!['.'],
            min_chars: 0,
        };
        let segments = segment_text("One. Two. Three", &config);
        assert_eq!(segments, vec!["One.", "Two.", "Three"]);
    }

    #[test]
    fn test_normalize_for_key() {
        assert_eq!(normalize_for_key(" 你 好\n。\t"), "你好。");
        assert_eq!(normalize_for_key("你好。"), normalize_for_key("你 好 。"));
    }
}
