//! OCR 结果过滤
//!
//! 只保留中文汉字和常用中文标点，去掉空行

/// 保留的中文标点
const KEPT_PUNCTUATION: &[char] = &[
    '。', '，', '；', '：', '？', '！', '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
    '（', '）', '《', '》', '【', '】', '、', '—', '…', '·',
];

#[inline]
fn is_kept(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&ch) || KEPT_PUNCTUATION.contains(&ch)
}

/// 过滤识别文本
///
/// 每行只保留汉字与中文标点，行首尾空白去掉，空行丢弃
pub fn filter_recognized_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.chars().filter(|c| is_kept(*c)).collect::<String>())
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_chinese_and_punctuation() {
        assert_eq!(filter_recognized_text("你好，世界！"), "你好，世界！");
    }

    #[test]
    fn test_strips_latin_digits_and_spaces() {
        assert_eq!(filter_recognized_text("第1章 Hello 开始。"), "第章开始。");
    }

    #[test]
    fn test_drops_empty_lines() {
        let raw = "第一行。\nABC 123\n\n  第二行？  ";
        assert_eq!(filter_recognized_text(raw), "第一行。\n第二行？");
    }

    #[test]
    fn test_all_filtered() {
        assert_eq!(filter_recognized_text("abc\n123"), "");
    }
}
