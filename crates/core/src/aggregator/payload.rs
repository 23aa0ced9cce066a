//! Reading labelled sections (`【引言】：…`) out of generated payloads.

use crate::segmenter::{truncate_chars, KeywordSet};

pub const TITLE_LABEL: &str = "【文章标题】";
pub const INTRO_LABEL: &str = "【引言】";

/// Text following `label`, an optional run of `*` and a colon, up to the
/// next blank line, the next `【` label or the end of the payload.
pub fn section_text<'p>(payload: &'p str, label: &str) -> Option<&'p str> {
    let start = payload.find(label)? + label.len();
    let rest = payload[start..].trim_start_matches('*').trim_start();
    let rest = rest.strip_prefix([':', '：'])?.trim_start();

    let end = [rest.find("\n\n"), rest.find('【')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    let text = rest[..end].trim();
    (!text.is_empty()).then_some(text)
}

/// Title line of a generated payload, preferring `《…》` contents.
pub fn extract_title(payload: &str) -> Option<String> {
    let start = payload.find(TITLE_LABEL)? + TITLE_LABEL.len();
    let rest = payload[start..].trim_start_matches('*').trim_start();
    let rest = rest.strip_prefix([':', '：'])?;
    let first_line = rest.trim_start().lines().next()?.trim();

    let title = match (first_line.find('《'), first_line.find('》')) {
        (Some(open), Some(close)) if close > open + '《'.len_utf8() => {
            first_line[open + '《'.len_utf8()..close].trim()
        }
        _ => first_line.trim_matches('*').trim(),
    };
    (!title.is_empty()).then(|| title.to_string())
}

/// Generated title, replacing publication names with the intro's first sentence.
pub fn generated_title(payload: &str, mastheads: &KeywordSet) -> Option<String> {
    let title = extract_title(payload)?;
    if mastheads.contains_exact(&title.to_lowercase()) {
        return title_from_intro(payload);
    }
    Some(title)
}

/// First sentence of the intro (if short) or its first 40 characters.
pub fn title_from_intro(payload: &str) -> Option<String> {
    let intro = section_text(payload, INTRO_LABEL)?;
    for sep in ['。', '！', '？', '，'] {
        if let Some(pos) = intro.find(sep) {
            let end = pos + sep.len_utf8();
            if pos > 0 && intro[..pos].chars().count() <= 50 {
                return Some(intro[..end].trim().to_string());
            }
        }
    }
    let head = truncate_chars(intro, 40).trim();
    if intro.chars().count() > 40 {
        Some(format!("{head}…"))
    } else {
        Some(head.to_string())
    }
}

/// True if `chunk` is the title paragraph of a payload.
pub fn is_title_chunk(chunk: &str) -> bool {
    chunk.trim_start().starts_with(TITLE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS: &str = "【文章标题】**：《芯片之争》\n\n【引言】**：美国收紧出口管制。中国加速自研。\n\n【主要内容如下】：……";

    #[test]
    fn test_section_text() {
        assert_eq!(section_text(ANALYSIS, INTRO_LABEL), Some("美国收紧出口管制。中国加速自研。"));
        assert_eq!(section_text("【引言】：单行引言【核心结论】：x", INTRO_LABEL), Some("单行引言"));
        assert_eq!(section_text("no labels", INTRO_LABEL), None);
        assert_eq!(section_text("【引言】：", INTRO_LABEL), None);
    }

    #[test]
    fn test_extract_title_prefers_book_brackets() {
        assert_eq!(extract_title(ANALYSIS).as_deref(), Some("芯片之争"));
        assert_eq!(
            extract_title("【文章标题】: 央行按兵不动\n正文").as_deref(),
            Some("央行按兵不动")
        );
        assert_eq!(extract_title("没有标题"), None);
        assert_eq!(extract_title("【文章标题】"), None);
    }

    #[test]
    fn test_masthead_title_replaced_by_intro() {
        let mastheads = KeywordSet::new(["经济学人", "the economist"]);
        let payload = "【文章标题】：《经济学人》\n\n【引言】：欧洲央行再次降息，市场反应平淡。后续……";
        assert_eq!(
            generated_title(payload, &mastheads).as_deref(),
            Some("欧洲央行再次降息，市场反应平淡。")
        );
    }

    #[test]
    fn test_title_from_long_intro_is_truncated() {
        let intro = "甲".repeat(60);
        let payload = format!("【引言】：{intro}");
        let title = title_from_intro(&payload).unwrap();
        assert_eq!(title.chars().count(), 41);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_is_title_chunk() {
        assert!(is_title_chunk("【文章标题】：x"));
        assert!(!is_title_chunk("【引言】：x"));
    }
}
