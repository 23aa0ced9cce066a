//! Prompt construction for analysis and translation runs.
//!
//! Both prompts ask for a `【文章标题】` line first; the aggregator and the
//! writer read the generated title from it.

use super::TransformKind;
use crate::segmenter::Article;

pub const SYSTEM_PROMPT: &str = "You are a financial analyst assistant. The user supplies \
English articles for personal study; analyse or translate them into Chinese exactly as \
requested.";

/// Rough output-size class derived from the source length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Short,
    Medium,
    Long,
}

impl DetailLevel {
    pub fn for_content(content: &str) -> Self {
        match content.chars().count() {
            n if n < 3000 => DetailLevel::Short,
            n if n < 12000 => DetailLevel::Medium,
            _ => DetailLevel::Long,
        }
    }

    fn length_hint(&self) -> &'static str {
        match self {
            DetailLevel::Short => "这篇原文较短，请将总输出控制在约 800 字左右。",
            DetailLevel::Medium => "这篇原文篇幅中等，请将总输出控制在约 1500 字左右。",
            DetailLevel::Long => "这篇原文较长，请将总输出控制在约 3000 字左右。",
        }
    }
}

/// Build the user prompt for one article. `content` is the (possibly
/// truncated) body actually sent.
pub fn build_prompt(
    kind: TransformKind,
    article: &Article,
    content: &str,
    index: usize,
    total: usize,
) -> String {
    match kind {
        TransformKind::Analyze => analyze_prompt(article, content, index, total),
        TransformKind::Translate => translate_prompt(article, content, index, total),
    }
}

fn analyze_prompt(article: &Article, content: &str, index: usize, total: usize) -> String {
    let hint = DetailLevel::for_content(content).length_hint();
    format!(
        "你是一名熟悉经济与金融领域的中文分析师。请对下面的英文文章做结构化分析，用中文转述并提取关键信息。\n\n\
         这是第 {index} 篇，共 {total} 篇。原文标题：{title}\n\n\
         请严格按以下结构输出：\n\
         【文章标题】：翻译原文标题；不得使用刊名（如《经济学人》、The Economist）作为标题。\n\
         【引言】：一到两句话点明背景或核心问题。\n\
         【主要内容如下】：分段转述核心内容，保留关键细节。\n\
         【关键数据】：列出金额、百分比、年份等硬指标，没有则写“无”。\n\
         【核心结论】：一句话提炼主要观点。\n\
         【分析师简评】：从专业角度简要点评。\n\n\
         要求：输出中文；保留以上每个小节标题（含全角括号与冒号），小节之间空一行；不要添加额外说明。\
         如果原文是漫画、读者来信或纯目录，只输出【不生成口播稿】。{hint}\n\n\
         英文原文：\n\n{content}",
        title = article.title,
    )
}

fn translate_prompt(article: &Article, content: &str, index: usize, total: usize) -> String {
    format!(
        "请将下面的英文文章完整、准确地翻译成中文，保持原文段落结构，不要删减或概括。\n\n\
         这是第 {index} 篇，共 {total} 篇。原文标题：{title}\n\n\
         输出格式：\n\
         【文章标题】：中文标题\n\n\
         【正文】：\n译文正文，段落之间空一行。\n\n\
         英文原文：\n\n{content}",
        title = article.title,
    )
}
