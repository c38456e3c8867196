use regex::Regex;
use tracing::warn;

/// 过滤零碎片段的最小长度（字符数）
const MIN_FRAGMENT_CHARS: usize = 20;

/// 把自由文本拆分为候选句子的级联分词器。
/// 每一层只有在前一层零结果时才会启用。
pub struct SentenceTokenizer {
    /// 第一层：终止标点 + 空白 + 大写字母的句子边界
    boundary: Regex,
    /// 第二层：只看终止标点的连续串
    terminators: Regex,
}

impl Default for SentenceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceTokenizer {
    pub fn new() -> Self {
        Self {
            boundary: Regex::new(r"([.!?]+)\s+(\p{Lu})").unwrap(),
            terminators: Regex::new(r"[.!?]+").unwrap(),
        }
    }

    /// 级联拆分。最后一层按词均分，除非输入完全为空，否则必有结果。
    pub fn tokenize(&self, text: &str, scene_count: usize) -> Vec<String> {
        let fragments = self.split_on_boundaries(text);
        if !fragments.is_empty() {
            return fragments;
        }

        warn!("Boundary split yielded nothing, falling back to bare terminator split");
        let fragments = self.split_on_terminators(text);
        if !fragments.is_empty() {
            return fragments;
        }

        warn!(
            "Terminator split yielded nothing, redistributing words into {} chunks",
            scene_count
        );
        let words: Vec<&str> = text.split_whitespace().collect();
        chunk_words(&words, scene_count)
    }

    /// 保留标点：片段收在标点串末尾，下一片段从大写字母开始。
    /// 一个边界都没有就视为本层失败，交给下一层处理小写续句。
    fn split_on_boundaries(&self, text: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut start = 0usize;
        for caps in self.boundary.captures_iter(text) {
            let punct = caps.get(1).unwrap();
            let next = caps.get(2).unwrap();
            fragments.push(&text[start..punct.end()]);
            start = next.start();
        }
        if fragments.is_empty() {
            return Vec::new();
        }
        fragments.push(&text[start..]);
        keep_meaningful(fragments)
    }

    fn split_on_terminators(&self, text: &str) -> Vec<String> {
        keep_meaningful(self.terminators.split(text).collect())
    }
}

fn keep_meaningful(fragments: Vec<&str>) -> Vec<String> {
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| f.chars().count() > MIN_FRAGMENT_CHARS)
        .map(str::to_string)
        .collect()
}

/// 把词流均分为至多 `slots` 段：每段 `ceil(len/slots)` 个词，
/// 末段吸收余数；非末段补句号
pub(crate) fn chunk_words(words: &[&str], slots: usize) -> Vec<String> {
    if words.is_empty() || slots == 0 {
        return Vec::new();
    }
    let per_chunk = words.len().div_ceil(slots);
    let chunks: Vec<String> = words
        .chunks(per_chunk)
        .map(|chunk| chunk.join(" "))
        .collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| if i < last { with_period(chunk) } else { chunk })
        .collect()
}

/// 自带终止标点的片段不再重复补句号
pub(crate) fn with_period(fragment: String) -> String {
    if fragment.ends_with(['.', '!', '?']) {
        fragment
    } else {
        format!("{}.", fragment)
    }
}
