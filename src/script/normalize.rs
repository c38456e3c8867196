use std::collections::HashSet;

use tracing::warn;

use super::tokenizer::{chunk_words, with_period};
use crate::scene::{normalize_key, Scene, ScriptConfig};

/// 超过这个词数的条目才允许被二次切分
const MIN_SPLIT_WORDS: usize = 10;

/// 把任意数量的候选句子规整为恰好 N 个互不重复的场景。
/// 对同样的输入输出逐字节一致，且永不失败：
/// 最后的兜底是带编号的占位条目。
pub fn normalize(candidates: &[String], config: &ScriptConfig) -> Vec<Scene> {
    let texts = normalize_texts(candidates, config.scene_count);
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Scene::new(i, text, None, config))
        .collect()
}

/// 只做文本层面的规整，场景装配交给 [`normalize`]
pub fn normalize_texts(candidates: &[String], scene_count: usize) -> Vec<String> {
    let unique = first_occurrences(candidates);

    let assembled = if unique.len() >= scene_count {
        // 候选充足：按序保留前 N 个首次出现的句子
        unique.into_iter().take(scene_count).collect()
    } else {
        redistribute(&unique, scene_count)
    };

    ensure_unique(assembled, scene_count)
}

/// 去重后按原顺序保留每个规范化形式的首次出现
fn first_occurrences(candidates: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for candidate in candidates {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(normalize_key(trimmed)) {
            unique.push(trimmed.to_string());
        }
    }
    unique
}

/// 候选不足 N 时的重分配：把全部词流按 `ceil(total/N)` 均分，
/// 仍不够就二次切分最长的条目，最后用占位条目补齐
fn redistribute(candidates: &[String], scene_count: usize) -> Vec<String> {
    let words: Vec<&str> = candidates
        .iter()
        .flat_map(|c| c.split_whitespace())
        .collect();
    let mut slots = chunk_words(&words, scene_count);

    while slots.len() < scene_count {
        let Some(idx) = longest_splittable(&slots) else {
            break;
        };
        let (head, tail) = split_in_half(&slots[idx]);
        slots[idx] = head;
        slots.insert(idx + 1, tail);
    }

    while slots.len() < scene_count {
        let placeholder = format!("Scene {} needs regeneration.", slots.len() + 1);
        warn!("Not enough content, inserting placeholder: {}", placeholder);
        slots.push(placeholder);
    }

    slots
}

fn longest_splittable(slots: &[String]) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.split_whitespace().count()))
        .filter(|&(_, words)| words > MIN_SPLIT_WORDS)
        .max_by_key(|&(_, words)| words)
        .map(|(i, _)| i)
}

fn split_in_half(slot: &str) -> (String, String) {
    let words: Vec<&str> = slot.split_whitespace().collect();
    let mid = words.len() / 2;
    (with_period(words[..mid].join(" ")), words[mid..].join(" "))
}

/// 最终查重：逐项保留首次出现，被丢弃的重复项
/// 以带编号的占位条目补回，保证恰好 N 个且互不重复
fn ensure_unique(assembled: Vec<String>, scene_count: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(scene_count);
    let mut dropped = 0usize;
    for text in assembled {
        if seen.insert(normalize_key(&text)) {
            out.push(text);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!("Dropped {} duplicate segments during final uniqueness pass", dropped);
    }

    let mut counter = 0usize;
    while out.len() < scene_count {
        counter += 1;
        let placeholder = format!("Additional content segment {}.", counter);
        if seen.insert(normalize_key(&placeholder)) {
            out.push(placeholder);
        }
    }
    out
}
