use regex::Regex;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::scene::{normalize_key, Scene, ScriptConfig};

/// 解析上游按约定格式输出的场景块：
///
/// ```text
/// Scene 1:
/// Narration: 旁白正文，可以跨多行
/// Presentation:
/// - 要点一
/// - 要点二
/// ```
///
/// 结构化解析优先于纯文本级联，因为它保留了作者给出的演示要点。
pub struct StructuredParser {
    scene_marker: Regex,
    variant_marker: Regex,
    narration_line: Regex,
    presentation_line: Regex,
    bullet_line: Regex,
}

impl Default for StructuredParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredParser {
    pub fn new() -> Self {
        Self {
            scene_marker: Regex::new(r"(?im)^[ \t]*scene[ \t]+(\d+)[ \t]*[:.]").unwrap(),
            variant_marker: Regex::new(r"(?im)^[ \t]*variant[ \t]+(\d+)[ \t]*[:.]").unwrap(),
            narration_line: Regex::new(r"(?i)^[ \t]*narration[ \t]*[:：][ \t]*(.*)$").unwrap(),
            presentation_line: Regex::new(r"(?i)^[ \t]*presentation[ \t]*[:：]").unwrap(),
            bullet_line: Regex::new(r"^[ \t]*[-*•][ \t]*(.*)$").unwrap(),
        }
    }

    /// 场景块数量必须恰好等于 N，否则整体放弃，
    /// 由调用方把原始响应交给纯文本管线。
    /// 部分匹配不做位置补齐，避免结构化与非结构化场景混排。
    pub fn parse(&self, raw: &str, config: &ScriptConfig) -> Option<Vec<Scene>> {
        let blocks = self.scene_blocks(raw);
        if blocks.is_empty() {
            return None;
        }

        let mut parsed = Vec::new();
        for block in &blocks {
            if let Some((narration, bullets)) = self.parse_block(block) {
                parsed.push((narration, bullets));
            }
        }

        if parsed.len() != config.scene_count {
            warn!(
                "Structured response has {} usable scene blocks, expected {}, discarding",
                parsed.len(),
                config.scene_count
            );
            return None;
        }

        // 旁白必须互不重复，重复说明上游在凑数，整体放弃
        let mut seen = std::collections::HashSet::new();
        if parsed.iter().any(|(n, _)| !seen.insert(normalize_key(n))) {
            warn!("Structured response repeats narration text, discarding");
            return None;
        }

        info!("Parsed {} structured scene blocks", parsed.len());
        Some(
            parsed
                .into_iter()
                .enumerate()
                .map(|(i, (narration, bullets))| Scene::new(i, narration, bullets, config))
                .collect(),
        )
    }

    /// 按场景标记切出每个块的正文（不含标记行本身的前缀）
    fn scene_blocks<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        let starts: Vec<usize> = self.scene_marker.find_iter(raw).map(|m| m.start()).collect();
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(raw.len());
                &raw[start..end]
            })
            .collect()
    }

    /// 从一个块中取出旁白正文与要点。
    /// 旁白可以跨多行，遇到演示标记为止；要点行去掉前缀符号后保留非空项。
    /// 旁白为空的块被整个丢弃；没有要点的块保留旁白，要点记为缺失。
    fn parse_block(&self, block: &str) -> Option<(String, Option<Vec<String>>)> {
        let mut narration_parts: Vec<&str> = Vec::new();
        let mut bullets: Vec<String> = Vec::new();
        let mut in_narration = false;
        let mut in_presentation = false;

        for line in block.lines() {
            if let Some(caps) = self.narration_line.captures(line) {
                in_narration = true;
                in_presentation = false;
                let rest = caps.get(1).map_or("", |m| m.as_str()).trim();
                if !rest.is_empty() {
                    narration_parts.push(rest);
                }
                continue;
            }
            if self.presentation_line.is_match(line) {
                in_narration = false;
                in_presentation = true;
                continue;
            }
            if in_presentation {
                if let Some(caps) = self.bullet_line.captures(line) {
                    let bullet = caps.get(1).map_or("", |m| m.as_str()).trim();
                    if !bullet.is_empty() {
                        bullets.push(bullet.to_string());
                    }
                }
                continue;
            }
            if in_narration {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    narration_parts.push(trimmed);
                }
            }
        }

        let narration = narration_parts.join(" ");
        if narration.is_empty() {
            return None;
        }
        let bullets = if bullets.is_empty() { None } else { Some(bullets) };
        Some((narration, bullets))
    }

    /// 把一次响应按 `Variant k:` 标记切成多个独立脚本。
    /// 找到的数量与期望不一致时按可重试错误上报，绝不复制凑数。
    pub fn split_variants(&self, raw: &str, expected: usize) -> Result<Vec<String>> {
        let starts: Vec<usize> = self
            .variant_marker
            .find_iter(raw)
            .map(|m| m.start())
            .collect();

        if starts.is_empty() && expected == 1 {
            return Ok(vec![raw.to_string()]);
        }
        if starts.len() != expected {
            return Err(PipelineError::UpstreamCountMismatch {
                expected,
                found: starts.len(),
            });
        }

        Ok(starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(raw.len());
                raw[start..end].to_string()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured_response(scene_count: usize) -> String {
        (0..scene_count)
            .map(|i| {
                format!(
                    "Scene {}:\nNarration: Scene number {} explains one distinct idea.\nPresentation:\n- Point A for scene {}\n- Point B for scene {}\n",
                    i + 1,
                    i + 1,
                    i + 1,
                    i + 1
                )
            })
            .collect()
    }

    #[test]
    fn parses_full_structured_response() {
        let parser = StructuredParser::new();
        let cfg = ScriptConfig::new(15, 6.0);
        let scenes = parser.parse(&structured_response(15), &cfg).unwrap();
        assert_eq!(scenes.len(), 15);
        for (i, scene) in scenes.iter().enumerate() {
            assert_eq!(scene.id, format!("scene_{}", i + 1));
            assert_eq!(scene.presentation.as_ref().unwrap().len(), 2);
            assert!(!scene.approved);
        }
        assert_eq!(scenes[0].text, "Scene number 1 explains one distinct idea.");
    }

    #[test]
    fn narration_may_span_multiple_lines() {
        let parser = StructuredParser::new();
        let cfg = ScriptConfig::new(1, 6.0);
        let raw = "Scene 1:\nNarration: The narration starts here\nand continues on a second line.\nPresentation:\n- One point\n";
        let scenes = parser.parse(raw, &cfg).unwrap();
        assert_eq!(
            scenes[0].text,
            "The narration starts here and continues on a second line."
        );
    }

    #[test]
    fn missing_bullets_leave_presentation_unset() {
        let parser = StructuredParser::new();
        let cfg = ScriptConfig::new(1, 6.0);
        let raw = "Scene 1:\nNarration: Narration without any slide points.\n";
        let scenes = parser.parse(raw, &cfg).unwrap();
        assert!(scenes[0].presentation.is_none());
    }

    #[test]
    fn wrong_block_count_is_rejected_wholesale() {
        let parser = StructuredParser::new();
        let cfg = ScriptConfig::new(15, 6.0);
        assert!(parser.parse(&structured_response(10), &cfg).is_none());
        assert!(parser.parse("no markers at all in this text", &cfg).is_none());
    }

    #[test]
    fn empty_narration_blocks_are_dropped() {
        let parser = StructuredParser::new();
        let cfg = ScriptConfig::new(1, 6.0);
        let raw = "Scene 1:\nNarration:\nPresentation:\n- Orphan point\n";
        assert!(parser.parse(raw, &cfg).is_none());
    }

    #[test]
    fn splits_expected_variants() {
        let parser = StructuredParser::new();
        let raw = format!(
            "Variant 1:\n{}Variant 2:\n{}",
            structured_response(2),
            structured_response(2)
        );
        let variants = parser.split_variants(&raw, 2).unwrap();
        assert_eq!(variants.len(), 2);
        assert!(variants[0].starts_with("Variant 1:"));
        assert!(variants[1].starts_with("Variant 2:"));
    }

    #[test]
    fn variant_count_mismatch_is_an_error() {
        let parser = StructuredParser::new();
        let raw = format!("Variant 1:\n{}", structured_response(2));
        match parser.split_variants(&raw, 3) {
            Err(PipelineError::UpstreamCountMismatch { expected: 3, found: 1 }) => {}
            other => panic!("unexpected result: {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn unlabelled_response_counts_as_single_variant() {
        let parser = StructuredParser::new();
        let variants = parser.split_variants("plain text body", 1).unwrap();
        assert_eq!(variants, vec!["plain text body"]);
    }
}
