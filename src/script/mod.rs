mod normalize;
mod parser;
mod tokenizer;
mod version;

pub use normalize::{normalize, normalize_texts};
pub use parser::StructuredParser;
pub use tokenizer::SentenceTokenizer;
pub use version::{build_version, export_approved, rebuild_version, regenerate_partial};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::scene::{Scene, ScriptConfig};

/// 把上游生成服务返回的原始文本变成恰好 N 个场景的引擎。
/// 结构化解析优先；失败就退回句子级联 + 定数规整。
pub struct ScriptEngine {
    config: ScriptConfig,
    tokenizer: SentenceTokenizer,
    parser: StructuredParser,
}

impl ScriptEngine {
    pub fn new(config: ScriptConfig) -> Self {
        Self {
            config,
            tokenizer: SentenceTokenizer::new(),
            parser: StructuredParser::new(),
        }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// 单脚本管线：结构化 -> 分词 -> 规整。
    /// 只有在输入完全为空时才会报错。
    pub fn build_scenes(&self, raw: &str) -> Result<Vec<Scene>> {
        if let Some(scenes) = self.parser.parse(raw, &self.config) {
            info!("Using structured scene blocks from upstream response");
            return Ok(scenes);
        }

        warn!("No usable structure in upstream response, using sentence cascade");
        let candidates = self.tokenizer.tokenize(raw, self.config.scene_count);
        if candidates.is_empty() {
            return Err(PipelineError::UpstreamFormatError(
                "upstream response contains no usable text".to_string(),
            ));
        }
        Ok(normalize(&candidates, &self.config))
    }

    /// 多脚本管线：按 `Variant k:` 拆分后逐个跑单脚本管线。
    /// 变体数量不符直接上报，调用方可以重试。
    pub fn build_scene_variants(&self, raw: &str, expected: usize) -> Result<Vec<Vec<Scene>>> {
        let variants = self.parser.split_variants(raw, expected)?;
        variants
            .iter()
            .map(|variant| self.build_scenes(variant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_response_wins_over_cascade() {
        let engine = ScriptEngine::new(ScriptConfig::new(2, 6.0));
        let raw = "Scene 1:\nNarration: The opening narration introduces the paper.\nPresentation:\n- Title\nScene 2:\nNarration: The closing narration sums everything up.\n";
        let scenes = engine.build_scenes(raw).unwrap();
        assert_eq!(scenes.len(), 2);
        assert!(scenes[0].presentation.is_some());
        assert!(scenes[1].presentation.is_none());
    }

    #[test]
    fn malformed_structure_falls_back_to_cascade() {
        let engine = ScriptEngine::new(ScriptConfig::new(3, 6.0));
        // 只有一个场景块，数量不符，整体回退
        let raw = "Scene 1:\nNarration: A lonely block that should be discarded entirely.\n";
        let scenes = engine.build_scenes(raw).unwrap();
        assert_eq!(scenes.len(), 3);
        // 回退路径没有演示要点
        assert!(scenes.iter().all(|s| s.presentation.is_none()));
    }

    #[test]
    fn empty_input_is_an_upstream_format_error() {
        let engine = ScriptEngine::new(ScriptConfig::default());
        assert!(matches!(
            engine.build_scenes("   "),
            Err(PipelineError::UpstreamFormatError(_))
        ));
    }

    #[test]
    fn variant_pipeline_builds_one_version_per_label() {
        let engine = ScriptEngine::new(ScriptConfig::new(1, 6.0));
        let raw = "Variant 1:\nScene 1:\nNarration: First take on the story.\nVariant 2:\nScene 1:\nNarration: Second take on the story.\n";
        let variants = engine.build_scene_variants(raw, 2).unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0][0].text, "First take on the story.");
        assert_eq!(variants[1][0].text, "Second take on the story.");
    }
}
