use crate::error::{PipelineError, Result};
use crate::scene::ScriptConfig;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const QWEN_TEXT_API: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

/// 千问文本生成客户端：唯一的外部协作方。
/// API key 由调用方显式传入，客户端不读任何进程级配置。
#[derive(Debug, Clone)]
pub struct QwenClient {
    api_key: String,
    client: Client,
}

impl QwenClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }

    /// 请求一份按约定场景格式输出的旁白脚本，返回原始文本
    pub async fn generate_script(&self, text: &str, config: &ScriptConfig) -> Result<String> {
        info!("Requesting narration script from Qwen...");
        self.complete(&script_prompt(text, config)).await
    }

    /// 请求多个独立脚本变体，每个以 `Variant k:` 开头
    pub async fn generate_script_variants(
        &self,
        text: &str,
        config: &ScriptConfig,
        variants: usize,
    ) -> Result<String> {
        info!("Requesting {} narration script variants from Qwen...", variants);
        self.complete(&variants_prompt(text, config, variants)).await
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "model": "qwen-plus",
            "input": {
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ]
            },
            "parameters": {
                "result_format": "message"
            }
        });

        let response = self
            .client
            .post(QWEN_TEXT_API)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(PipelineError::ApiError(format!(
                "Qwen API error: {}",
                error_text
            )));
        }

        let response_json: serde_json::Value = response.json().await?;

        let generated_text = response_json["output"]["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::ApiError("Failed to extract generated text".to_string()))?;

        // 清理可能的markdown标记
        let cleaned = generated_text
            .trim()
            .trim_start_matches("```text")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        info!("Received {} characters of generated script", cleaned.len());
        Ok(cleaned.to_string())
    }
}

fn script_prompt(text: &str, config: &ScriptConfig) -> String {
    format!(
        r#"请把以下研究文档改写为 {count} 个场景的英文视频旁白脚本，总时长约 {total} 秒。
严格按照如下格式输出每个场景，包含一句完整的英文旁白和 2-4 条简短的英文演示要点：

Scene 1:
Narration: <一句完整的英文旁白>
Presentation:
- <要点>
- <要点>

场景必须恰好 {count} 个，旁白互不重复，按开场、正文、结尾的顺序推进。
直接输出脚本，不要任何其他说明文字。

文档内容：
{text}"#,
        count = config.scene_count,
        total = config.total_seconds(),
        text = text
    )
}

fn variants_prompt(text: &str, config: &ScriptConfig, variants: usize) -> String {
    format!(
        r#"请为以下研究文档写出 {variants} 个互相独立的英文视频旁白脚本。
每个脚本以单独一行的 "Variant k:" 开头（k 从 1 开始），
脚本内部包含恰好 {count} 个场景，场景格式如下：

Scene 1:
Narration: <一句完整的英文旁白>
Presentation:
- <要点>
- <要点>

直接输出 {variants} 个脚本，不要任何其他说明文字。

文档内容：
{text}"#,
        variants = variants,
        count = config.scene_count,
        text = text
    )
}
