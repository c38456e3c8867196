use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 脚本分镜配置：场景数量与每个场景的时长（秒）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// 固定场景数量 N
    pub scene_count: usize,
    /// 每个场景的固定时长（秒）
    pub slot_seconds: f64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        // 15 个场景 x 6 秒 = 90 秒短视频
        Self {
            scene_count: 15,
            slot_seconds: 6.0,
        }
    }
}

impl ScriptConfig {
    pub fn new(scene_count: usize, slot_seconds: f64) -> Self {
        Self {
            scene_count,
            slot_seconds,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        self.scene_count as f64 * self.slot_seconds
    }

    /// 场景 id 由位置派生，内部 0 起始，id 中 1 起始
    pub fn scene_id(&self, index: usize) -> String {
        format!("scene_{}", index + 1)
    }

    /// 固定槽位时间：`[index * slot, (index+1) * slot)`
    pub fn slot(&self, index: usize) -> (f64, f64) {
        (
            index as f64 * self.slot_seconds,
            (index + 1) as f64 * self.slot_seconds,
        )
    }
}

/// 查重用的规范化：小写 + 压缩空白
pub fn normalize_key(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 表示一个可独立审批的场景（台词 + 时间 + 可选的演示要点）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// 场景 id（`scene_1` 起），创建后不再重新分配
    pub id: String,
    /// 旁白台词（用于语音与字幕）
    pub text: String,
    /// 幻灯片演示要点，可能完全缺失
    pub presentation: Option<Vec<String>>,
    /// 用户审批标记，引擎只读，仅在部分重新生成时保留
    pub approved: bool,
    /// 开始时间（秒）
    pub start_time: f64,
    /// 结束时间（秒）
    pub end_time: f64,
}

impl Scene {
    pub fn new(
        index: usize,
        text: String,
        presentation: Option<Vec<String>>,
        config: &ScriptConfig,
    ) -> Self {
        let (start_time, end_time) = config.slot(index);
        Self {
            id: config.scene_id(index),
            text,
            presentation,
            approved: false,
            start_time,
            end_time,
        }
    }
}

/// 一个版本的完整脚本：固定数量的有序场景 + 版本号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptVersion {
    pub scenes: Vec<Scene>,
    /// 单调递增，初始为 1，每次（部分）重新生成 +1
    pub version: u32,
    /// 所有场景台词按序空格拼接的缓存
    pub raw_text: String,
    pub generated_at: DateTime<Utc>,
}

impl ScriptVersion {
    pub fn new(scenes: Vec<Scene>, version: u32) -> Self {
        let raw_text = scenes
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            scenes,
            version,
            raw_text,
            generated_at: Utc::now(),
        }
    }

    pub fn all_approved(&self) -> bool {
        !self.scenes.is_empty() && self.scenes.iter().all(|s| s.approved)
    }
}

// generated_at 不参与相等比较，重新生成的无操作路径按值比较
impl PartialEq for ScriptVersion {
    fn eq(&self, other: &Self) -> bool {
        self.scenes == other.scenes
            && self.version == other.version
            && self.raw_text == other.raw_text
    }
}

/// 导出状态：全部审批通过才是 approved
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Draft,
    Approved,
}

/// 只读导出投影，不修改 ScriptVersion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProjection {
    /// 已审批场景台词的拼接；无任何审批时退回完整 raw_text
    pub final_text: String,
    pub scenes: Vec<Scene>,
    pub status: ExportStatus,
}
