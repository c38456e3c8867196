use std::collections::HashSet;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::scene::{ExportProjection, ExportStatus, Scene, ScriptVersion};

/// 初次构建：版本号 1，所有场景待审批
pub fn build_version(scenes: Vec<Scene>) -> ScriptVersion {
    ScriptVersion::new(scenes, 1)
}

/// 完整重新生成：忽略审批状态，版本号 +1
pub fn rebuild_version(current: &ScriptVersion, scenes: Vec<Scene>) -> ScriptVersion {
    ScriptVersion::new(scenes, current.version + 1)
}

/// 部分重新生成的合并规则，逐位置处理：
/// - 已审批的场景原样保留（文本、时间、id、要点、审批标记）
/// - 未审批的场景换入新文本与要点，但保留原 id 与时间
/// - 全部已审批时不做任何事，原版本原样返回
///
/// 新候选数量与当前场景数不一致属于上游管线缺陷，
/// 直接报错而不是静默截断或补齐，否则场景对位会被破坏。
pub fn regenerate_partial(current: &ScriptVersion, fresh: &[Scene]) -> Result<ScriptVersion> {
    if fresh.len() != current.scenes.len() {
        return Err(PipelineError::ContractViolation(format!(
            "fresh candidate count {} does not match scene count {}",
            fresh.len(),
            current.scenes.len()
        )));
    }

    let mut ids = HashSet::new();
    if current.scenes.iter().any(|s| !ids.insert(s.id.as_str())) {
        return Err(PipelineError::ContractViolation(
            "current version has duplicate scene ids".to_string(),
        ));
    }

    if current.all_approved() {
        info!("All scenes already approved, regeneration is a no-op");
        return Ok(current.clone());
    }

    let scenes: Vec<Scene> = current
        .scenes
        .iter()
        .zip(fresh)
        .map(|(cur, new)| {
            if cur.approved {
                cur.clone()
            } else {
                Scene {
                    id: cur.id.clone(),
                    text: new.text.clone(),
                    presentation: new.presentation.clone(),
                    approved: false,
                    start_time: cur.start_time,
                    end_time: cur.end_time,
                }
            }
        })
        .collect();

    let replaced = current.scenes.iter().filter(|s| !s.approved).count();
    info!(
        "Partial regeneration replaced {} of {} scenes (version {} -> {})",
        replaced,
        current.scenes.len(),
        current.version,
        current.version + 1
    );
    Ok(ScriptVersion::new(scenes, current.version + 1))
}

/// 只读导出：拼接已审批台词；一条都没有时退回完整 raw_text
pub fn export_approved(version: &ScriptVersion) -> ExportProjection {
    let approved: Vec<&str> = version
        .scenes
        .iter()
        .filter(|s| s.approved)
        .map(|s| s.text.as_str())
        .collect();

    let final_text = if approved.is_empty() {
        version.raw_text.clone()
    } else {
        approved.join(" ")
    };

    let status = if version.all_approved() {
        ExportStatus::Approved
    } else {
        ExportStatus::Draft
    };

    ExportProjection {
        final_text,
        scenes: version.scenes.clone(),
        status,
    }
}
