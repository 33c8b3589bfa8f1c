//! 输出摘要领域模型
//!
//! 从 tofu 自由文本输出中提取的结构化统计

use serde::{Deserialize, Serialize};

/// 执行摘要
///
/// 三种已知形态的标签联合，缺失用 `Option<Summary>` 表达，
/// 不使用零值记录兜底
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Summary {
    /// `Plan: N to add, N to change, N to destroy`
    Plan {
        #[serde(rename = "toAdd")]
        to_add: u32,
        #[serde(rename = "toChange")]
        to_change: u32,
        #[serde(rename = "toDestroy")]
        to_destroy: u32,
    },
    /// `Apply complete! Resources: N added, N changed, N destroyed`
    Apply {
        added: u32,
        changed: u32,
        destroyed: u32,
    },
    /// `Destroy complete! Resources: N destroyed`
    Destroy { destroyed: u32 },
}

/// 资源变更动作
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    /// 根据行首变更标记分类
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '+' => Some(ChangeAction::Create),
            '~' => Some(ChangeAction::Update),
            '-' => Some(ChangeAction::Delete),
            _ => None,
        }
    }
}

/// 单条资源变更 (plan 渲染用)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceChange {
    pub action: ChangeAction,
    pub resource_type: String,
    pub name: String,
}

/// plan 输出的展示级分解
///
/// 独立于主摘要，仅用于 plan 渲染接口
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBreakdown {
    /// 与主摘要相同的统计（如存在）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// 按出现顺序收集的资源变更
    pub resource_changes: Vec<ResourceChange>,
    /// 输出中包含 "No changes." 时为 true
    pub no_changes: bool,
}
