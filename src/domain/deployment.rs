//! 部署相关领域模型
//!
//! Deployment 聚合、Step 历史与命令执行结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::summary::Summary;

/// 步骤类型
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Init,
    Plan,
    Apply,
    Destroy,
}

impl StepKind {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Init => "init",
            StepKind::Plan => "plan",
            StepKind::Apply => "apply",
            StepKind::Destroy => "destroy",
        }
    }

    /// 该步骤对应的固定命令串（对外兼容，不可改动）
    pub fn command(&self) -> &'static str {
        match self {
            StepKind::Init => "tofu init -input=false -no-color",
            StepKind::Plan => "tofu plan -input=false -no-color",
            StepKind::Apply => "tofu apply -auto-approve -input=false -no-color",
            StepKind::Destroy => "tofu destroy -auto-approve -input=false -no-color",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 步骤状态
///
/// cancelled 只能通过显式取消操作到达，不由退出码推导
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Successful,
    Failed,
    Cancelled,
}

impl StepStatus {
    /// 统一的状态推导：所有产生步骤的操作共用
    pub fn from_exit_code(exit_code: Option<i32>) -> Self {
        if exit_code == Some(0) {
            StepStatus::Successful
        } else {
            StepStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Successful => "successful",
            StepStatus::Failed => "failed",
            StepStatus::Cancelled => "cancelled",
        }
    }
}

/// 部署步骤
///
/// 一次命令链执行的不可变记录
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub kind: StepKind,
    pub status: StepStatus,
    /// 原始捕获文本，可能很大
    pub message: String,
    /// 可选的详细诊断日志
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Step {
    /// 由执行结果派生步骤
    pub fn from_result(kind: StepKind, result: &ExecutionResult) -> Self {
        Self {
            kind,
            status: StepStatus::from_exit_code(result.exit_code),
            message: result.combined.clone(),
            log_file_content: result.log_file_content.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// 部署聚合根
///
/// 仅由 Ledger 持有和修改，steps 的插入顺序构成审计轨迹
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub deployment_id: String,
    pub project_id: String,
    pub space_id: String,
    pub deployment_name: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<Step>,
}

impl Deployment {
    /// 创建新部署
    pub fn new(
        deployment_id: String,
        deployment_name: String,
        project_id: String,
        space_id: String,
    ) -> Self {
        Self {
            deployment_id,
            project_id,
            space_id,
            deployment_name,
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }
}

/// 命令执行结果（瞬态值，不直接持久化）
#[derive(Clone, Debug, Default)]
pub struct ExecutionResult {
    /// 子进程退出码，被信号终止时为 None
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// 按到达顺序拼接的两路输出
    pub combined: String,
    pub log_file_content: Option<String>,
    pub summary: Option<Summary>,
}

impl ExecutionResult {
    /// 退出码是否为成功
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_commands_exact() {
        assert_eq!(StepKind::Init.command(), "tofu init -input=false -no-color");
        assert_eq!(StepKind::Plan.command(), "tofu plan -input=false -no-color");
        assert_eq!(
            StepKind::Apply.command(),
            "tofu apply -auto-approve -input=false -no-color"
        );
        assert_eq!(
            StepKind::Destroy.command(),
            "tofu destroy -auto-approve -input=false -no-color"
        );
    }

    #[test]
    fn test_status_from_exit_code() {
        assert_eq!(StepStatus::from_exit_code(Some(0)), StepStatus::Successful);
        assert_eq!(StepStatus::from_exit_code(Some(1)), StepStatus::Failed);
        // 被信号终止视为失败
        assert_eq!(StepStatus::from_exit_code(None), StepStatus::Failed);
    }

    #[test]
    fn test_step_from_result_keeps_combined_as_message() {
        let result = ExecutionResult {
            exit_code: Some(0),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            combined: "out\nerr\n".to_string(),
            ..Default::default()
        };
        let step = Step::from_result(StepKind::Plan, &result);
        assert_eq!(step.kind, StepKind::Plan);
        assert_eq!(step.status, StepStatus::Successful);
        assert_eq!(step.message, "out\nerr\n");
        assert!(step.log_file_content.is_none());
    }
}
