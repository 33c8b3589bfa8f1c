//! 步骤编排
//!
//! 解析工作区归属 → 定位执行环境 → 运行固定命令链。
//! 环境选择策略（取候选列表第一个）固定在此处，runner 不感知

use tracing::{error, info};

use crate::domain::{ExecutionResult, StepKind};
use crate::error::{ApiError, ApiResult};
use crate::infra::command::CommandError;
use crate::infra::TofuRunner;
use crate::state::AppState;

/// 一次步骤命令的执行产物
pub struct StepExecution {
    /// 实际执行的命令串（对外兼容的固定形式）
    pub command: &'static str,
    pub result: ExecutionResult,
}

/// 运行指定步骤类型的命令链
///
/// 非零退出码不是错误：照常返回结果，由台账记录为 failed 步骤
pub async fn run_step_command(
    state: &AppState,
    project_id: &str,
    space_id: &str,
    kind: StepKind,
    enable_logging: bool,
) -> ApiResult<StepExecution> {
    let image = state.config.runner_image.as_deref().ok_or_else(|| {
        ApiError::configuration("Execution image not configured (TOFU_RUNNER_IMAGE)")
    })?;

    let candidates = state.environments.candidates(image).await?;
    let environment_id = candidates.first().ok_or_else(|| {
        ApiError::configuration(format!(
            "No running execution environment for image '{}'",
            image
        ))
    })?;

    let names = state.directory.resolve(project_id, space_id).await?;
    let workspace_path = format!(
        "{}/{}/{}",
        state.config.workspace_root, names.project_name, names.space_name
    );

    info!(
        step = %kind,
        environment_id = %environment_id,
        workspace = %workspace_path,
        enable_logging = enable_logging,
        "Running step command"
    );

    let command = kind.command();
    let result = TofuRunner::execute(environment_id, &workspace_path, &[command], enable_logging)
        .await
        .map_err(|e| match e {
            CommandError::SpawnFailed(ref io_err) => {
                error!(
                    step = %kind,
                    environment_id = %environment_id,
                    workspace = %workspace_path,
                    error = %io_err,
                    "Failed to spawn step command"
                );
                ApiError::spawn(format!("Failed to start {} command: {}", kind, io_err))
            }
            other => ApiError::internal(other.to_string()),
        })?;

    info!(
        step = %kind,
        exit_code = ?result.exit_code,
        has_summary = result.summary.is_some(),
        "Step command finished"
    );

    Ok(StepExecution { command, result })
}
