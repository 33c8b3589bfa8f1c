//! 部署步骤 API
//!
//! init/plan/apply/destroy/cancel 端点与历史查询

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{Deployment, PlanBreakdown, StepKind, Summary};
use crate::error::{ApiError, ApiResult};
use crate::services::provision::{self, StepExecution};
use crate::services::summary;
use crate::state::AppState;

/// init 步骤请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    pub project_id: Option<String>,
    pub space_id: Option<String>,
    /// 已有部署再次 init 时携带
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub enable_logging: bool,
}

/// plan/apply/destroy 步骤请求
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    #[serde(default)]
    pub enable_logging: bool,
}

/// 步骤端点统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub command: String,
    pub deployment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub combined: String,
    pub log_file_content: Option<String>,
    pub summary: Option<Summary>,
}

impl StepResponse {
    fn from_execution(
        execution: StepExecution,
        deployment_id: String,
        deployment_name: Option<String>,
    ) -> Self {
        let result = execution.result;
        Self {
            command: execution.command.to_string(),
            deployment_id,
            deployment_name,
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
            combined: result.combined,
            log_file_content: result.log_file_content,
            summary: result.summary,
        }
    }
}

/// 取消端点响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
    pub deployment_id: String,
}

/// 创建部署步骤路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deployments/init", post(run_init))
        .route("/deployments/:deployment_id/plan", post(run_plan))
        .route("/deployments/:deployment_id/apply", post(run_apply))
        .route("/deployments/:deployment_id/destroy", post(run_destroy))
        .route("/deployments/:deployment_id/plan/cancel", post(cancel_plan))
        .route("/deployments/:deployment_id", get(get_deployment))
        .route(
            "/deployments/:deployment_id/plan/breakdown",
            get(get_plan_breakdown),
        )
}

/// 执行 init 并记录
///
/// POST /deployments/init
///
/// 不带 deploymentId 时创建新部署；带 id 时幂等地替换 init 步骤
async fn run_init(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitRequest>,
) -> ApiResult<impl IntoResponse> {
    let project_id = request
        .project_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required field: projectId"))?;
    let space_id = request
        .space_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required field: spaceId"))?;

    let execution = provision::run_step_command(
        &state,
        project_id,
        space_id,
        StepKind::Init,
        request.enable_logging,
    )
    .await?;

    let identity = state
        .ledger
        .record_init(
            request.deployment_id.as_deref(),
            project_id,
            space_id,
            &execution.result,
        )
        .await?;

    tracing::info!(
        deployment_id = %identity.deployment_id,
        exit_code = ?execution.result.exit_code,
        "Recorded init step"
    );

    Ok(Json(StepResponse::from_execution(
        execution,
        identity.deployment_id,
        Some(identity.deployment_name),
    )))
}

async fn run_plan(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
    request: Option<Json<StepRequest>>,
) -> ApiResult<impl IntoResponse> {
    run_and_append(state, deployment_id, StepKind::Plan, request).await
}

async fn run_apply(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
    request: Option<Json<StepRequest>>,
) -> ApiResult<impl IntoResponse> {
    run_and_append(state, deployment_id, StepKind::Apply, request).await
}

async fn run_destroy(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
    request: Option<Json<StepRequest>>,
) -> ApiResult<impl IntoResponse> {
    run_and_append(state, deployment_id, StepKind::Destroy, request).await
}

/// plan/apply/destroy 的公共路径：查聚合 → 执行 → 追加
async fn run_and_append(
    state: Arc<AppState>,
    deployment_id: String,
    kind: StepKind,
    request: Option<Json<StepRequest>>,
) -> ApiResult<Json<StepResponse>> {
    let enable_logging = request.map(|Json(r)| r.enable_logging).unwrap_or(false);

    // 工作区归属取自聚合本身
    let deployment = state
        .ledger
        .get(&deployment_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Deployment '{}'", deployment_id)))?;

    let execution = provision::run_step_command(
        &state,
        &deployment.project_id,
        &deployment.space_id,
        kind,
        enable_logging,
    )
    .await?;

    state
        .ledger
        .append_step(&deployment_id, kind, &execution.result)
        .await?;

    tracing::info!(
        deployment_id = %deployment_id,
        step = %kind,
        exit_code = ?execution.result.exit_code,
        "Appended step"
    );

    Ok(Json(StepResponse::from_execution(
        execution,
        deployment_id,
        Some(deployment.deployment_name),
    )))
}

/// 取消 plan 步骤
///
/// POST /deployments/:deployment_id/plan/cancel
///
/// 原地改写状态，不追加新条目
async fn cancel_plan(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.ledger.cancel_step(&deployment_id, StepKind::Plan).await?;

    tracing::info!(deployment_id = %deployment_id, "Cancelled plan step");

    Ok(Json(CancelResponse {
        success: true,
        message: "Plan step cancelled".to_string(),
        deployment_id,
    }))
}

/// 查询部署聚合与步骤历史
///
/// GET /deployments/:deployment_id
async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
) -> ApiResult<Json<Deployment>> {
    let deployment = state
        .ledger
        .get(&deployment_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Deployment '{}'", deployment_id)))?;
    Ok(Json(deployment))
}

/// 渲染最近一次 plan 的展示级分解
///
/// GET /deployments/:deployment_id/plan/breakdown
async fn get_plan_breakdown(
    State(state): State<Arc<AppState>>,
    Path(deployment_id): Path<String>,
) -> ApiResult<Json<PlanBreakdown>> {
    let deployment = state
        .ledger
        .get(&deployment_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Deployment '{}'", deployment_id)))?;

    let plan = deployment
        .steps
        .iter()
        .rev()
        .find(|s| s.kind == StepKind::Plan)
        .ok_or_else(|| {
            ApiError::not_found(format!("Plan step in deployment '{}'", deployment_id))
        })?;

    Ok(Json(summary::extract_plan_breakdown(&plan.message)))
}
