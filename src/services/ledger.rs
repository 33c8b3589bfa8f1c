//! 部署步骤台账
//!
//! 持有 Deployment 聚合与步骤历史：init 幂等替换，plan/apply/destroy
//! 只追加，取消只改写状态。每次变更在单次写锁持有期内完成，
//! 同一 deployment_id 上的并发请求不会丢失更新

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Deployment, ExecutionResult, Step, StepKind, StepStatus};
use crate::error::ApiError;

/// 新铸造的部署标识
#[derive(Clone, Debug)]
pub struct DeploymentIdentity {
    pub deployment_id: String,
    pub deployment_name: String,
}

/// 部署标识分配器
///
/// 注入式依赖：新部署的 id/name 铸造委托给它
pub trait IdentityAllocator: Send + Sync {
    fn allocate(&self) -> DeploymentIdentity;
}

const NAME_ADJECTIVES: &[&str] = &[
    "amber", "bold", "calm", "dapper", "eager", "fleet", "gentle", "hazy", "keen", "lively",
    "mellow", "nimble", "polished", "quiet", "rustic", "swift",
];

const NAME_NOUNS: &[&str] = &[
    "falcon", "harbor", "meadow", "otter", "pine", "quarry", "ridge", "sparrow", "summit",
    "tundra", "willow", "zephyr",
];

/// 默认分配器：uuid v4 + 可读名称
pub struct UuidIdentityAllocator;

impl IdentityAllocator for UuidIdentityAllocator {
    fn allocate(&self) -> DeploymentIdentity {
        let id = Uuid::new_v4();
        let bytes = id.as_bytes();
        let adjective = NAME_ADJECTIVES[bytes[0] as usize % NAME_ADJECTIVES.len()];
        let noun = NAME_NOUNS[bytes[1] as usize % NAME_NOUNS.len()];

        DeploymentIdentity {
            deployment_id: id.to_string(),
            deployment_name: format!("{}-{}", adjective, noun),
        }
    }
}

/// 台账错误
#[derive(Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// 未知部署
    DeploymentNotFound(String),
    /// 部署存在但没有可操作的步骤
    StepNotFound {
        deployment_id: String,
        kind: StepKind,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::DeploymentNotFound(id) => write!(f, "Deployment '{}' not found", id),
            LedgerError::StepNotFound {
                deployment_id,
                kind,
            } => write!(f, "No {} step in deployment '{}'", kind, deployment_id),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DeploymentNotFound(id) => {
                ApiError::not_found(format!("Deployment '{}'", id))
            }
            LedgerError::StepNotFound {
                deployment_id,
                kind,
            } => ApiError::not_found(format!(
                "Step '{}' in deployment '{}'",
                kind, deployment_id
            )),
        }
    }
}

/// 部署步骤台账
pub struct DeploymentLedger {
    deployments: RwLock<HashMap<String, Deployment>>,
    allocator: Arc<dyn IdentityAllocator>,
}

impl DeploymentLedger {
    /// 创建台账
    pub fn new(allocator: Arc<dyn IdentityAllocator>) -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
            allocator,
        }
    }

    /// 记录 init 步骤
    ///
    /// 无 id 时铸造新标识并创建聚合；有 id 时替换已有 init 步骤。
    /// 重复执行 init 始终只留下一条 init 记录，反映最近一次结果
    pub async fn record_init(
        &self,
        deployment_id: Option<&str>,
        project_id: &str,
        space_id: &str,
        result: &ExecutionResult,
    ) -> Result<DeploymentIdentity, LedgerError> {
        let step = Step::from_result(StepKind::Init, result);
        let mut deployments = self.deployments.write().await;

        match deployment_id {
            None => {
                let identity = self.allocator.allocate();
                let mut deployment = Deployment::new(
                    identity.deployment_id.clone(),
                    identity.deployment_name.clone(),
                    project_id.to_string(),
                    space_id.to_string(),
                );
                deployment.steps.push(step);
                deployments.insert(identity.deployment_id.clone(), deployment);
                Ok(identity)
            }
            Some(id) => {
                let deployment = deployments
                    .get_mut(id)
                    .ok_or_else(|| LedgerError::DeploymentNotFound(id.to_string()))?;
                // 替换而非追加：历史不增长
                deployment.steps.retain(|s| s.kind != StepKind::Init);
                deployment.steps.push(step);
                Ok(DeploymentIdentity {
                    deployment_id: deployment.deployment_id.clone(),
                    deployment_name: deployment.deployment_name.clone(),
                })
            }
        }
    }

    /// 追加 plan/apply/destroy 步骤
    ///
    /// 无条件追加，完整历史保留（与 init 不同）
    pub async fn append_step(
        &self,
        deployment_id: &str,
        kind: StepKind,
        result: &ExecutionResult,
    ) -> Result<(), LedgerError> {
        debug_assert!(kind != StepKind::Init, "init goes through record_init");

        let mut deployments = self.deployments.write().await;
        let deployment = deployments
            .get_mut(deployment_id)
            .ok_or_else(|| LedgerError::DeploymentNotFound(deployment_id.to_string()))?;
        deployment.steps.push(Step::from_result(kind, result));
        Ok(())
    }

    /// 取消指定类型的步骤
    ///
    /// 原地改写最近一条该类型步骤的状态并刷新时间戳，
    /// 不追加也不删除历史。cancelled 只能从这里到达
    pub async fn cancel_step(
        &self,
        deployment_id: &str,
        kind: StepKind,
    ) -> Result<(), LedgerError> {
        let mut deployments = self.deployments.write().await;
        let deployment = deployments
            .get_mut(deployment_id)
            .ok_or_else(|| LedgerError::DeploymentNotFound(deployment_id.to_string()))?;

        let step = deployment
            .steps
            .iter_mut()
            .rev()
            .find(|s| s.kind == kind)
            .ok_or_else(|| LedgerError::StepNotFound {
                deployment_id: deployment_id.to_string(),
                kind,
            })?;

        step.status = StepStatus::Cancelled;
        step.timestamp = chrono::Utc::now();
        Ok(())
    }

    /// 读取部署聚合
    pub async fn get(&self, deployment_id: &str) -> Option<Deployment> {
        let deployments = self.deployments.read().await;
        deployments.get(deployment_id).cloned()
    }

    /// 当前部署数量
    pub async fn count(&self) -> usize {
        let deployments = self.deployments.read().await;
        deployments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> DeploymentLedger {
        DeploymentLedger::new(Arc::new(UuidIdentityAllocator))
    }

    fn result_with_exit(code: i32) -> ExecutionResult {
        ExecutionResult {
            exit_code: Some(code),
            combined: format!("exit {}", code),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_record_init_creates_deployment() {
        let ledger = ledger();
        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        assert_eq!(deployment.project_id, "proj");
        assert_eq!(deployment.space_id, "space");
        assert_eq!(deployment.deployment_name, identity.deployment_name);
        assert_eq!(deployment.steps.len(), 1);
        assert_eq!(deployment.steps[0].kind, StepKind::Init);
        assert_eq!(deployment.steps[0].status, StepStatus::Successful);
    }

    #[tokio::test]
    async fn test_record_init_is_idempotent() {
        let ledger = ledger();
        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();

        // 第二次 init 失败：仍只有一条 init，反映最新结果
        ledger
            .record_init(
                Some(&identity.deployment_id),
                "proj",
                "space",
                &result_with_exit(1),
            )
            .await
            .unwrap();

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        let inits: Vec<_> = deployment
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Init)
            .collect();
        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_record_init_unknown_deployment() {
        let ledger = ledger();
        let err = ledger
            .record_init(Some("missing"), "proj", "space", &result_with_exit(0))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DeploymentNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_append_step_accumulates() {
        let ledger = ledger();
        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();

        for _ in 0..3 {
            ledger
                .append_step(&identity.deployment_id, StepKind::Plan, &result_with_exit(0))
                .await
                .unwrap();
        }

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        let plans = deployment
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Plan)
            .count();
        assert_eq!(plans, 3);
    }

    #[tokio::test]
    async fn test_append_step_unknown_deployment() {
        let ledger = ledger();
        let err = ledger
            .append_step("missing", StepKind::Apply, &result_with_exit(0))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DeploymentNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_step_overwrites_in_place() {
        let ledger = ledger();
        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();
        ledger
            .append_step(&identity.deployment_id, StepKind::Plan, &result_with_exit(0))
            .await
            .unwrap();

        let before = ledger.get(&identity.deployment_id).await.unwrap();
        let before_ts = before.steps.last().unwrap().timestamp;

        ledger
            .cancel_step(&identity.deployment_id, StepKind::Plan)
            .await
            .unwrap();

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        // 不追加新条目
        assert_eq!(deployment.steps.len(), before.steps.len());
        let plan = deployment.steps.last().unwrap();
        assert_eq!(plan.status, StepStatus::Cancelled);
        assert!(plan.timestamp >= before_ts);
    }

    #[tokio::test]
    async fn test_cancel_targets_most_recent_entry() {
        let ledger = ledger();
        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();
        ledger
            .append_step(&identity.deployment_id, StepKind::Plan, &result_with_exit(0))
            .await
            .unwrap();
        ledger
            .append_step(&identity.deployment_id, StepKind::Plan, &result_with_exit(1))
            .await
            .unwrap();

        ledger
            .cancel_step(&identity.deployment_id, StepKind::Plan)
            .await
            .unwrap();

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        let plans: Vec<_> = deployment
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Plan)
            .collect();
        assert_eq!(plans[0].status, StepStatus::Successful);
        assert_eq!(plans[1].status, StepStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_not_found_leaves_ledger_unchanged() {
        let ledger = ledger();
        let err = ledger.cancel_step("missing", StepKind::Plan).await.unwrap_err();
        assert_eq!(err, LedgerError::DeploymentNotFound("missing".to_string()));

        let identity = ledger
            .record_init(None, "proj", "space", &result_with_exit(0))
            .await
            .unwrap();
        let err = ledger
            .cancel_step(&identity.deployment_id, StepKind::Plan)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StepNotFound { .. }));

        let deployment = ledger.get(&identity.deployment_id).await.unwrap();
        assert_eq!(deployment.steps.len(), 1);
        assert_eq!(deployment.steps[0].status, StepStatus::Successful);
    }

    #[test]
    fn test_allocator_mints_distinct_ids() {
        let allocator = UuidIdentityAllocator;
        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_ne!(a.deployment_id, b.deployment_id);
        assert!(a.deployment_name.contains('-'));
    }
}
