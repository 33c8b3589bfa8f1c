//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::EnvConfig;
use crate::infra::{DockerEnvironmentLocator, EnvironmentLocator, ProjectDirectoryClient};
use crate::services::{DeploymentLedger, IdentityAllocator, UuidIdentityAllocator};

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    /// 部署步骤台账
    pub ledger: DeploymentLedger,
    /// 执行环境定位器
    pub environments: Arc<dyn EnvironmentLocator>,
    /// 项目目录客户端
    pub directory: ProjectDirectoryClient,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new() -> Self {
        let config = EnvConfig::from_env();

        tracing::info!(
            port = config.port,
            runner_image = ?config.runner_image,
            workspace_root = %config.workspace_root,
            project_service = ?config.project_service_url,
            "Loaded configuration"
        );

        Self::with_parts(
            config,
            Arc::new(DockerEnvironmentLocator),
            Arc::new(UuidIdentityAllocator),
        )
    }

    /// 注入依赖的构造方式（测试用）
    pub fn with_parts(
        config: EnvConfig,
        environments: Arc<dyn EnvironmentLocator>,
        allocator: Arc<dyn IdentityAllocator>,
    ) -> Self {
        let directory = ProjectDirectoryClient::new(config.project_service_url.clone());

        Self {
            started_at: Utc::now(),
            ledger: DeploymentLedger::new(allocator),
            environments,
            directory,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
