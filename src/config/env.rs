//! 环境变量配置加载

use std::env;

/// 常量集中定义
pub mod constants {
    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 日志回读的硬超时（秒）
    ///
    /// 回读是次要操作，超时后强制终止，绝不拖慢主结果
    pub const LOG_READ_TIMEOUT_SECS: u64 = 3;

    /// 默认工作区根目录
    pub const DEFAULT_WORKSPACE_ROOT: &str = "/workspace";

    /// 默认监听端口
    pub const DEFAULT_PORT: u16 = 9100;
}

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// 执行环境镜像标签（未设置时步骤请求返回配置错误）
    pub runner_image: Option<String>,
    /// 工作区根目录
    pub workspace_root: String,
    /// 项目目录服务 URL（可选，未设置时降级为直接使用 id）
    pub project_service_url: Option<String>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::DEFAULT_PORT);

        let runner_image = env::var("TOFU_RUNNER_IMAGE").ok().filter(|v| !v.is_empty());

        let workspace_root = env::var("WORKSPACE_ROOT")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_WORKSPACE_ROOT.to_string());

        let project_service_url = env::var("PROJECT_SERVICE_URL").ok().filter(|v| !v.is_empty());

        Self {
            port,
            runner_image,
            workspace_root,
            project_service_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
            runner_image: None,
            workspace_root: constants::DEFAULT_WORKSPACE_ROOT.to_string(),
            project_service_url: None,
        }
    }
}
