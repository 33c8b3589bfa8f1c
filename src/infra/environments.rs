//! 执行环境发现
//!
//! 按镜像标签列出候选执行环境。选择策略（取第一个）在编排层，
//! 不在 runner 内，替换策略无需改动 runner

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// 执行环境定位器
///
/// 注入式依赖：返回有序候选列表，调用方决定选择策略
#[async_trait]
pub trait EnvironmentLocator: Send + Sync {
    /// 列出运行指定镜像的执行环境 id，按发现顺序排列
    async fn candidates(&self, image_label: &str) -> ApiResult<Vec<String>>;
}

/// 基于 docker 的定位器
///
/// `docker ps --filter ancestor=<image>` 按启动时间倒序给出容器 id
pub struct DockerEnvironmentLocator;

#[async_trait]
impl EnvironmentLocator for DockerEnvironmentLocator {
    async fn candidates(&self, image_label: &str) -> ApiResult<Vec<String>> {
        let output = Command::new("docker")
            .arg("ps")
            .arg("--filter")
            .arg(format!("ancestor={}", image_label))
            .arg("--format")
            .arg("{{.ID}}")
            .output()
            .await
            .map_err(|e| ApiError::spawn(format!("Failed to run docker ps: {}", e)))?;

        if !output.status.success() {
            return Err(ApiError::configuration(format!(
                "docker ps failed with exit code {:?}",
                output.status.code()
            )));
        }

        let ids: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(image = %image_label, count = ids.len(), "Located execution environments");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试用的固定候选列表定位器
    pub struct StaticLocator(pub Vec<String>);

    #[async_trait]
    impl EnvironmentLocator for StaticLocator {
        async fn candidates(&self, _image_label: &str) -> ApiResult<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_static_locator_preserves_order() {
        let locator = StaticLocator(vec!["env-a".to_string(), "env-b".to_string()]);
        let ids = locator.candidates("tofu-runner").await.unwrap();
        assert_eq!(ids.first().map(String::as_str), Some("env-a"));
    }
}
