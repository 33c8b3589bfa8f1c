//! 项目目录 HTTP Client
//!
//! 封装对项目/空间目录服务的查询，复用连接池。
//! 未配置基础 URL 时降级为直接使用 id 作为名称（本地开发场景）

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// 工作区归属信息
#[derive(Clone, Debug)]
pub struct WorkspaceNames {
    pub project_name: String,
    pub space_name: String,
}

/// 项目目录服务的查询响应
#[derive(Debug, Deserialize)]
struct ProjectLookup {
    #[serde(rename = "projectName")]
    project_name: String,
}

#[derive(Debug, Deserialize)]
struct SpaceLookup {
    #[serde(rename = "spaceName")]
    space_name: String,
}

/// 项目目录客户端
#[derive(Clone)]
pub struct ProjectDirectoryClient {
    client: Client,
    base_url: Option<String>,
}

impl ProjectDirectoryClient {
    /// 创建客户端
    pub fn new(base_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, base_url }
    }

    /// 解析 (project_id, space_id) 对应的名称
    ///
    /// 未知项目返回 NotFound
    pub async fn resolve(&self, project_id: &str, space_id: &str) -> ApiResult<WorkspaceNames> {
        let Some(ref base_url) = self.base_url else {
            debug!(
                project_id = %project_id,
                space_id = %space_id,
                "No project service configured, using ids as workspace names"
            );
            return Ok(WorkspaceNames {
                project_name: project_id.to_string(),
                space_name: space_id.to_string(),
            });
        };

        let project: ProjectLookup = self
            .fetch(&format!("{}/projects/{}", base_url, project_id), "Project", project_id)
            .await?;
        let space: SpaceLookup = self
            .fetch(&format!("{}/spaces/{}", base_url, space_id), "Space", space_id)
            .await?;

        Ok(WorkspaceNames {
            project_name: project.project_name,
            space_name: space.space_name,
        })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
        id: &str,
    ) -> ApiResult<T> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Project directory request failed");
            ApiError::internal(format!("Project directory unreachable: {}", e))
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(format!("{} '{}'", resource, id)));
        }
        if !response.status().is_success() {
            return Err(ApiError::internal(format!(
                "Project directory returned {} for {} '{}'",
                response.status(),
                resource,
                id
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ApiError::internal(format!("Invalid project directory response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_without_base_url_uses_ids() {
        let client = ProjectDirectoryClient::new(None);
        let names = client.resolve("proj-1", "space-1").await.unwrap();
        assert_eq!(names.project_name, "proj-1");
        assert_eq!(names.space_name, "space-1");
    }
}
