//! 基础设施模块
//!
//! 封装外部依赖（命令执行、环境发现、目录服务）

pub mod command;
pub mod environments;
pub mod project_directory;

pub use command::TofuRunner;
pub use environments::{DockerEnvironmentLocator, EnvironmentLocator};
pub use project_directory::ProjectDirectoryClient;
