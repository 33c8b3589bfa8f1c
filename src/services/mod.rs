//! 服务模块
//!
//! 步骤编排、输出摘要提取与部署台账

pub mod ledger;
pub mod provision;
pub mod summary;

pub use ledger::{DeploymentLedger, IdentityAllocator, UuidIdentityAllocator};
