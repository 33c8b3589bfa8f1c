//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod deployment;
pub mod summary;

// Re-exports for convenience
pub use deployment::{Deployment, ExecutionResult, Step, StepKind, StepStatus};
pub use summary::{ChangeAction, PlanBreakdown, ResourceChange, Summary};
