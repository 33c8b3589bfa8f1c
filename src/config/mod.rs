//! 配置模块
//!
//! 环境变量解析与常量

pub mod env;

pub use env::EnvConfig;
