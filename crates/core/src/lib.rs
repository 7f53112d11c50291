//! Toolbridge Core - 核心数据模型
//!
//! 包含：
//! - Definition: tool / resource / prompt 定义
//! - Connector: 远端能力服务的会话接口
//! - Filter: allow/deny 过滤引擎
//! - Config: YAML 配置与环境变量
//! - Error: 错误分类

mod config;
mod connector;
mod content;
mod definition;
mod error;
mod filter;

pub use config::*;
pub use connector::*;
pub use content::*;
pub use definition::*;
pub use error::*;
pub use filter::*;
