//! Toolbridge Runtime - 转换与调用引擎
//!
//! 职责：
//! - Connector 生命周期 (single-flight 初始化)
//! - 定义过滤、批量转换与缓存
//! - 延迟初始化的工具调用
//! - 调用结果归一化
//!
//! 架构：
//! - ToolAdapter: 编排入口
//! - backend/: 转换目标 (function calling, namespaced)
//! - flight: single-flight 原语

mod adapter;
mod backend;
mod batch;
mod cache;
mod flight;
mod lazy;
mod lifecycle;
mod normalize;
mod tool;

pub use adapter::{ConnectorFailure, NameCollision, ToolAdapter, ToolCollection};
pub use backend::{
    Backend, Conversion, FunctionBackend, InvokeTarget, NamespacedBackend, NativeTool,
    PreparedCall, convert_definition, function_schema, function_schemas,
};
pub use batch::{BatchConverter, BatchOutcome, DEFAULT_CHUNK_SIZE};
pub use cache::{CacheEntry, CacheKey, ToolCache};
pub use flight::{FlightCell, FlightGroup};
pub use lifecycle::{ConnectorLifecycle, ConnectorState};
pub use normalize::{NormalizedResult, normalize, render_content};
pub use tool::ConvertedTool;

/// Install a fmt subscriber for hosts without their own.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt().with_target(false).try_init().is_ok()
}
