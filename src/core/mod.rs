//! 核心模块
//!
//! 包含引擎的核心功能：
//! - `error` - 错误类型定义
//! - `error_aggregator` - 宿主循环中被跳过的错误统计
//! - `macros` - 通用宏

pub mod error;
pub mod error_aggregator;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    DefinitionError, DefinitionResult, EngineError, EngineResult, SimulationError,
    SimulationResult, SinkError, SinkResult,
};

// 重新导出错误聚合器
pub use error_aggregator::{ErrorAggregator, ErrorRecord, ErrorStats, ErrorSummary};
