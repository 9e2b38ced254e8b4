//! 统一错误处理模块
//!
//! 提供引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **定义错误** (`DefinitionError`): 加载、解析和引用解析阶段的致命错误
//! - **模拟错误** (`SimulationError`): 单个 tick 的输入错误，发生在修改活动链表之前
//! - **输出错误** (`SinkError`): 外部渲染/发布边界返回的错误
//!
//! `EngineError` 可以同时承载以上所有错误以及配置错误。

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Render sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 粒子定义错误
///
/// 所有变体都会中止整个定义文件的加载，不会静默跳过。
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to read definition file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Definition parse error: {0}")]
    Parse(String),

    #[error("Unsupported definition format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid reference: '{name}' (referenced by '{referenced_by}')")]
    UnknownReference { name: String, referenced_by: String },

    #[error("Invalid reference: cyclic definition chain {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("Invalid reference: a child rule of '{definition}' lists no definitions")]
    EmptyAlternatives { definition: String },

    #[error("Invalid value for '{field}' in '{definition}': {reason}")]
    InvalidValue {
        definition: String,
        field: &'static str,
        reason: String,
    },
}

/// 模拟错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid tick delta: {0} (must be finite and non-negative)")]
    InvalidDelta(f32),
}

/// 渲染输出错误
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    #[error("Frame rejected: {0}")]
    Rejected(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// 引擎结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;
pub type DefinitionResult<T> = Result<T, DefinitionError>;
pub type SimulationResult<T> = Result<T, SimulationError>;
pub type SinkResult<T> = Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let def_err = DefinitionError::UnknownReference {
            name: "spark".to_string(),
            referenced_by: "rocket".to_string(),
        };
        let engine_err: EngineError = def_err.into();
        assert!(matches!(engine_err, EngineError::Definition(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DefinitionError::CyclicReference {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid reference: cyclic definition chain a -> b -> a"
        );

        let err = SimulationError::InvalidDelta(-1.0);
        assert_eq!(
            err.to_string(),
            "Invalid tick delta: -1 (must be finite and non-negative)"
        );
    }
}
