//! 错误聚合和报告模块
//!
//! 宿主循环中被记录并跳过的 tick 错误在这里统计，
//! 便于事后查看哪一类错误在哪个 tick 发生。

use crate::core::error::EngineError;
use crate::impl_default_and_new;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// 错误统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    /// 错误总数
    pub total_count: u64,
    /// 按错误类型分组的计数
    pub by_type: HashMap<String, u64>,
    /// 按错误来源分组的计数
    pub by_source: HashMap<String, u64>,
    /// 最近发生的错误（最多保留N条）
    pub recent_errors: VecDeque<ErrorRecord>,
}

impl ErrorStats {
    /// 获取最常见的错误类型
    pub fn most_common_error_type(&self) -> Option<(&String, &u64)> {
        self.by_type.iter().max_by_key(|(_, count)| *count)
    }

    /// 获取最常见的错误来源
    pub fn most_common_error_source(&self) -> Option<(&String, &u64)> {
        self.by_source.iter().max_by_key(|(_, count)| *count)
    }

    /// 最近 `ticks` 个 tick 内（含 `current_tick`）的错误数
    pub fn errors_since(&self, current_tick: u64, ticks: u64) -> usize {
        let cutoff = current_tick.saturating_sub(ticks);
        self.recent_errors
            .iter()
            .filter(|record| record.tick >= cutoff)
            .count()
    }
}

/// 错误记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// 错误类型
    pub error_type: String,
    /// 错误来源（模块名）
    pub source: String,
    /// 错误消息
    pub message: String,
    /// 发生时的 tick 序号
    pub tick: u64,
}

/// 错误聚合器
pub struct ErrorAggregator {
    stats: ErrorStats,
    /// 最大保留的错误记录数
    max_recent_errors: usize,
}

impl_default_and_new!(ErrorAggregator {
    stats: ErrorStats::default(),
    max_recent_errors: 256,
});

impl ErrorAggregator {
    /// 创建带配置的错误聚合器
    pub fn with_capacity(max_recent_errors: usize) -> Self {
        Self {
            stats: ErrorStats::default(),
            max_recent_errors,
        }
    }

    /// 记录错误
    pub fn record_error(&mut self, error: &EngineError, source: impl Into<String>, tick: u64) {
        let record = ErrorRecord {
            error_type: error_type_name(error).to_string(),
            source: source.into(),
            message: error.to_string(),
            tick,
        };

        let stats = &mut self.stats;
        stats.total_count += 1;
        *stats.by_type.entry(record.error_type.clone()).or_insert(0) += 1;
        *stats.by_source.entry(record.source.clone()).or_insert(0) += 1;

        stats.recent_errors.push_back(record);
        while stats.recent_errors.len() > self.max_recent_errors {
            stats.recent_errors.pop_front();
        }
    }

    /// 获取错误统计
    pub fn stats(&self) -> &ErrorStats {
        &self.stats
    }

    pub fn total(&self) -> u64 {
        self.stats.total_count
    }

    /// 获取错误摘要
    pub fn summary(&self) -> ErrorSummary {
        ErrorSummary {
            total_errors: self.stats.total_count,
            most_common_type: self
                .stats
                .most_common_error_type()
                .map(|(t, c)| (t.clone(), *c)),
            most_common_source: self
                .stats
                .most_common_error_source()
                .map(|(s, c)| (s.clone(), *c)),
            recent_error_count: self.stats.recent_errors.len(),
        }
    }

    /// 清除所有统计
    pub fn clear(&mut self) {
        self.stats = ErrorStats::default();
    }

    /// 导出错误报告（JSON格式）
    pub fn export_report(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.stats)
    }
}

/// 获取错误类型名称
fn error_type_name(error: &EngineError) -> &'static str {
    match error {
        EngineError::Definition(_) => "Definition",
        EngineError::Simulation(_) => "Simulation",
        EngineError::Sink(_) => "Sink",
        EngineError::Config(_) => "Config",
        EngineError::Io(_) => "Io",
    }
}

/// 错误摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// 错误总数
    pub total_errors: u64,
    /// 最常见的错误类型
    pub most_common_type: Option<(String, u64)>,
    /// 最常见的错误来源
    pub most_common_source: Option<(String, u64)>,
    /// 最近错误数量
    pub recent_error_count: usize,
}

impl ErrorSummary {
    /// 格式化错误摘要为字符串
    pub fn format(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("总错误数: {}", self.total_errors));

        if let Some((ref error_type, count)) = self.most_common_type {
            lines.push(format!("最常见错误类型: {} ({}次)", error_type, count));
        }

        if let Some((ref source, count)) = self.most_common_source {
            lines.push(format!("最常见错误来源: {} ({}次)", source, count));
        }

        lines.push(format!("最近错误数: {}", self.recent_error_count));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{SimulationError, SinkError};

    #[test]
    fn test_error_aggregator() {
        let mut aggregator = ErrorAggregator::new();

        let sink_err = EngineError::Sink(SinkError::Unavailable("offline".to_string()));
        aggregator.record_error(&sink_err, "render_sink", 3);

        let sim_err = EngineError::Simulation(SimulationError::InvalidDelta(-1.0));
        aggregator.record_error(&sim_err, "simulate", 4);

        let stats = aggregator.stats();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.by_type.get("Sink"), Some(&1));
        assert_eq!(stats.by_type.get("Simulation"), Some(&1));
        assert_eq!(stats.by_source.get("render_sink"), Some(&1));
        assert_eq!(stats.errors_since(4, 0), 1);
        assert_eq!(stats.errors_since(4, 10), 2);
    }

    #[test]
    fn test_recent_errors_bounded() {
        let mut aggregator = ErrorAggregator::with_capacity(2);
        let err = EngineError::Sink(SinkError::Rejected("full".to_string()));
        for tick in 0..5 {
            aggregator.record_error(&err, "render_sink", tick);
        }
        assert_eq!(aggregator.total(), 5);
        let ticks: Vec<u64> = aggregator.stats().recent_errors.iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![3, 4]);
    }

    #[test]
    fn test_error_summary_and_export() {
        let mut aggregator = ErrorAggregator::new();
        let err = EngineError::Sink(SinkError::Rejected("full".to_string()));
        aggregator.record_error(&err, "render_sink", 1);

        let summary = aggregator.summary();
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.most_common_type, Some(("Sink".to_string(), 1)));
        assert!(summary.format().contains("render_sink"));

        let report = aggregator.export_report().unwrap();
        assert!(report.contains("Frame rejected: full"));

        aggregator.clear();
        assert_eq!(aggregator.total(), 0);
    }
}
