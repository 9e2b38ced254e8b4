//! 固定节拍宿主循环
//!
//! 每次 [`FireworkHost::poll`] 推进一个 tick 并提交快照。模拟或提交失败只会被
//! 记录，不会中断后续 tick，也不会修改活动链表。

use glam::Vec3;
use std::sync::Arc;

use super::sink::RenderSink;
use crate::config::EngineConfig;
use crate::core::error::{DefinitionError, EngineError, EngineResult};
use crate::core::error_aggregator::ErrorAggregator;
use crate::particles::{DefinitionLibrary, ParticleDefinition, ParticleKey, ParticleSystem, TickStats};

/// 一次轮询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// tick 序号，从 1 开始
    pub tick: u64,
    /// 模拟失败时为 `None`
    pub stats: Option<TickStats>,
    /// 快照中的粒子数
    pub particles: usize,
    /// 快照是否被输出端接受
    pub submitted: bool,
}

/// 烟花宿主
pub struct FireworkHost {
    config: EngineConfig,
    system: ParticleSystem,
    library: DefinitionLibrary,
    errors: ErrorAggregator,
    tick: u64,
}

impl FireworkHost {
    /// 验证配置并创建宿主
    pub fn new(config: EngineConfig, library: DefinitionLibrary) -> EngineResult<Self> {
        config.validate()?;
        let system = ParticleSystem::new(&config.simulation);
        tracing::info!(
            target: "engine",
            "Firework host ready: {} definitions, tick {}s",
            library.len(),
            config.simulation.tick_duration
        );
        Ok(Self {
            config,
            system,
            library,
            errors: ErrorAggregator::new(),
            tick: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut ParticleSystem {
        &mut self.system
    }

    pub fn library(&self) -> &DefinitionLibrary {
        &self.library
    }

    pub fn errors(&self) -> &ErrorAggregator {
        &self.errors
    }

    /// 已执行的 tick 数
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// 按名称发射烟花
    pub fn launch(&mut self, name: &str, position: Vec3) -> Result<Option<ParticleKey>, DefinitionError> {
        let definition = self
            .library
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::UnknownReference {
                name: name.to_string(),
                referenced_by: "launch".to_string(),
            })?;
        Ok(self.launch_definition(&definition, position))
    }

    /// 发射任意已解析的定义
    pub fn launch_definition(
        &mut self,
        definition: &Arc<ParticleDefinition>,
        position: Vec3,
    ) -> Option<ParticleKey> {
        self.system.spawn(definition, position)
    }

    /// 推进一个 tick 并提交快照
    pub fn poll<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> TickReport {
        self.tick += 1;
        let delta = self.config.simulation.tick_duration;

        let stats = match self.system.simulate(delta) {
            Ok(stats) => Some(stats),
            Err(e) => {
                self.record(EngineError::from(e), "simulate");
                None
            }
        };

        let frame = self.system.snapshot();
        let submitted = match sink.submit(&frame) {
            Ok(()) => true,
            Err(e) => {
                self.record(EngineError::from(e), "render_sink");
                false
            }
        };

        TickReport {
            tick: self.tick,
            stats,
            particles: frame.len(),
            submitted,
        }
    }

    /// 连续轮询覆盖 `seconds` 秒，返回最后一次的报告
    pub fn run_for<S: RenderSink + ?Sized>(&mut self, seconds: f32, sink: &mut S) -> Option<TickReport> {
        let ticks = (seconds / self.config.simulation.tick_duration).ceil();
        if !ticks.is_finite() || ticks <= 0.0 {
            return None;
        }
        let mut last = None;
        for _ in 0..ticks as u64 {
            last = Some(self.poll(sink));
        }
        last
    }

    fn record(&mut self, error: EngineError, source: &str) {
        tracing::error!(target: "engine", "Tick {} failed in {}: {}", self.tick, source, error);
        self.errors.record_error(&error, source, self.tick);
    }
}
