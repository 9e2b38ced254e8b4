//! 粒子实体
//!
//! 单个粒子的可变模拟状态，以及从定义实例化粒子的流程。

use glam::{IVec3, Vec3};
use std::fmt;
use std::sync::Arc;

use super::color::{sample_color, Rgb};
use super::definition::ParticleDefinition;
use super::range::{random_unit_vector, sample_range, sample_vector, Range};
use super::system::{ParticleKey, ParticleSystem};

/// 单次预模拟的最大积分步数
pub const MAX_PRE_SIMULATE_STEPS: u32 = 100_000;

/// 每次存活更新时调用的回调：`(粒子, delta, progress)`
pub type UpdateHook = Box<dyn FnMut(&mut Particle, f32, f32)>;

/// 死亡时的子粒子生成计划
///
/// 保存定义句柄和每条子规则在实例化时确定的数量，
/// 由 [`ParticleSystem`] 在粒子死亡时统一解释执行。
#[derive(Debug, Clone, PartialEq)]
pub struct DeathPlan {
    pub definition: Arc<ParticleDefinition>,
    /// 与 `definition.children` 一一对应
    pub counts: Vec<u32>,
}

impl DeathPlan {
    /// 计划会生成的子粒子总数
    pub fn total(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }
}

/// 单次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Alive,
    /// 寿命耗尽；`first_death` 只在第一次触发时为真
    Died { first_death: bool },
}

impl TickOutcome {
    pub fn is_alive(self) -> bool {
        matches!(self, TickOutcome::Alive)
    }
}

/// 可渲染的粒子快照
///
/// 位置四舍五入为整数坐标，尺寸为立方体边长，颜色为不透明 RGBA。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Renderable {
    pub position: IVec3,
    pub size: u32,
    pub color: [u8; 4],
}

/// 粒子
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub color: Rgb,
    /// 已存活时间（秒）
    pub age: f32,
    /// 寿命（秒），0 表示永生
    pub lifespan: f32,
    /// 带符号的竖直加速度，每 tick 累加到 `velocity.z`
    pub gravity: f32,
    death_triggered: bool,
    death_plan: Option<DeathPlan>,
    on_update: Option<UpdateHook>,
    pub(crate) prev: Option<ParticleKey>,
    pub(crate) next: Option<ParticleKey>,
}

impl Particle {
    /// 创建白色、尺寸为 1、无重力的粒子
    pub fn new(position: Vec3, velocity: Vec3, lifespan: f32) -> Self {
        Self {
            position,
            velocity,
            size: 1.0,
            color: [255, 255, 255],
            age: 0.0,
            lifespan,
            gravity: 0.0,
            death_triggered: false,
            death_plan: None,
            on_update: None,
            prev: None,
            next: None,
        }
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_death_plan(mut self, plan: DeathPlan) -> Self {
        self.death_plan = Some(plan);
        self
    }

    /// 从定义实例化粒子
    ///
    /// 依次确定颜色、速度、寿命、重力、尺寸，叠加父粒子速度，
    /// 预模拟，最后在有非零子规则数量时绑定死亡计划。
    /// `system` 提供随机数、全局重力和 tick 时长。
    pub fn from_definition(
        system: &mut ParticleSystem,
        definition: &Arc<ParticleDefinition>,
        position: Vec3,
        parent: Option<&Particle>,
    ) -> Self {
        let default_gravity = system.default_gravity();
        let tick_duration = system.tick_duration();
        let rng = system.rng_mut();

        let color = sample_color(rng, &definition.color, definition.hsv);

        let mut velocity = definition
            .velocity
            .as_ref()
            .map_or(Vec3::ZERO, |range| sample_vector(rng, range));
        if definition.random_velocity {
            // 逐分量缩放，不是旋转
            velocity *= random_unit_vector(rng);
        }

        let lifespan = sample_range(rng, &definition.lifespan, false);

        let gravity = match &definition.gravity {
            Some(factor) => default_gravity * sample_range(rng, factor, false),
            None => default_gravity,
        };

        let size = definition
            .size
            .as_ref()
            .map_or(1.0, |range| sample_range(rng, range, true));

        if definition.inherit_velocity {
            if let Some(parent) = parent {
                velocity += parent.velocity;
            }
        }

        let mut particle = Particle::new(position, velocity, lifespan)
            .with_gravity(gravity)
            .with_color(color)
            .with_size(size);

        if let Some(seconds) = definition.pre_simulate {
            particle.pre_simulate(seconds, tick_duration);
        }

        let counts: Vec<u32> = definition
            .children
            .iter()
            .map(|rule| resolve_count(rng, rule.count.as_ref()))
            .collect();
        if counts.iter().any(|&c| c > 0) {
            particle.death_plan = Some(DeathPlan {
                definition: Arc::clone(definition),
                counts,
            });
        }

        particle
    }

    /// 只推进位置和速度
    pub fn simulate_spatial(&mut self, delta: f32) {
        self.position += self.velocity * delta;
        self.velocity.z += self.gravity * delta;
    }

    /// 以 `step` 为步长预模拟 `duration` 秒，最后一步截断到剩余时长
    ///
    /// 步数不超过 [`MAX_PRE_SIMULATE_STEPS`]，步长过小时按上限均分。
    pub fn pre_simulate(&mut self, duration: f32, step: f32) {
        if !duration.is_finite() || duration <= 0.0 {
            return;
        }
        if !step.is_finite() || step <= 0.0 {
            self.simulate_spatial(duration);
            return;
        }
        let step = step.max(duration / MAX_PRE_SIMULATE_STEPS as f32);
        let steps = ((duration / step).ceil() as u32).clamp(1, MAX_PRE_SIMULATE_STEPS);
        for _ in 1..steps {
            self.simulate_spatial(step);
        }
        let last = duration - step * (steps - 1) as f32;
        self.simulate_spatial(last.max(0.0));
    }

    /// 推进一个 tick
    ///
    /// 寿命为 0 的粒子永不因寿命死亡。死亡标记只设置一次，
    /// 之后的调用仍返回 `Died`，但 `first_death` 为假。
    pub fn simulate(&mut self, delta: f32) -> TickOutcome {
        self.simulate_spatial(delta);
        self.age += delta;

        if self.lifespan != 0.0 && self.age >= self.lifespan {
            let first_death = !self.death_triggered;
            self.death_triggered = true;
            return TickOutcome::Died { first_death };
        }

        if let Some(mut hook) = self.on_update.take() {
            let progress = self.progress();
            hook(self, delta, progress);
            // 回调内可能替换了自身
            if self.on_update.is_none() {
                self.on_update = Some(hook);
            }
        }

        TickOutcome::Alive
    }

    /// `age / lifespan`；永生粒子为 0
    pub fn progress(&self) -> f32 {
        if self.lifespan == 0.0 {
            0.0
        } else {
            self.age / self.lifespan
        }
    }

    pub fn is_immortal(&self) -> bool {
        self.lifespan == 0.0
    }

    pub fn death_triggered(&self) -> bool {
        self.death_triggered
    }

    pub fn death_plan(&self) -> Option<&DeathPlan> {
        self.death_plan.as_ref()
    }

    /// 取出死亡计划，之后不会再次生成子粒子
    pub fn take_death_plan(&mut self) -> Option<DeathPlan> {
        self.death_plan.take()
    }

    pub fn set_on_update<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Particle, f32, f32) + 'static,
    {
        self.on_update = Some(Box::new(hook));
    }

    pub fn clear_on_update(&mut self) {
        self.on_update = None;
    }

    /// 转换为可渲染快照，纯读取
    pub fn to_renderable(&self) -> Renderable {
        let [r, g, b] = self.color;
        Renderable {
            position: self.position.round().as_ivec3(),
            size: self.size.round().max(0.0) as u32,
            color: [r, g, b, 255],
        }
    }
}

/// 子规则数量：采样一次后四舍五入（固定值同样取整），负数视为 0
fn resolve_count<R: rand::Rng + ?Sized>(rng: &mut R, count: Option<&Range>) -> u32 {
    match count {
        Some(range) => sample_range(rng, range, true).round().max(0.0) as u32,
        None => 1,
    }
}

impl fmt::Debug for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("size", &self.size)
            .field("color", &self.color)
            .field("age", &self.age)
            .field("lifespan", &self.lifespan)
            .field("gravity", &self.gravity)
            .field("death_triggered", &self.death_triggered)
            .field("death_plan", &self.death_plan)
            .field("has_on_update", &self.on_update.is_some())
            .finish()
    }
}
