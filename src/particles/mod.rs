//! 烟花粒子模拟核心
//!
//! ## 架构设计
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Firework Particle Core                  │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Definition (load time)                               │
//! │     - 解析定义文件，按名称建表                             │
//! │     - 解析子定义引用，拒绝缺失名称和循环引用               │
//! │                                                          │
//! │  2. Instantiation                                        │
//! │     - 采样颜色、速度、寿命、重力、尺寸                     │
//! │     - 继承父粒子速度、预模拟                               │
//! │     - 固定每条子规则的数量，绑定死亡计划                   │
//! │                                                          │
//! │  3. Tick                                                 │
//! │     - 位置/速度积分，年龄累加                              │
//! │     - 死亡粒子摘链，子粒子链拼接到表头（下个 tick 可见）   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! let library = DefinitionLibrary::load("fireworks.toml")?;
//! let mut system = ParticleSystem::new(&SimulationConfig::default());
//! system.spawn(library.get("rocket").unwrap(), Vec3::ZERO);
//! loop {
//!     system.simulate(0.05)?;
//!     let frame = system.snapshot();
//! }
//! ```

pub mod color;
pub mod definition;
pub mod particle;
pub mod range;
pub mod system;

pub use color::{hsv_to_rgb, sample_color, Rgb};
pub use definition::{
    ChildRef, ChildRule, DefinitionLibrary, DefinitionSet, ParticleDefinition, RawChildRule,
    RawDefinition,
};
pub use particle::{DeathPlan, Particle, Renderable, TickOutcome, UpdateHook, MAX_PRE_SIMULATE_STEPS};
pub use range::{random_unit_vector, sample_range, sample_vector, Range, VectorRange};
pub use system::{Iter, ParticleChain, ParticleKey, ParticleSystem, TickStats};
