//! # Firework Engine
//!
//! Recursive firework particle simulation.
//!
//! ## Features
//!
//! - **Definitions**: TOML/JSON particle definitions with name references resolved
//!   into shared handles at load time (missing names and cycles are rejected)
//! - **Sampling**: scalar / interval ranges and per-axis or broadcast vector ranges,
//!   driven by an injected, seedable RNG
//! - **Simulation**: Euler integration with per-particle gravity, lifespans and
//!   on-death child spawning that forms particle trees
//! - **Active set**: a doubly linked list over a generational slot map, O(1) unlink
//!   while iterating, child chains spliced at the head so they join on the next tick
//! - **Host loop**: fixed-cadence polling that logs and records tick errors without
//!   stopping future ticks
//!
//! ### Example
//!
//! ```no_run
//! use firework_engine::config::EngineConfig;
//! use firework_engine::engine::{FireworkHost, NullSink};
//! use firework_engine::particles::DefinitionLibrary;
//! use glam::Vec3;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = DefinitionLibrary::load("assets/fireworks.toml")?;
//!     let mut host = FireworkHost::new(EngineConfig::default(), library)?;
//!     host.launch("peony", Vec3::ZERO)?;
//!     host.run_for(5.0, &mut NullSink);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Error types and tick error aggregation
//! - [`config`]: Simulation and logging configuration
//! - [`particles`]: Sampling, definitions, particles and the particle system
//! - [`engine`]: Host polling loop and render sink boundary

/// Error types, error aggregation and shared macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Particle simulation core
pub mod particles;
/// Host driver and render output boundary
pub mod engine;

pub use crate::config::{EngineConfig, SimulationConfig};
pub use crate::core::error::{EngineError, EngineResult};
pub use crate::engine::{FireworkHost, RenderSink, TickReport};
pub use crate::particles::{
    DefinitionLibrary, DefinitionSet, Particle, ParticleDefinition, ParticleSystem, Renderable,
};
