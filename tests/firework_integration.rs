use anyhow::Result;
use firework_engine::config::{EngineConfig, SimulationConfig};
use firework_engine::engine::{FireworkHost, FrameRecorder};
use firework_engine::particles::{
    DefinitionLibrary, DefinitionSet, Particle, ParticleChain, ParticleSystem, TickOutcome,
};
use glam::Vec3;
use std::path::PathBuf;

fn seeded(seed: u64) -> SimulationConfig {
    SimulationConfig {
        seed: Some(seed),
        ..SimulationConfig::default()
    }
}

fn library(toml: &str) -> Result<DefinitionLibrary> {
    Ok(DefinitionSet::from_toml_str(toml)?.resolve()?)
}

#[test]
fn test_rising_particle_lifecycle() -> Result<()> {
    let library = library(
        r#"
[shell]
color = [255, 255, 255]
velocity = [0, 0, 100]
lifespan = 2
gravity = 1
"#,
    )?;
    let shell = library.get("shell").unwrap();

    let mut system = ParticleSystem::new(&seeded(1));
    let mut particle = Particle::from_definition(&mut system, shell, Vec3::ZERO, None);
    assert_eq!(particle.simulate(1.0), TickOutcome::Alive);
    assert_eq!(particle.age, 1.0);
    assert_eq!(particle.simulate(1.0), TickOutcome::Died { first_death: true });
    let expected = 100.0 + system.default_gravity() * 2.0;
    assert!((particle.velocity.z - expected).abs() < 1e-4);

    // 同样的定义放进系统中
    system.spawn(shell, Vec3::ZERO);
    assert_eq!(system.simulate(1.0)?.died, 0);
    assert_eq!(system.len(), 1);
    assert_eq!(system.simulate(1.0)?.died, 1);
    assert!(system.is_empty());
    Ok(())
}

#[test]
fn test_hsv_red() -> Result<()> {
    let library = library(
        r#"
[red]
color = [0, 1, 1]
hsv = true
lifespan = 1
"#,
    )?;
    let mut system = ParticleSystem::new(&seeded(2));
    system.spawn(library.get("red").unwrap(), Vec3::ZERO);
    let particle = system.iter().next().unwrap();
    assert_eq!(particle.color, [255, 0, 0]);
    assert_eq!(particle.to_renderable().color, [255, 0, 0, 255]);
    Ok(())
}

#[test]
fn test_children_spawn_at_death_location() -> Result<()> {
    let library = library(
        r#"
[parent]
color = [255, 255, 255]
velocity = [3, -4, 12]
lifespan = 1
gravity = 0
children = [{ def = "spark", count = 3 }]

[spark]
color = [255, 200, 0]
lifespan = 5
"#,
    )?;
    let mut system = ParticleSystem::new(&seeded(3));
    system.spawn(library.get("parent").unwrap(), Vec3::new(10.0, 10.0, 0.0));

    let stats = system.simulate(1.0)?;
    assert_eq!(stats.died, 1);
    assert_eq!(stats.spawned, 3);
    assert_eq!(system.len(), 3);
    for spark in system.iter() {
        assert_eq!(spark.position, Vec3::new(13.0, 6.0, 12.0));
        assert_eq!(spark.color, [255, 200, 0]);
        assert_eq!(spark.age, 0.0);
    }

    let stats = system.simulate(1.0)?;
    assert_eq!(stats.updated, 3);
    Ok(())
}

#[test]
fn test_cascade_is_one_generation_per_tick() -> Result<()> {
    // 每一代寿命都极短，若同 tick 内重新访问子粒子会一路级联到底
    let library = library(
        r#"
[g0]
color = [255, 255, 255]
lifespan = 0.01
children = [{ def = "g1", count = 2 }]

[g1]
color = [255, 255, 255]
lifespan = 0.01
children = [{ def = "g2", count = 2 }]

[g2]
color = [255, 255, 255]
lifespan = 0.01
"#,
    )?;
    let mut system = ParticleSystem::new(&seeded(4));
    system.spawn(library.get("g0").unwrap(), Vec3::ZERO);

    assert_eq!(system.simulate(1.0)?.spawned, 2);
    assert_eq!(system.len(), 2);
    assert_eq!(system.simulate(1.0)?.spawned, 4);
    assert_eq!(system.len(), 4);
    assert_eq!(system.simulate(1.0)?.spawned, 0);
    assert!(system.is_empty());
    Ok(())
}

#[test]
fn test_externally_built_chain() -> Result<()> {
    let mut system = ParticleSystem::new(&seeded(5));
    let chain: ParticleChain = (0..4)
        .map(|i| Particle::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::ZERO, 0.0))
        .collect();
    assert_eq!(system.add_particle(chain), 4);
    let xs: Vec<f32> = system.iter().map(|p| p.position.x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn test_bundled_definitions_run() -> Result<()> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fireworks.toml");
    let library = DefinitionLibrary::load(path)?;
    assert!(library.contains("peony"));

    let mut config = EngineConfig::default();
    config.simulation.seed = Some(11);
    let mut host = FireworkHost::new(config, library)?;
    for name in ["peony", "willow", "crossette"] {
        host.launch(name, Vec3::ZERO)?;
    }

    let mut sink = FrameRecorder::default();
    let mut peak = 0;
    for _ in 0..200 {
        let report = host.poll(&mut sink);
        assert!(report.submitted);
        peak = peak.max(report.particles);
    }
    assert!(peak > 100, "peak was {}", peak);
    assert_eq!(host.errors().total(), 0);
    assert!(host.system().is_empty());
    Ok(())
}
