use firework_engine::config::EngineConfig;
use firework_engine::core::error::SinkResult;
use firework_engine::engine::{FireworkHost, RenderSink};
use firework_engine::particles::{DefinitionLibrary, Renderable};
use firework_engine::EngineResult;
use glam::Vec3;
use tracing_subscriber::EnvFilter;

const DEFAULT_DEFINITIONS: &str = "assets/fireworks.toml";
const DEFAULT_SECONDS: f32 = 6.0;

/// 按固定间隔把帧概要写入日志
struct LogSink {
    every: u64,
    frames: u64,
}

impl RenderSink for LogSink {
    fn submit(&mut self, frame: &[Renderable]) -> SinkResult<()> {
        self.frames += 1;
        if self.frames % self.every == 0 {
            let highest = frame.iter().map(|r| r.position.z).max();
            tracing::info!(
                target: "engine",
                "frame {}: {} particles, highest z {:?}",
                self.frames,
                frame.len(),
                highest
            );
        }
        Ok(())
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Firework engine failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> EngineResult<()> {
    let mut config = EngineConfig::load_or_default();
    config.apply_env_overrides();
    initialize_logging(&config);

    let mut args = std::env::args().skip(1);
    let definitions = args.next().unwrap_or_else(|| DEFAULT_DEFINITIONS.to_string());
    let name = args.next();
    let seconds = match args.next() {
        Some(arg) => parse_seconds(&arg),
        None => DEFAULT_SECONDS,
    };

    let library = DefinitionLibrary::load(&definitions)?;
    tracing::info!(target: "engine", "Loaded {:?} from {}", library.names(), definitions);

    let name = match name {
        Some(name) => name,
        None => match library.names().first() {
            Some(first) => first.to_string(),
            None => {
                tracing::warn!(target: "engine", "No definitions in {}", definitions);
                return Ok(());
            }
        },
    };

    let ticks_per_second = config.simulation.ticks_per_second().round().max(1.0) as u64;
    let mut host = FireworkHost::new(config, library)?;
    host.launch(&name, Vec3::ZERO)?;

    let mut sink = LogSink {
        every: ticks_per_second,
        frames: 0,
    };
    host.run_for(seconds, &mut sink);

    tracing::info!(
        target: "engine",
        "Finished after {} ticks, {} particles alive",
        host.tick(),
        host.system().len()
    );
    if host.errors().total() > 0 {
        tracing::warn!(target: "engine", "\n{}", host.errors().summary().format());
    }
    Ok(())
}

/// 解析运行时长参数，无法解析时回退到默认值
fn parse_seconds(arg: &str) -> f32 {
    match arg.parse::<f32>() {
        Ok(seconds) if seconds.is_finite() => seconds,
        _ => {
            tracing::warn!(
                target: "engine",
                "Invalid duration '{}', using {}s",
                arg,
                DEFAULT_SECONDS
            );
            DEFAULT_SECONDS
        }
    }
}

/// 初始化日志系统
///
/// 优先使用`RUST_LOG`环境变量，否则使用配置中的日志级别。
fn initialize_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    tracing::info!(target: "engine", "Firework engine starting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds_falls_back() {
        assert_eq!(parse_seconds("2.5"), 2.5);
        assert_eq!(parse_seconds("soon"), DEFAULT_SECONDS);
        assert_eq!(parse_seconds("inf"), DEFAULT_SECONDS);
    }
}
