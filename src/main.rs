use twirl::{AppConfig, LoggingConfig};

fn main() -> anyhow::Result<()> {
    twirl::init_logging(LoggingConfig::default());

    let config = AppConfig::from_env()?;
    if let Some(dir) = &config.shader_dir {
        log::info!("shader directory: {}", dir.display());
    }

    twirl::run(config)
}
