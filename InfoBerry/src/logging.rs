use ibconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Convertit un niveau textuel ("info", "DEBUG", ...) en `LevelFilter`
pub fn string_to_levelfilter(level: &str) -> Option<LevelFilter> {
    match level.trim().to_uppercase().as_str() {
        "OFF" => Some(LevelFilter::OFF),
        other => other.parse::<Level>().ok().map(LevelFilter::from_level),
    }
}

/// Initialise le subscriber `tracing` global.
///
/// Le niveau vient de la ligne de commande, sinon de `host.logger.min_level`.
/// `RUST_LOG` peut affiner le filtrage par module.
pub fn init_logging(cli_level: Option<&str>, config: &Config) {
    let level = cli_level
        .map(str::to_string)
        .unwrap_or_else(|| config.get_log_min_level());
    let level_filter = string_to_levelfilter(&level).unwrap_or_else(|| {
        eprintln!("Unknown log level '{}', using INFO", level);
        LevelFilter::INFO
    });

    let filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let console = config.get_log_enable_console().unwrap_or(true).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    Registry::default().with(filter).with(console).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_levelfilter() {
        assert_eq!(string_to_levelfilter("info"), Some(LevelFilter::INFO));
        assert_eq!(string_to_levelfilter(" DEBUG "), Some(LevelFilter::DEBUG));
        assert_eq!(string_to_levelfilter("off"), Some(LevelFilter::OFF));
        assert_eq!(string_to_levelfilter("loud"), None);
    }
}
