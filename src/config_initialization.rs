//! Configuration initialization and hierarchy management

use tracing::info;

use crate::adapters::{EngineConfig, TomlConfigAdapter};
use crate::cli::Cli;
use crate::error::ReelTrimResult;
use crate::ports::LogLevel;

/// Build the effective configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> ReelTrimResult<EngineConfig> {
    initialize_with_env(cli, |key| std::env::var(key).ok())
}

/// Same as [`initialize_configuration_hierarchy`] with an injected environment
pub fn initialize_with_env<F>(cli: &Cli, lookup: F) -> ReelTrimResult<EngineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = TomlConfigAdapter::new(cli.config.clone()).load_with_env(lookup)?;
    let overrides = apply_cli_configuration_overrides(&mut config, cli)?;
    if overrides > 0 {
        config.validate()?;
        info!(count = overrides, "applied command-line overrides");
    }
    Ok(config)
}

fn apply_cli_configuration_overrides(config: &mut EngineConfig, cli: &Cli) -> ReelTrimResult<usize> {
    let mut applied = 0;

    if let Some(level) = cli.log_level.as_deref() {
        config.logging.level = LogLevel::parse(level)?;
        applied += 1;
    }
    if cli.json_logs {
        config.logging.json = true;
        applied += 1;
    }
    if let Some(min_gap) = cli.min_gap {
        config.playback.min_gap = min_gap;
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("reeltrim").chain(args.iter().copied()))
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[playback]\nmin_gap = 2.0\n[logging]\nlevel = \"warn\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let from_file = initialize_with_env(&cli(&["--config", &path, "config"]), |_| None).unwrap();
        assert_eq!(from_file.playback.min_gap, 2.0);
        assert_eq!(from_file.logging.level, LogLevel::Warn);

        let env = |key: &str| (key == "REELTRIM_MIN_GAP").then(|| "3.0".to_string());
        let from_env = initialize_with_env(&cli(&["--config", &path, "config"]), env).unwrap();
        assert_eq!(from_env.playback.min_gap, 3.0);

        let from_cli = initialize_with_env(
            &cli(&["--config", &path, "--min-gap", "4", "--log-level", "debug", "config"]),
            env,
        )
        .unwrap();
        assert_eq!(from_cli.playback.min_gap, 4.0);
        assert_eq!(from_cli.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_cli_override_rejected() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let result = initialize_with_env(&cli(&["--config", &path, "--min-gap", "0", "config"]), |_| None);
        assert!(result.is_err());
    }
}
