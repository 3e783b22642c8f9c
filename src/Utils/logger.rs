use log::info;
use simplelog::*;

use crate::symbolic::errors::CalcError;

/// Maps a loglevel name to a filter; `off` and `none` disable logging.
pub fn level_filter(loglevel: &str) -> Result<LevelFilter, CalcError> {
    match loglevel.to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(CalcError::Config(format!(
            "loglevel must be debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// Installs a terminal logger for the whole process. `None` means the default level (info).
/// Returns `Ok(false)` when logging is switched off or a logger is already installed.
pub fn init_logger(loglevel: Option<&str>) -> Result<bool, CalcError> {
    let log_option = match loglevel {
        Some(level) => level_filter(level)?,
        None => LevelFilter::Info,
    };
    if log_option == LevelFilter::Off {
        return Ok(false);
    }
    let logger_instance = CombinedLogger::init(vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    match logger_instance {
        Ok(()) => {
            info!("logging started with loglevel: {}", log_option);
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_filter("debug"), Ok(LevelFilter::Debug));
        assert_eq!(level_filter("WARN"), Ok(LevelFilter::Warn));
        assert_eq!(level_filter("none"), Ok(LevelFilter::Off));
        assert!(matches!(level_filter("verbose"), Err(CalcError::Config(_))));
    }

    #[test]
    fn test_disabled_logger_is_not_installed() {
        assert_eq!(init_logger(Some("off")), Ok(false));
        assert!(init_logger(Some("loud")).is_err());
    }
}
