use crate::agent::telemetry::TELEMETRY_TARGET;
use crate::config::LogConfig;

/// Simplifies file paths by extracting relevant parts from cargo registry paths
///
/// # Arguments
/// * `file_path` - The file path to simplify
///
/// # Returns
/// A simplified version of the file path
fn simplify_file_path(file_path: &str) -> String {
    if file_path.contains("agent-bridge") || file_path.starts_with("src/") {
        if let Some(pos) = file_path.rfind("src/") {
            return file_path[pos..].to_string();
        }
    }

    if let Some((_, suffix)) = file_path.split_once(".cargo/registry/src/") {
        if let Some(first_slash) = suffix.find('/') {
            suffix[(first_slash + 1)..].to_string()
        } else {
            suffix.to_string()
        }
    } else {
        file_path.to_string()
    }
}

/// Records of this crate, including per-turn telemetry.
fn is_own_record(record: &log::Metadata) -> bool {
    record.target().starts_with("agent_bridge") || record.target() == TELEMETRY_TARGET
}

/// Formats log messages for console output with a simplified format
///
/// * Time only (HH:MM:SS.mmm), coloured by level
/// * Source file and line of the call site
pub fn console_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    let level = record.level();
    let level_color = match level {
        log::Level::Error => "\x1B[31m", // red
        log::Level::Warn => "\x1B[33m",  // yellow
        log::Level::Info => "\x1B[32m",  // green
        log::Level::Debug => "\x1B[0m",  // normal
        log::Level::Trace => "\x1B[35m", // purple
    };
    let reset = "\x1B[0m";

    out.finish(format_args!(
        "{}{}[{}] {}:{} {}{}",
        level_color,
        chrono::Local::now().format("%H:%M:%S.%3f "),
        get_level(level),
        simplify_file_path(record.file().unwrap_or("")),
        record.line().unwrap_or(0),
        message,
        reset,
    ))
}

/// Formats log messages for file output with the full date
pub fn file_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    out.finish(format_args!(
        "{}[{}] {}:{} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        get_level(record.level()),
        simplify_file_path(record.file().unwrap_or("")),
        record.line().unwrap_or(0),
        message
    ))
}

/// Sets up the process logger: console always, detailed file log when configured.
///
/// Dependency crates only get through at warning level and above.
pub fn setup_logger(config: &LogConfig) -> Result<(), fern::InitError> {
    let level = config.level;
    let stdout_dispatcher = fern::Dispatch::new()
        .level(level)
        .filter(move |metadata| is_own_record(metadata) || metadata.level() <= log::Level::Warn)
        .format(console_log_formatter)
        .chain(std::io::stdout());

    let mut dispatcher = fern::Dispatch::new().level(level).chain(stdout_dispatcher);

    if let Some(path) = &config.file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file_dispatcher = fern::Dispatch::new()
            .level(level.min(log::LevelFilter::Info))
            .filter(|metadata| is_own_record(metadata) || metadata.level() <= log::Level::Warn)
            .format(file_log_formatter)
            .chain(fern::log_file(path)?);
        dispatcher = dispatcher.chain(file_dispatcher);
    }

    dispatcher.apply()?;

    log::debug!(
        "Logger initialized, level: {}, log file: {:?}",
        level,
        config.file
    );
    Ok(())
}

fn get_level(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "E",
        log::Level::Warn => "W",
        log::Level::Info => "I",
        log::Level::Debug => "D",
        log::Level::Trace => "T",
    }
}

/// Console-only logger for tests; only the first call installs it.
#[cfg(test)]
pub fn setup_test_logger() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let result = fern::Dispatch::new()
            .format(console_log_formatter)
            .level(log::LevelFilter::Debug)
            .filter(|metadata| is_own_record(metadata) || metadata.level() <= log::Level::Warn)
            .chain(std::io::stdout())
            .apply();
        if let Err(e) = result {
            eprintln!("Failed to initialize test logger: {:?}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_registry_path() {
        assert_eq!(
            simplify_file_path(
                "/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/hyper-1.5.0/src/proto/h1/conn.rs"
            ),
            "hyper-1.5.0/src/proto/h1/conn.rs"
        );
        assert_eq!(
            simplify_file_path("/work/agent-bridge/src/agent/rag.rs"),
            "src/agent/rag.rs"
        );
    }

    #[test]
    fn test_own_records_pass_filter() {
        let own = log::Metadata::builder()
            .target("agent_bridge::agent::rag")
            .level(log::Level::Debug)
            .build();
        let telemetry = log::Metadata::builder()
            .target(TELEMETRY_TARGET)
            .level(log::Level::Info)
            .build();
        let foreign = log::Metadata::builder()
            .target("hyper::proto")
            .level(log::Level::Debug)
            .build();
        assert!(is_own_record(&own));
        assert!(is_own_record(&telemetry));
        assert!(!is_own_record(&foreign));
    }

    #[test]
    fn test_setup_test_logger_is_idempotent() {
        setup_test_logger();
        setup_test_logger();
        assert!(log::max_level() >= log::LevelFilter::Debug);
    }
}
