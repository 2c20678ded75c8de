//! Logger initialization.
//!
//! Log lines are tagged with the crate component that emitted them (`fetch`,
//! `proxy`, `pacing`, ...) so a run can be followed attempt by attempt:
//!
//! ```text
//! 14:02:11.318 DEBUG fetch   Attempt 2/3 for https://example.com/p/2 as firefox-windows via http://10.0.0.7:3128
//! 14:02:11.902 WARN  proxy   Proxy http://10.0.0.7:3128 marked failed after 3 consecutive failures
//! ```

use std::io::{IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter};
use serde_json::json;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Module path prefix of this crate's log targets
const CRATE_TARGET: &str = "adaptive_fetch";

/// HTTP stack crates; their connection chatter stays at warn unless `RUST_LOG` says otherwise
const TRANSPORT_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls"];

/// Width the component column is padded to in plain output
const COMPONENT_WIDTH: usize = 7;

/// Initializes the logger with the specified level and format.
///
/// `RUST_LOG` is read first; `level` then applies to this crate and as the global
/// default, so `--log-level` always wins for fetch output. The HTTP stack is held
/// at warn. Plain lines are colored only when stderr is a terminal.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Every attempt, route and backoff
/// adaptive_fetch https://example.com/ --log-level debug
///
/// # Proxy transitions only, one JSON object per line
/// RUST_LOG=adaptive_fetch::proxy=info adaptive_fetch --url-file urls.txt --log-level warn --log-format json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(std::io::stderr().is_terminal());

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for target in TRANSPORT_TARGETS {
        builder.filter_module(target, LevelFilter::Warn.min(level));
    }
    builder.filter_module(CRATE_TARGET, level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = json_line(
                    Utc::now(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{line}")
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let line = plain_line(
                    Local::now(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{line}")
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

/// Short component name for a log target: `adaptive_fetch::proxy::parse` is `proxy`,
/// the crate root is `run`, foreign targets keep their crate name.
fn component(target: &str) -> &str {
    match target.strip_prefix(CRATE_TARGET) {
        Some("") => "run",
        Some(rest) => rest
            .trim_start_matches("::")
            .split("::")
            .next()
            .filter(|c| !c.is_empty())
            .unwrap_or("run"),
        None => target.split("::").next().unwrap_or(target),
    }
}

fn paint(level: Level) -> ColoredString {
    let label = format!("{:<5}", level);
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.purple(),
    }
}

fn plain_line(now: DateTime<Local>, level: Level, target: &str, message: &str) -> String {
    format!(
        "{} {} {} {}",
        now.format("%H:%M:%S%.3f").to_string().dimmed(),
        paint(level),
        format!("{:<width$}", component(target), width = COMPONENT_WIDTH).cyan(),
        message
    )
}

fn json_line(now: DateTime<Utc>, level: Level, target: &str, message: &str) -> String {
    json!({
        "ts": now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "level": level.as_str(),
        "component": component(target),
        "target": target,
        "msg": message,
    })
    .to_string()
}
