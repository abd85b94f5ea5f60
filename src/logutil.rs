//! Logging utilities: single-line sanitising of player-supplied strings and
//! the `env_logger` setup shared by the binary.

use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::config::LoggingConfig;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Level from `-v` count, falling back to the configured level.
pub fn level_filter(config: Option<&LoggingConfig>, verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => config
            .and_then(|cfg| log::LevelFilter::from_str(&cfg.level).ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Install the global logger. Lines look like `"<RFC3339> [LEVEL] message"`.
///
/// With a log file configured every line is appended there, and echoed to
/// stderr only when stderr is a terminal.
pub fn init_logging(config: Option<&LoggingConfig>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter(config, verbosity));

    let file = config
        .and_then(|cfg| cfg.file.as_deref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match file {
        Some(f) => {
            let sink = Arc::new(Mutex::new(f));
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }

    let _ = builder.try_init();
}
