//! Tracing setup: console and log file share the full fmt layout (level, target, span, fields).

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Initializes the global tracing subscriber.
///
/// Output is tee'd to stdout and to `log_file_path` (append mode); the parent directory is created
/// when missing. Level comes from `RUST_LOG` and defaults to `info`. Load `.env` before calling this
/// or `RUST_LOG` from that file is not seen.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    let file = Arc::new(file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let writer = io::stdout.and(file);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}

/// Masks a bot token for logging: first 7 chars + "***" + last 4 chars.
/// Tokens of length <= 11 become "***" so no segment leaks.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token_short() {
        assert_eq!(mask_token(""), "***");
        assert_eq!(mask_token("12345:abc"), "***");
        assert_eq!(mask_token("12345678901"), "***");
    }

    #[test]
    fn test_mask_token_long() {
        let token = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw";
        let masked = mask_token(token);
        assert_eq!(masked, "1234567***Dsaw");
        assert!(!masked.contains("AAHdq"));
    }

    /// **Test: init_tracing creates the log directory and writes events to the file**
    #[test]
    fn test_init_tracing_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("nested").join("dispatch.log");
        let log_path = log_path.to_str().unwrap();

        init_tracing(log_path).unwrap();
        tracing::info!(marker = "logger-test", "Logger initialized");

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("logger-test"));
        assert!(init_tracing(log_path).is_err(), "second init must fail");
    }

    #[test]
    fn test_mask_token_non_ascii_fully_masked() {
        assert_eq!(mask_token("токен-токен-токен"), "***");
    }
}
