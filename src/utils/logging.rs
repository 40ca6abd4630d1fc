use std::io;
use std::path::Path;
use std::sync::OnceLock;
use chrono::Local;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter, filter::LevelFilter };
use tracing_appender::rolling::{ RollingFileAppender, Rotation };
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{ LogConfig, LogRotation };

// Writer guards must outlive every log call, so they live for the whole process
struct LogGuards {
    _file_guard: WorkerGuard,
    _console_guard: Option<WorkerGuard>,
}

static LOG_GUARDS: OnceLock<LogGuards> = OnceLock::new();

/// Initialize non-blocking file logging, plus pretty console output in debug mode
pub fn init_logging(level: Level, debug: bool, log_config: &LogConfig) -> io::Result<()> {
    if !log_config.directory.exists() {
        std::fs::create_dir_all(&log_config.directory).map_err(|e| {
            eprintln!("Failed to create log directory: {}", e);
            e
        })?;
    }

    let filename = format!("{}_{}.log", log_config.filename_prefix, Local::now().format("%Y%m%d"));

    let file_appender = RollingFileAppender::new(
        rotation(log_config.rotation),
        log_config.directory.clone(),
        filename
    );
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt
        ::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into());

    let console_guard = if debug {
        let (console_writer, console_guard) = tracing_appender::non_blocking(io::stdout());

        let console_layer = fmt
            ::layer()
            .with_writer(console_writer)
            .with_ansi(true)
            .with_target(true)
            .pretty();

        tracing_subscriber::registry().with(filter).with(file_layer).with(console_layer).init();
        Some(console_guard)
    } else {
        tracing_subscriber::registry().with(filter).with(file_layer).init();
        None
    };

    let _ = LOG_GUARDS.set(LogGuards {
        _file_guard: file_guard,
        _console_guard: console_guard,
    });

    if let Some(max_files) = log_config.max_files {
        if
            let Err(e) = cleanup_old_logs(
                &log_config.directory,
                &log_config.filename_prefix,
                max_files
            )
        {
            // Not fatal; the process can still log
            eprintln!("Failed to clean up old log files: {}", e);
        }
    }

    tracing::info!(
        log_dir = %log_config.directory.display(),
        log_prefix = %log_config.filename_prefix,
        "Asynchronous logging initialized at level: {:?}",
        level
    );

    Ok(())
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Keep only the `max_files` most recently modified logs with `prefix`
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: usize) -> io::Result<()> {
    let mut entries = std::fs
        ::read_dir(log_dir)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();

            if path.is_file() && path.file_name()?.to_string_lossy().starts_with(prefix) {
                let modified = entry.metadata().ok()?.modified().ok()?;
                return Some((path, modified));
            }
            None
        })
        .collect::<Vec<_>>();

    if entries.len() > max_files {
        // Newest first
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in entries.iter().skip(max_files) {
            std::fs::remove_file(path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{ Duration, SystemTime };

    #[test]
    fn prunes_oldest_logs_with_prefix() {
        let dir = std::env::temp_dir().join(format!("kta_logs_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        for i in 0..4u64 {
            let path = dir.join(format!("kucoin_tri_arb_{}.log", i));
            let file = std::fs::File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(i * 60)).unwrap();
        }
        std::fs::write(dir.join("other.log"), b"keep").unwrap();

        cleanup_old_logs(&dir, "kucoin_tri_arb", 2).unwrap();

        let mut left: Vec<String> = std::fs
            ::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["kucoin_tri_arb_2.log", "kucoin_tri_arb_3.log", "other.log"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
