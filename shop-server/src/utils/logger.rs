//! Logging Infrastructure
//!
//! - Console output (pretty in development, JSON in production)
//! - Daily rotating application logs under `<log_dir>/app`, deleted after 14 days
//! - Audit logs under `<log_dir>/audit`, never deleted
//! - Security logs under `<log_dir>/security`, never deleted

use std::fs;
use std::path::{Path, PathBuf};
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Application log retention
const APP_LOG_RETENTION_DAYS: i64 = 14;

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

fn is_app_target(meta: &Metadata<'_>) -> bool {
    meta.target() != "audit" && meta.target() != "security"
}

fn is_audit_target(meta: &Metadata<'_>) -> bool {
    meta.target() == "audit"
}

fn is_security_target(meta: &Metadata<'_>) -> bool {
    meta.target() == "security"
}

/// One daily-rotated file layer that only accepts events matching `keep`
fn file_layer(
    dir: &Path,
    prefix: &str,
    json: bool,
    keep: fn(&Metadata<'_>) -> bool,
) -> anyhow::Result<BoxedLayer> {
    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)?;
    let filter = tracing_subscriber::filter::filter_fn(keep);

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(appender));

    Ok(if json {
        layer
            .json()
            .with_current_span(true)
            .with_filter(filter)
            .boxed()
    } else {
        layer.with_filter(filter).boxed()
    })
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` when set.
///
/// ```no_run
/// // Development (console only)
/// shop_server::utils::logger::init_logger("debug", false, None)?;
///
/// // Production (console + files)
/// shop_server::utils::logger::init_logger("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(json_format)];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        layers.push(file_layer(&log_dir.join("app"), "app", json_format, is_app_target)?);
        layers.push(file_layer(
            &log_dir.join("audit"),
            "audit",
            json_format,
            is_audit_target,
        )?);
        layers.push(file_layer(
            &log_dir.join("security"),
            "security",
            json_format,
            is_security_target,
        )?);

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .init();

    Ok(())
}

/// Delete application log files older than the retention window
///
/// Only touches `<log_dir>/app/app.YYYY-MM-DD.log`; audit and security logs
/// are kept forever.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(APP_LOG_RETENTION_DAYS)).date_naive();

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date_part) = name
            .strip_prefix("app.")
            .and_then(|d| d.strip_suffix(".log"))
        else {
            continue;
        };
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            removed += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(removed)
}

/// Runs every hour
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Audit log helper - records operator and money-moving actions
///
/// ```ignore
/// audit_log!("42", "report_published", "report:MB-2026-03");
/// audit_log!("42", "commission_paid", "commission:7", "tr_123");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($actor_id:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            actor_id = $actor_id,
            action = $action,
            resource = $resource,
            "AUDIT"
        );
    };
    ($actor_id:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            actor_id = $actor_id,
            action = $action,
            resource = $resource,
            details = $details,
            "AUDIT"
        );
    };
}

/// Security log helper - records authentication and signature failures
///
/// ```ignore
/// security_log!(WARN, "auth_failed", reason = "missing_token");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(target: "security", event = $event, $($arg)*);
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(target: "security", event = $event, $($arg)*);
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: "security", event = $event, $($arg)*);
    };
}
