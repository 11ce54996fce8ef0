// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pilot Daemon (pilotd)
//!
//! Background process that owns the event log and serves the host UI over
//! a Unix socket. Tool side effects are delegated back to the host; the
//! daemon enforces the gates around them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod event_bus;
mod listener;
mod protocol;
mod recovery;
mod service;

use crate::config::Config;
use crate::env::StatePaths;
use crate::recovery::StartupDisposition;
use crate::service::HostService;
use fs2::FileExt;
use pilot_engine::{ToolHost, ToolHostError, ToolInvocation, ToolOutput};
use pilot_core::SystemClock;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Placeholder host: the daemon refuses effects until a host attaches.
///
/// The IDE-side process is the real executor of file edits and terminal
/// commands; standalone `pilotd` still serves queries, routing, approvals,
/// and recovery.
struct DetachedHost;

#[async_trait::async_trait]
impl ToolHost for DetachedHost {
    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolHostError> {
        Err(ToolHostError(format!(
            "no host attached to execute {}",
            invocation.tool
        )))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("pilotd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("pilotd {}", env!("CARGO_PKG_VERSION"));
                println!("Pilot Daemon - owns the event log and the approval gates");
                println!();
                println!("USAGE:");
                println!("    pilotd");
                println!();
                println!("The daemon is started by the host UI and should not normally");
                println!("be invoked directly. It listens on a Unix socket in the state");
                println!("directory ($PILOT_STATE_DIR or ~/.local/state/pilot).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: pilotd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let paths = StatePaths::resolve();
    std::fs::create_dir_all(&paths.state_dir)?;
    let config = Config::load(&paths.config_path);

    rotate_log_if_needed(&paths.log_path, config.log_max_bytes);
    let _log_guard = setup_logging(&paths)?;

    // Single-instance lock
    let lock_file = File::create(&paths.lock_path)?;
    if lock_file.try_lock_exclusive().is_err() {
        eprintln!("pilotd already running (lock held on {})", paths.lock_path.display());
        std::process::exit(1);
    }
    std::fs::write(&paths.lock_path, std::process::id().to_string())?;

    info!("starting pilotd");

    let workspace_root = std::env::var_os("PILOT_WORKSPACE")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let service = Arc::new(HostService::open(
        paths.clone(),
        workspace_root,
        Arc::new(DetachedHost),
        SystemClock,
    )?);

    match service.startup_disposition()? {
        StartupDisposition::Fresh => {}
        StartupDisposition::CleanExit(pointer) => {
            info!(task = %pointer.task_id, "previous session exited cleanly");
        }
        StartupDisposition::RecoveryOffer(pointer) => {
            // Surfaced to the UI; resume/discard arrives as a request
            warn!(
                task = %pointer.task_id,
                status = %pointer.status,
                "previous session did not exit cleanly; offering recovery"
            );
        }
    }

    // Socket (stale file from a dead process is safe to remove: we hold the lock)
    let _ = std::fs::remove_file(&paths.socket_path);
    let unix_listener = UnixListener::bind(&paths.socket_path)?;
    info!(socket = %paths.socket_path.display(), "listening");

    let shutdown = Arc::new(Notify::new());
    let serve_task = tokio::spawn(listener::serve(
        unix_listener,
        service.clone(),
        shutdown.clone(),
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigint.recv() => info!("SIGINT received"),
        _ = shutdown.notified() => info!("shutdown requested over the socket"),
    }

    shutdown.notify_waiters();
    let _ = serve_task.await;

    if let Err(e) = service.mark_clean_exit() {
        warn!(error = %e, "failed to record clean exit");
    }
    let _ = std::fs::remove_file(&paths.socket_path);

    info!("pilotd stopped");
    Ok(())
}

/// Rotate the daemon log to `.old` when it outgrows the configured cap.
fn rotate_log_if_needed(log_path: &PathBuf, max_bytes: u64) {
    if let Ok(metadata) = std::fs::metadata(log_path) {
        if metadata.len() > max_bytes {
            let old = log_path.with_extension("log.old");
            let _ = std::fs::rename(log_path, old);
        }
    }
}

fn setup_logging(
    paths: &StatePaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
