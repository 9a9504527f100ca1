//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use dynosync_core::session::{restore_artifact, RestoreOutcome};
use dynosync_core::setup::configure_environment;
use dynosync_core::shutdown::termination_signal;
use dynosync_core::sync::spawn_artifact_watcher;
use dynosync_core::tools::{FsLookup, ToolPaths};
use dynosync_core::{
    EncodedSession, FileArtifact, HerokuClient, Platform, SaveOutcome, SessionSynchronizer,
    SyncConfig, SyncSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Restore, watch, and flush on SIGTERM.
    Run,
    /// One save, right now.
    Save,
    Restore,
    Paths,
    Status,
}

impl Command {
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "run" => Command::Run,
            "save" => Command::Save,
            "restore" => Command::Restore,
            "paths" => Command::Paths,
            "status" => Command::Status,
            other => bail!(
                "Unknown command '{}' (expected run, save, restore, paths, status)",
                other
            ),
        })
    }
}

pub async fn run(command: Command, config_path: Option<&Path>) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let platform = Platform::from_env();

    match command {
        Command::Run => run_service(&config, &platform).await,
        Command::Save => save_once(&config, &platform).await,
        Command::Restore => restore(&config, &platform).map(|_| ()),
        Command::Paths => {
            print_paths(&platform);
            Ok(())
        }
        Command::Status => {
            print_status(&config, &platform);
            Ok(())
        }
    }
}

fn build_synchronizer(config: &SyncConfig, platform: &Platform) -> Result<SessionSynchronizer> {
    let client = HerokuClient::with_settings(&config.api_base_url, config.request_timeout())
        .context("Failed to build config-var client")?;

    Ok(SessionSynchronizer::new(
        platform,
        SyncSettings::from(config),
        Arc::new(FileArtifact::new(&config.session_path)),
        Arc::new(client),
    ))
}

fn restore(config: &SyncConfig, platform: &Platform) -> Result<RestoreOutcome> {
    let outcome = restore_artifact(
        &config.session_path,
        &config.session_tag,
        platform.get(&config.variable_name),
    )?;
    info!(?outcome, path = %config.session_path.display(), "Restore finished");
    Ok(outcome)
}

/// Boot-time restore. Off the platform this never touches the filesystem,
/// even when a session var was loaded from `.env`.
fn restore_on_boot(config: &SyncConfig, platform: &Platform) -> Option<RestoreOutcome> {
    if !platform.is_managed() {
        return None;
    }
    // A bad booted value shouldn't keep the watcher from starting
    match restore(config, platform) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(error = %e, "Session restore failed");
            None
        }
    }
}

async fn run_service(config: &SyncConfig, platform: &Platform) -> Result<()> {
    if !platform.is_managed() {
        warn!("Not running on a dyno; nothing to do until DYNO is set");
    }

    restore_on_boot(config, platform);

    let sync = build_synchronizer(config, platform)?;
    let shutdown = configure_environment(platform, &sync, &FsLookup);
    let _watcher = spawn_artifact_watcher(sync.clone(), config.watch_interval());

    if !sync.is_active() && platform.is_managed() {
        warn!("HEROKU_API_KEY or HEROKU_APP_NAME missing, session will not be persisted");
    }

    // Return from main rather than exiting so the log writer flushes
    match shutdown {
        Some(handle) => {
            handle.await.context("Shutdown handler failed")?;
        }
        None => termination_signal()
            .await
            .context("Failed to listen for termination signal")?,
    }

    info!("dynosync stopped");
    Ok(())
}

async fn save_once(config: &SyncConfig, platform: &Platform) -> Result<()> {
    let sync = build_synchronizer(config, platform)?;
    match sync.perform_save().await {
        SaveOutcome::Saved => println!("Session saved"),
        SaveOutcome::Skipped(reason) => println!("Nothing saved: {:?}", reason),
        SaveOutcome::Failed(e) => println!("Save failed: {}", e),
    }
    Ok(())
}

fn print_paths(platform: &Platform) {
    let paths = ToolPaths::discover(platform, &FsLookup);
    match paths.chromium {
        Some(ref path) => println!("chromium: {}", path.display()),
        None => println!("chromium: not found"),
    }
    println!("ffmpeg:   {}", paths.ffmpeg.display());
}

fn print_status(config: &SyncConfig, platform: &Platform) {
    let artifact = FileArtifact::new(&config.session_path);
    let session = platform.get(&config.variable_name);

    println!("managed:      {}", platform.dyno().unwrap_or("no"));
    println!(
        "credentials:  {}",
        match platform.credentials() {
            Some(creds) => format!("configured for {}", creds.app_name),
            None => "missing".to_string(),
        }
    );
    println!(
        "artifact:     {} ({})",
        artifact.path().display(),
        if artifact.exists() { "present" } else { "absent" }
    );
    println!(
        "session var:  {}",
        match session {
            Some(value) if EncodedSession::has_tag(&config.session_tag, value) => "tagged",
            Some(_) => "untagged",
            None => "unset",
        }
    );
}
