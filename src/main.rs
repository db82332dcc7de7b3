use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use waterlock_lib::{
    audio::RodioOutputFactory,
    cli::{drive_live_input, Args},
    ChannelSink, EngineConfig, SessionController, SessionEvent, SettingsStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let device = args.device_type();

    let settings = args
        .settings
        .clone()
        .map(SettingsStore::new)
        .transpose()
        .context("failed to load settings")?;
    let config = settings
        .as_ref()
        .map(SettingsStore::engine_config)
        .unwrap_or_else(EngineConfig::default);

    let cli_override = args.custom_override();
    if args.save {
        if let (Some(store), Some(custom)) = (settings.as_ref(), cli_override) {
            let custom = custom.validate().context("override not saved")?;
            store.update_custom_override(Some(custom))?;
            log::info!("Saved override: {:.0}% for {:.0}s", custom.intensity_percent, custom.duration_secs);
        }
    }
    let custom_override =
        cli_override.or_else(|| settings.as_ref().and_then(SettingsStore::custom_override));

    let (sink, mut records) = ChannelSink::new();
    let controller = SessionController::new(config, Arc::new(RodioOutputFactory), Arc::new(sink));
    let mut events = controller.subscribe();

    controller
        .start(device, args.intensity, custom_override)
        .await
        .context("failed to start session")?;

    if args.intensity.is_realtime() {
        if let Some(lines) = spawn_stdin_reader() {
            log::info!("Realtime mode: type an intensity percent (0-100) and press enter");
            tokio::spawn(drive_live_input(controller.clone(), lines));
        }
    }

    loop {
        tokio::select! {
            record = records.recv() => {
                if let Some(record) = record {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                break;
            }
            event = events.recv() => {
                if let Ok(SessionEvent::Tick(snapshot)) = event {
                    log::debug!(
                        "{:.0}s / {:.0}s",
                        snapshot.elapsed_secs,
                        snapshot.total_duration_secs
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.stop().await;
            }
        }
    }

    Ok(())
}

/// Reads stdin lines on a plain thread; a blocking read inside the runtime
/// would hold up shutdown.
fn spawn_stdin_reader() -> Option<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    match spawned {
        Ok(_) => Some(rx),
        Err(err) => {
            log::warn!("Live intensity input unavailable: {}", err);
            None
        }
    }
}
