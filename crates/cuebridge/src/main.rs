use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use cuebridge_core::{
    HardwareVariant, IntegrationManager, IntegrationState, LogicalButtonId, MixerSettings,
    SettingsStore,
};

/// Bind cues to mixer user buttons and log presses coming back from the console.
#[derive(Parser, Debug)]
#[command(name = "cuebridge")]
#[command(about = "Mixer user-button bridge")]
struct Args {
    /// Settings file (default: <config dir>/cuebridge/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mixer model family
    #[arg(long, value_parser = parse_variant)]
    variant: Option<HardwareVariant>,

    /// Mixer IP address
    #[arg(long, value_parser = parse_ip)]
    target_ip: Option<IpAddr>,

    /// Mixer OSC command port
    #[arg(long)]
    target_port: Option<u16>,

    /// Local port the mixer streams button state to (0 picks any free port)
    #[arg(long)]
    listen_port: Option<u16>,

    /// Bind a button, e.g. `2:3=Intro,green` or `1:1:u=Drop`
    #[arg(long = "bind", value_parser = parse_bind)]
    binds: Vec<BindArg>,

    /// Write the merged settings back to the settings file
    #[arg(long)]
    save: bool,
}

#[derive(Debug, Clone)]
struct BindArg {
    button: LogicalButtonId,
    label: String,
    color: String,
}

fn parse_ip(s: &str) -> Result<IpAddr, String> {
    s.parse().map_err(|e| format!("Invalid IP address: {}", e))
}

fn parse_variant(s: &str) -> Result<HardwareVariant, String> {
    s.parse()
        .map_err(|_| format!("Invalid mixer type '{}', expected compact or full", s))
}

fn parse_bind(s: &str) -> Result<BindArg, String> {
    let (token, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected TOKEN=LABEL[,COLOR], got '{}'", s))?;
    let button = token.parse()?;
    let (label, color) = match rest.split_once(',') {
        Some((label, color)) => (label, color),
        None => (rest, "green"),
    };
    if label.is_empty() {
        return Err(format!("Missing label in '{}'", s));
    }
    Ok(BindArg {
        button,
        label: label.to_string(),
        color: color.to_string(),
    })
}

fn merge_args(mut settings: MixerSettings, args: &Args) -> MixerSettings {
    if let Some(variant) = args.variant {
        settings.mixer_type = variant;
    }
    if let Some(ip) = args.target_ip {
        settings.target_ip_address = Some(ip.to_string());
        settings.mixer_integration_enabled = true;
    }
    if let Some(port) = args.target_port {
        settings.target_port = port;
    }
    if let Some(port) = args.listen_port {
        settings.listen_port = Some(port);
    }
    settings
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut store = SettingsStore::new(args.config.clone());
    let loaded = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;
    let settings = merge_args(loaded, &args);

    if args.save {
        store
            .update_settings(settings.clone())
            .context("saving settings")?;
        log::info!("Settings saved to {}", store.path().display());
    } else if let Err(errors) = SettingsStore::validate_settings(&settings) {
        bail!("invalid settings: {}", errors.join(", "));
    }

    let labels: Arc<HashMap<LogicalButtonId, String>> = Arc::new(
        args.binds
            .iter()
            .map(|bind| (bind.button, bind.label.clone()))
            .collect(),
    );

    let mut manager = IntegrationManager::new();
    let press_labels = Arc::clone(&labels);
    manager.on_button_pressed(move |button, source| match press_labels.get(&button) {
        Some(label) => log::info!("Button {} pressed ({}): {}", button, source, label),
        None => log::info!("Button {} pressed ({})", button, source),
    });

    manager.update_settings(&settings).await?;
    if manager.state() == IntegrationState::Disabled {
        bail!("mixer integration is disabled, pass --target-ip or enable it in the settings file");
    }

    for bind in &args.binds {
        match manager
            .bind_cue_to_button(&bind.label, bind.button, &bind.label, &bind.color, true)
            .await
        {
            Ok(Some(cc)) => log::info!("Bound '{}' to {} on CC {}", bind.label, bind.button, cc),
            Ok(None) => {}
            Err(e) => log::error!("Failed to bind '{}' to {}: {}", bind.label, bind.button, e),
        }
    }

    log::info!("Listening for button presses, Ctrl-C to quit");
    tokio::signal::ctrl_c().await?;

    manager.shutdown().await;
    for (key, value) in manager.status() {
        log::debug!("{}: {}", key, value);
    }
    Ok(())
}
