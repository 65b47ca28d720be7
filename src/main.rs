use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use device_parts::{
    broadcast,
    config::{CONFIG_PATH, PREFS_PATH},
    dependency::Transition,
    gestures, logging,
    nodes::NodeWriter,
    parts_config::{load_or_init, NodeValue, PartsConfig},
    prefs::{get_preference_string, is_preference_enabled, JsonPreferences, PreferenceStore},
    prefs_watch::{self, PrefsWatcher},
    secure,
    session::{RuleEvaluator, SessionSnapshot, SettingsSession},
    shell::{CommandRunner, SystemRunner},
    state, sysfs,
};

#[derive(Debug, Parser)]
#[command(name = "partsd", version, about = "Device parts: gestures, sysfs nodes and doze service")]
struct Cli {
    /// Device description (nodes, dependency rules, doze names).
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Persisted preferences.
    #[arg(long, global = true, default_value = PREFS_PATH)]
    prefs: PathBuf,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Restore nodes, then follow preference changes.
    Daemon,
    /// Write stored preference values to their sysfs nodes.
    RestoreNodes,
    /// Start or stop the doze service according to the preferences.
    CheckDoze,
    /// Turn the secure doze setting on or off.
    Doze { state: Switch },
    /// Request an ambient display pulse.
    Pulse,
    /// Print a preference (stored value or node default).
    Get { key: String },
    /// Print what a node currently holds.
    Node { key: String },
    /// Store a preference and push it to its node.
    Set { key: String, value: String },
    /// Recompute dependent toggles and print their projection as JSON.
    Reconcile {
        /// Keep tracker memory between invocations in this file.
        #[arg(long)]
        session: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Serialize)]
struct ToggleReport {
    key: String,
    checked: bool,
    enabled: bool,
    store_update: Option<bool>,
    transition: Transition,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = load_or_init(&cli.config);
    let runner = SystemRunner;

    match cli.command {
        Command::Daemon => run_daemon(cfg, cli.prefs),
        Command::RestoreNodes => {
            let store = open_prefs(&cli.prefs)?;
            let n = NodeWriter::new().restore_all(&cfg, &store);
            println!("{} node(s) written", n);
            Ok(())
        }
        Command::CheckDoze => {
            let store = open_prefs(&cli.prefs)?;
            let running = gestures::check_doze_service(&runner, &store, &cfg.doze)?;
            println!("doze service {}", if running { "started" } else { "stopped" });
            Ok(())
        }
        Command::Doze { state } => {
            secure::enable_doze(&runner, matches!(state, Switch::On))?;
            let store = open_prefs(&cli.prefs)?;
            gestures::check_doze_service(&runner, &store, &cfg.doze)?;
            Ok(())
        }
        Command::Pulse => Ok(broadcast::launch_doze_pulse(&runner, &cfg.doze)?),
        Command::Get { key } => {
            let store = open_prefs(&cli.prefs)?;
            match cfg.default_for(&key) {
                Some(NodeValue::Str(_)) => {
                    println!("{}", get_preference_string(&store, &cfg, &key).unwrap_or_default())
                }
                _ => println!("{}", is_preference_enabled(&store, &cfg, &key)),
            }
            Ok(())
        }
        Command::Node { key } => {
            let Some(node) = cfg.node(&key) else {
                bail!("no node configured for `{}`", key);
            };
            let default = node.default.to_node_string();
            println!("{}", sysfs::get_file_value(&node.path, &default));
            Ok(())
        }
        Command::Set { key, value } => set_preference(&runner, &cfg, &cli.prefs, &key, &value),
        Command::Reconcile { session } => reconcile(&cfg, &cli.prefs, session),
    }
}

fn open_prefs(path: &Path) -> Result<JsonPreferences> {
    JsonPreferences::open(path).with_context(|| format!("opening {}", path.display()))
}

fn run_daemon(cfg: PartsConfig, prefs: PathBuf) -> Result<()> {
    log::info!(
        "partsd starting ({} node(s), {} rule(s))",
        cfg.nodes.len(),
        cfg.dependencies.len()
    );

    let shared = state::shared();
    let watcher = PrefsWatcher::new(prefs, cfg, SystemRunner, shared.clone());
    let handle = prefs_watch::spawn(watcher);

    if handle.join().is_err() {
        let last = state::read(&shared).last_error.clone();
        bail!("preference watcher died (last error: {})", last.as_deref().unwrap_or("none"));
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn set_preference(
    runner: &dyn CommandRunner,
    cfg: &PartsConfig,
    prefs: &Path,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut store = open_prefs(prefs)?;

    match cfg.default_for(key) {
        Some(NodeValue::Str(_)) => store.set_string(key, value)?,
        _ => {
            let Some(b) = parse_bool(value) else {
                bail!("`{}` expects a boolean, got `{}`", key, value);
            };
            store.set_bool(key, b)?;
            if cfg.doze.cust_key.as_deref() == Some(key) {
                if let Err(e) = broadcast::broadcast_cust_intent(runner, &cfg.doze, b) {
                    log::warn!("PREFS: broadcast failed: {}", e);
                }
            }
        }
    }

    if cfg.node(key).is_some() {
        NodeWriter::new()
            .apply(cfg, &store, key)
            .with_context(|| format!("writing node for {}", key))?;
    }
    if cfg.doze.gestures.iter().any(|g| g == key) {
        gestures::check_doze_service(runner, &store, &cfg.doze)?;
    }
    Ok(())
}

fn reconcile(cfg: &PartsConfig, prefs: &Path, session_path: Option<PathBuf>) -> Result<()> {
    let snap = match &session_path {
        Some(p) => SessionSnapshot::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => SessionSnapshot::default(),
    };
    let SessionSnapshot {
        tracker,
        mut toggles,
        pending,
    } = snap;

    let runner = SystemRunner;
    let eval = RuleEvaluator::new(&cfg.dependencies, &runner);
    let mut session = SettingsSession::resume(open_prefs(prefs)?, tracker, pending);

    if session.flush_pending() > 0 {
        log::warn!("PREFS: {} write(s) still pending", session.pending().len());
    }
    let results = session.refresh(&eval, &mut toggles);

    let report: Vec<ToggleReport> = results
        .into_iter()
        .map(|(key, r)| ToggleReport {
            key,
            checked: r.display_checked,
            enabled: r.display_enabled,
            store_update: r.store_update,
            transition: r.transition,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(p) = session_path {
        let (_, tracker, pending) = session.into_parts();
        SessionSnapshot {
            tracker,
            toggles,
            pending,
        }
        .save(&p)
        .with_context(|| format!("saving {}", p.display()))?;
    }
    Ok(())
}
