//! tcvfs: virtual file management for a TummyCrypt sync root
//!
//! Commands:
//!   modes                    - list virtualization modes and which are usable
//!   check [<root>]           - pre-flight check of a sync root for a mode
//!   pin <path> <state>       - set the pin state of a folder
//!   status [<path>]          - effective pin state and availability
//!   track <path> <kind>      - record an item in the journal
//!   untrack <path>           - forget an item
//!   dehydrate <path>         - replace a local file with a placeholder
//!   config show              - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use tcvfs_core::config::TcvfsConfig;
use tcvfs_core::journal::checked_path;
use tcvfs_core::{ItemType, Mode, PinState};
use tcvfs_journal::JournalDb;
use tcvfs_vfs::{
    best_available_vfs_mode, check_feasibility, create_vfs_from_plugin, is_vfs_plugin_available,
    PlaceholderItem, StartedVfs, VfsSetupParams,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "tcvfs",
    version,
    about = "TummyCrypt virtual files",
    long_about = "tcvfs: choose a placeholder backend for a sync root, check it, and manage pin states"
)]
struct Cli {
    /// Path to tcvfs.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "TCVFS_CONFIG",
        default_value = "~/.config/tcvfs/config.toml"
    )]
    config: PathBuf,

    /// Journal file (overrides config)
    #[arg(long, env = "TCVFS_JOURNAL")]
    journal: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(long, env = "TCVFS_LOG")]
    log: Option<String>,

    /// Log format (overrides config)
    #[arg(long, env = "TCVFS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List virtualization modes and whether their backend is usable
    Modes,

    /// Check that a mode can be enabled on a sync root
    Check {
        /// Sync root (default: vfs.sync_root from config)
        root: Option<PathBuf>,
        /// Mode to check (default: configured mode, else best available)
        #[arg(long, short = 'm')]
        mode: Option<String>,
    },

    /// Set the pin state of a folder and everything below it
    Pin {
        /// Folder path relative to the sync root ("" for the root)
        path: String,
        state: PinArg,
    },

    /// Show effective pin state and availability of a folder
    Status {
        /// Folder path relative to the sync root (default: root)
        #[arg(default_value = "")]
        path: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Record an item in the journal
    Track {
        /// Item path relative to the sync root
        path: String,
        kind: ItemKind,
        /// Size of the remote content in bytes
        #[arg(long, default_value_t = 0)]
        size: u64,
    },

    /// Forget an item recorded in the journal
    Untrack {
        /// Item path relative to the sync root
        path: String,
    },

    /// Replace a hydrated file with a placeholder, reclaiming disk space
    Dehydrate {
        /// File path relative to the sync root
        path: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum PinArg {
    Inherited,
    AlwaysLocal,
    OnlineOnly,
}

impl From<PinArg> for PinState {
    fn from(arg: PinArg) -> Self {
        match arg {
            PinArg::Inherited => PinState::Inherited,
            PinArg::AlwaysLocal => PinState::AlwaysLocal,
            PinArg::OnlineOnly => PinState::OnlineOnly,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum ItemKind {
    /// Hydrated file
    File,
    /// Dehydrated placeholder
    Virtual,
    Directory,
}

impl From<ItemKind> for ItemType {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::File => ItemType::File,
            ItemKind::Virtual => ItemType::VirtualFile,
            ItemKind::Directory => ItemType::Directory,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .unwrap_or_else(|| parse_log_format(&config.log.format));
    init_logging(&level, format);

    let journal_path = expand_tilde(cli.journal.as_deref().unwrap_or(&config.journal.path));

    match cli.command {
        Commands::Modes => cmd_modes(),
        Commands::Check { root, mode } => cmd_check(&config, root.as_deref(), mode.as_deref()),
        Commands::Pin { path, state } => {
            let journal = open_journal(&journal_path)?;
            let vfs = start_vfs(&config, Arc::clone(&journal))?;
            vfs.set_pin_state(&path, state.into())
                .with_context(|| format!("setting pin state of {path:?}"))?;
            journal.flush()?;
            println!("{} {}", display_path(&path), PinState::from(state));
            Ok(())
        }
        Commands::Status { path, json } => {
            let journal = open_journal(&journal_path)?;
            let vfs = start_vfs(&config, journal)?;
            cmd_status(&vfs, &path, json)
        }
        Commands::Track { path, kind, size } => {
            let journal = open_journal(&journal_path)?;
            journal.record_item(&path, kind.into(), size)?;
            journal.flush()?;
            Ok(())
        }
        Commands::Untrack { path } => {
            let journal = open_journal(&journal_path)?;
            journal.remove_item(&path)?;
            journal.flush()?;
            Ok(())
        }
        Commands::Dehydrate { path } => {
            let journal = open_journal(&journal_path)?;
            let vfs = start_vfs(&config, Arc::clone(&journal))?;
            cmd_dehydrate(&vfs, &journal, &path)?;
            journal.flush()?;
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config, &config_path),
        },
    }
}

// ── Logging ──────────────────────────────────────────────────────────────────

fn parse_log_format(s: &str) -> LogFormat {
    match s {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config / journal helpers ─────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<TcvfsConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(TcvfsConfig::default())
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

fn open_journal(path: &Path) -> Result<Arc<JournalDb>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating journal dir: {}", parent.display()))?;
    }
    Ok(Arc::new(JournalDb::open(path)?))
}

/// Mode to use: explicit argument, then config, then best available.
///
/// An explicit or configured mode that is not recognized is an error; only a
/// missing mode falls back.
fn resolve_mode(config: &TcvfsConfig, explicit: Option<&str>) -> Result<Mode> {
    if let Some(raw) = explicit {
        return Mode::from_config_str(raw)
            .with_context(|| format!("unknown mode {raw:?} (expected off, suffix or wincfapi)"));
    }
    if let Some(raw) = config.vfs.mode.as_deref() {
        return config.vfs.mode().with_context(|| {
            format!("unknown vfs.mode {raw:?} in config (expected off, suffix or wincfapi)")
        });
    }

    let mode = best_available_vfs_mode();
    info!(mode = %mode, "no vfs mode configured, using best available");
    Ok(mode)
}

fn start_vfs(config: &TcvfsConfig, journal: Arc<JournalDb>) -> Result<StartedVfs> {
    let mode = resolve_mode(config, None)?;
    let root = expand_tilde(&config.vfs.sync_root);

    check_feasibility(mode, &root)
        .with_context(|| format!("cannot enable {mode} on {}", root.display()))?;

    let vfs = create_vfs_from_plugin(mode)
        .with_context(|| format!("vfs backend for mode {mode} is not available"))?;

    let vfs = vfs.start(VfsSetupParams {
        filesystem_path: root,
        remote_path: config.vfs.remote_path.clone(),
        display_name: config.vfs.display_name.clone(),
        provider_name: config.vfs.provider_name.clone(),
        provider_version: env!("CARGO_PKG_VERSION").to_string(),
        journal,
    })?;
    Ok(vfs)
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

// ── `tcvfs modes` ─────────────────────────────────────────────────────────────

fn cmd_modes() -> Result<()> {
    println!("{:<10} AVAILABLE", "MODE");
    for mode in Mode::ALL {
        let available = if is_vfs_plugin_available(mode) { "yes" } else { "no" };
        println!("{:<10} {available}", mode.as_str());
    }
    println!();
    println!("best: {}", best_available_vfs_mode());
    Ok(())
}

// ── `tcvfs check` ─────────────────────────────────────────────────────────────

fn cmd_check(config: &TcvfsConfig, root: Option<&Path>, mode: Option<&str>) -> Result<()> {
    let mode = resolve_mode(config, mode)?;
    let root = expand_tilde(root.unwrap_or(&config.vfs.sync_root));

    if !is_vfs_plugin_available(mode) {
        anyhow::bail!("vfs backend for mode {mode} is not available");
    }
    check_feasibility(mode, &root)?;
    println!("{mode}: {} ok", root.display());
    Ok(())
}

// ── `tcvfs status` ────────────────────────────────────────────────────────────

fn cmd_status(vfs: &StartedVfs, path: &str, json: bool) -> Result<()> {
    let pin = vfs.pin_state(path)?;
    let availability = vfs.availability(path);

    let pin_str = pin.map(|p| p.as_str()).unwrap_or("none");
    let availability_str = match &availability {
        Ok(a) => a.to_string(),
        Err(e) => {
            warn!(path = %path, "availability: {e}");
            format!("error: {e}")
        }
    };

    if json {
        let out = serde_json::json!({
            "path": display_path(path),
            "mode": vfs.mode().as_str(),
            "pin_state": pin.map(|p| p.as_str()),
            "availability": availability.as_ref().ok().map(|a| a.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("path:         {}", display_path(path));
        println!("mode:         {}", vfs.mode());
        println!("pin state:    {pin_str}");
        println!("availability: {availability_str}");
    }
    Ok(())
}

// ── `tcvfs dehydrate` ─────────────────────────────────────────────────────────

fn cmd_dehydrate(vfs: &StartedVfs, journal: &JournalDb, path: &str) -> Result<()> {
    if vfs.mode() == Mode::Off {
        anyhow::bail!("dehydrate needs a placeholder backend; vfs mode is off");
    }
    let path = checked_path(path)?;
    let local = path
        .split('/')
        .filter(|seg| !seg.is_empty())
        .fold(vfs.params().filesystem_path.clone(), |acc, seg| acc.join(seg));
    let data = std::fs::read(&local).with_context(|| format!("reading {}", local.display()))?;

    let item = PlaceholderItem {
        path: path.to_string(),
        size: data.len() as u64,
        content_id: format!("blake3:{}", blake3::hash(&data).to_hex()),
    };
    vfs.dehydrate_placeholder(&item)
        .with_context(|| format!("dehydrating {path}"))?;
    journal.record_item(&path, ItemType::VirtualFile, item.size)?;

    info!(path = %path, size = item.size, "dehydrated");
    println!("{path}: dehydrated ({} bytes freed)", item.size);
    Ok(())
}

// ── `tcvfs config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &TcvfsConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
