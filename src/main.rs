mod script;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use diagrammer_core::{AutomergeStore, Delivery, EntityStore, MemoryStore};
use diagrammer_export::{export_frame_svg, export_svg};
use diagrammer_session::{Editor, EditorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Headless diagram editor: replays a gesture script and prints the result
#[derive(Parser, Debug)]
#[command(name = "diagrammer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Gesture script (JSON); read from stdin when omitted
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Where the shapes live
    #[arg(long, value_enum, default_value_t = StoreKind::Local)]
    store: StoreKind,

    /// Hold store notifications until a `flush` step
    #[arg(long)]
    deferred: bool,

    /// Config file (defaults to ~/.config/diagrammer/config.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Include the preview and selection handles in SVG output
    #[arg(long)]
    frame: bool,

    /// Override the configured undo limit
    #[arg(long, value_name = "N")]
    history_limit: Option<usize>,

    /// Override the configured stroke width
    #[arg(long, value_name = "WIDTH")]
    stroke: Option<f32>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StoreKind {
    /// Editor-owned shape list
    Local,
    /// In-memory entity store
    Memory,
    /// Automerge-backed entity store
    Automerge,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Svg,
}

/// The store behind a store-backed session
enum Backend {
    Local,
    Memory(Arc<MemoryStore>),
    Automerge(Arc<AutomergeStore>),
}

impl Backend {
    fn new(kind: StoreKind, deferred: bool) -> Self {
        match kind {
            StoreKind::Local => Backend::Local,
            StoreKind::Memory => {
                let store = MemoryStore::new();
                if deferred {
                    store.set_delivery(Delivery::Deferred);
                }
                Backend::Memory(Arc::new(store))
            }
            StoreKind::Automerge => Backend::Automerge(Arc::new(AutomergeStore::new())),
        }
    }

    fn store(&self) -> Option<Arc<dyn EntityStore>> {
        match self {
            Backend::Local => None,
            Backend::Memory(store) => Some(Arc::clone(store) as Arc<dyn EntityStore>),
            Backend::Automerge(store) => Some(Arc::clone(store) as Arc<dyn EntityStore>),
        }
    }

    fn flush(&self) -> usize {
        match self {
            Backend::Memory(store) => store.flush(),
            Backend::Local | Backend::Automerge(_) => 0,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("diagrammer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("failed to read script from stdin")?;
            Ok(source)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = EditorConfig::load(args.config.as_deref())?;
    if let Some(limit) = args.history_limit {
        config.history_limit = limit;
    }
    if let Some(stroke) = args.stroke {
        config.stroke_width = stroke;
    }

    if args.deferred && args.store != StoreKind::Memory {
        tracing::warn!(store = ?args.store, "--deferred only applies to the memory store");
    }
    let backend = Backend::new(args.store, args.deferred);
    let mut editor = match backend.store() {
        Some(store) => Editor::with_store(config, store),
        None => Editor::new(config),
    };

    let steps = script::parse(&read_script(args.script.as_deref())?)?;
    info!(steps = steps.len(), store = ?args.store, "replaying script");
    script::run(&mut editor, &steps, || backend.flush())?;

    // settle anything still queued so the output shows the final state
    backend.flush();
    editor.pump();
    info!(
        shapes = editor.shapes().len(),
        undo = editor.history().undo_count(),
        redo = editor.history().redo_count(),
        "done"
    );

    let output = match args.format {
        Format::Json => serde_json::to_string_pretty(editor.shapes())?,
        Format::Svg if args.frame => export_frame_svg(&editor),
        Format::Svg => export_svg(&editor),
    };
    println!("{output}");
    Ok(())
}
