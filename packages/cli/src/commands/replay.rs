use crate::media::FsUploader;
use anyhow::{anyhow, Context, Result};
use blockpad_editor::{
    Block, BlockId, Document, EditSession, EditorConfig, Handled, ImageSource, InputEvent, Key,
    MemorySurface, Modifiers, Mutation, Payload, PostEffectEngine, RenderAdapter, UploadCoordinator,
};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Event script (JSON array of steps)
    pub script: PathBuf,

    /// Starting document; a single empty paragraph when omitted
    #[arg(short, long)]
    pub document: Option<PathBuf>,

    /// Directory uploaded images are copied into
    #[arg(long, default_value = "media")]
    pub media_dir: PathBuf,

    /// Write the resulting document here as JSON
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// How to print the resulting document
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One scripted user action
///
/// Blocks are addressed by their position in the document at the time the
/// step runs; image paths are relative to the script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Focus {
        block: usize,
        #[serde(default)]
        offset: usize,
    },
    Type { text: String },
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
    },
    Paste { path: PathBuf },
    PasteText { text: String },
    Drop { path: PathBuf },
    Choose { path: PathBuf },
    Cancel,
    Remove { block: usize },
    Caption { block: usize, text: String },
    Retry { block: usize },
    /// Wait for every upload in flight
    Settle,
}

/// Result of a replay
#[derive(Debug)]
pub struct ReplayOutcome {
    pub blocks: Vec<Block>,
    pub uploads_committed: usize,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let cwd = PathBuf::from(cwd);
    let config = EditorConfig::load(&cwd)?;

    let script_path = cwd.join(&args.script);
    let steps = load_script(&script_path)?;
    let base_dir = script_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    let document = match &args.document {
        Some(path) => load_document(&cwd.join(path), &config)?,
        None => Document::with_effects(PostEffectEngine::from_config(&config)),
    };

    println!(
        "{} {} ({} steps)",
        "Replaying".bright_white().bold(),
        args.script.display(),
        steps.len()
    );

    let outcome = run_script(&steps, document, &config, &cwd.join(&args.media_dir), &base_dir)?;

    match args.format {
        OutputFormat::Text => print_blocks(&outcome.blocks),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.blocks)?),
    }

    if outcome.uploads_committed > 0 {
        println!(
            "  {} {} upload(s) committed",
            "✓".green(),
            outcome.uploads_committed
        );
    }

    if let Some(out) = &args.out {
        fs::write(cwd.join(out), serde_json::to_string_pretty(&outcome.blocks)?)?;
        println!("  {} Wrote {}", "✓".green(), out.display());
    }

    Ok(())
}

pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid script {}", path.display()))
}

fn load_document(path: &Path, config: &EditorConfig) -> Result<Document> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read document {}", path.display()))?;
    let blocks: Vec<Block> = serde_json::from_str(&content)?;
    Ok(Document::from_blocks(blocks, PostEffectEngine::from_config(config)))
}

/// Drive a session through the script against an in-memory surface
pub fn run_script(
    steps: &[Step],
    document: Document,
    config: &EditorConfig,
    media_dir: &Path,
    base_dir: &Path,
) -> Result<ReplayOutcome> {
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let mut uploads = UploadCoordinator::new(
        Arc::new(FsUploader::new(media_dir)),
        config.upload_channel_capacity,
    );
    let mut session = EditSession::with_document(document, config);
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());

    let mut uploads_committed = 0;

    for (n, step) in steps.iter().enumerate() {
        tracing::debug!(step = n, ?step, "replaying");
        let handled = run_step(step, &mut session, &mut surface, base_dir)
            .with_context(|| format!("Step {} ({:?})", n + 1, step))?;

        if let Some(Handled::Rejected(err)) = &handled {
            tracing::warn!(step = n, %err, "step rejected");
        }

        if matches!(step, Step::Settle) {
            uploads_committed += runtime.block_on(session.finish_uploads(&mut uploads));
            surface.sync(session.document().blocks());
        } else {
            uploads_committed += session.pump_uploads(&mut uploads);
        }
    }

    uploads_committed += runtime.block_on(session.finish_uploads(&mut uploads));

    Ok(ReplayOutcome {
        blocks: session.get_document(),
        uploads_committed,
    })
}

fn run_step(
    step: &Step,
    session: &mut EditSession,
    surface: &mut MemorySurface,
    base_dir: &Path,
) -> Result<Option<Handled>> {
    let handled = match step {
        Step::Focus { block, offset } => {
            let block_id = block_at(session, *block)?;
            session.focus(block_id, *offset);
            surface.place_caret(block_id, *offset);
            return Ok(None);
        }
        Step::Type { text } => type_into(session, surface, text),
        Step::Key { key, shift } => {
            let key = Key::from_name(key);
            let event = InputEvent::KeyDown {
                key,
                modifiers: Modifiers { shift: *shift },
            };
            let handled = session.dispatch(&event, surface);
            if handled == Handled::Delegated {
                // Play the surface's native behaviour
                match key {
                    Key::Backspace => {
                        if let Some((block_id, content)) = surface.delete_backward() {
                            session.dispatch(&InputEvent::TextChanged { block_id, content }, surface);
                        }
                    }
                    Key::Enter => {
                        type_into(session, surface, "\n");
                    }
                    Key::Other => {}
                }
            }
            handled
        }
        Step::Paste { path } => session.dispatch(
            &InputEvent::Paste {
                payload: Payload::Image {
                    image: ImageSource::file(base_dir.join(path)),
                },
            },
            surface,
        ),
        Step::PasteText { text } => {
            let handled = session.dispatch(
                &InputEvent::Paste {
                    payload: Payload::Text { text: text.clone() },
                },
                surface,
            );
            if handled == Handled::Delegated {
                type_into(session, surface, text);
            }
            handled
        }
        Step::Drop { path } => session.dispatch(
            &InputEvent::drop_image(ImageSource::file(base_dir.join(path))),
            surface,
        ),
        Step::Choose { path } => session.dispatch(
            &InputEvent::ImageChosen {
                image: ImageSource::file(base_dir.join(path)),
            },
            surface,
        ),
        Step::Cancel => session.dispatch(&InputEvent::ImageChoiceCancelled, surface),
        Step::Remove { block } => {
            let block_id = block_at(session, *block)?;
            session.dispatch(&InputEvent::RemoveRequested { block_id }, surface)
        }
        Step::Caption { block, text } => {
            let block_id = block_at(session, *block)?;
            let handled = session.apply(Mutation::SetCaption {
                block_id,
                caption: text.clone(),
            });
            surface.sync(session.document().blocks());
            handled
        }
        Step::Retry { block } => {
            let block_id = block_at(session, *block)?;
            session.retry_upload(block_id)?;
            return Ok(None);
        }
        Step::Settle => return Ok(None),
    };

    Ok(Some(handled))
}

fn type_into(session: &mut EditSession, surface: &mut MemorySurface, text: &str) -> Handled {
    match surface.type_text(text) {
        Some((block_id, content)) => {
            session.dispatch(&InputEvent::TextChanged { block_id, content }, surface)
        }
        None => {
            tracing::warn!("typing with no focused block");
            Handled::Ignored
        }
    }
}

fn block_at(session: &EditSession, index: usize) -> Result<BlockId> {
    session
        .document()
        .blocks()
        .get(index)
        .map(Block::id)
        .ok_or_else(|| {
            anyhow!(
                "No block at index {} (document has {})",
                index,
                session.document().len()
            )
        })
}

fn print_blocks(blocks: &[Block]) {
    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Text(text) => {
                println!("  {:>3} {} {:?}", i, "text ".cyan(), text.content);
            }
            Block::Image(image) => {
                let location = image
                    .resource_ref
                    .clone()
                    .unwrap_or_else(|| "(preview only)".to_string());
                println!(
                    "  {:>3} {} {} [{:?}]",
                    i,
                    "image".magenta(),
                    location,
                    image.upload_status
                );
            }
        }
    }
}
