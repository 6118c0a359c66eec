use anyhow::{anyhow, Context, Result};
use blockpad_editor::{Block, Document, EditorConfig, PostEffectEngine};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Persisted document (JSON array of blocks)
    pub input: PathBuf,

    /// Write the repaired document back to the input file
    #[arg(short, long)]
    pub write: bool,
}

/// What the invariant pass had to change
#[derive(Debug, PartialEq, Eq)]
pub struct CheckReport {
    pub blocks_before: usize,
    pub blocks_after: usize,
    pub repaired: bool,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = EditorConfig::load(cwd)?;

    if !args.input.is_file() {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    }

    let (document, report) = check_file(&args.input, &config)?;

    if !report.repaired {
        println!(
            "  {} {} ({} blocks)",
            "✓".green(),
            args.input.display(),
            report.blocks_after
        );
        return Ok(());
    }

    println!(
        "  {} {} needed repair: {} → {} blocks",
        "⚠️".yellow(),
        args.input.display(),
        report.blocks_before,
        report.blocks_after
    );

    if args.write {
        fs::write(&args.input, serde_json::to_string_pretty(&document.get_document())?)?;
        println!("  {} Wrote repaired document", "✓".green());
    } else {
        println!("Use --write to save the repaired document");
    }

    Ok(())
}

pub fn check_file(path: &Path, config: &EditorConfig) -> Result<(Document, CheckReport)> {
    let content = fs::read_to_string(path)?;
    let blocks: Vec<Block> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a block document", path.display()))?;

    let blocks_before = blocks.len();
    let document = Document::from_blocks(blocks.clone(), PostEffectEngine::from_config(config));
    let report = CheckReport {
        blocks_before,
        blocks_after: document.len(),
        repaired: document.blocks() != blocks.as_slice(),
    };

    Ok((document, report))
}
