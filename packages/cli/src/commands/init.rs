use anyhow::Result;
use blockpad_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Text that opens the image picker when confirmed with Enter
    #[arg(long, default_value = "/image")]
    pub image_command: String,

    /// Merge text blocks left adjacent after an image is removed
    #[arg(long)]
    pub merge_adjacent_text: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = EditorConfig {
        image_command: args.image_command,
        merge_adjacent_text: args.merge_adjacent_text,
        ..EditorConfig::default()
    };
    config.save(cwd)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Write an event script (see `blockpad replay --help`)");
    println!("  2. Run: blockpad replay script.json");

    Ok(())
}
