//! CLI tool for restructuring presentations into knowledge documents.

mod config;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use config::ConfigOverrides;
use deck_core::{AiService, OutputFormat};
use pipeline::Pipeline;
use std::path::PathBuf;

/// Convert PowerPoint presentations into restructured documents.
#[derive(Parser, Debug)]
#[command(name = "deck-convert")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file(s) (.pptx)
    #[arg(required_unless_present = "show_config")]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: docx or markdown
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Model service: local (ollama) or remote (openai)
    #[arg(short, long)]
    service: Option<AiService>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the model service
    #[arg(long)]
    base_url: Option<String>,

    /// API key for the remote service
    #[arg(long)]
    api_key: Option<String>,

    /// Recognize text in slide images
    #[arg(long)]
    ocr: bool,

    /// Path to the tesseract executable
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Slides restructured concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ai_service: self.service,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            output_format: self.format,
            enable_ocr: self.ocr.then_some(true),
            tesseract_path: self.tesseract.clone(),
            workers: self.workers,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = config::load(args.config.as_deref(), &args.overrides())?;

    if args.show_config {
        println!("{}", config);
        return Ok(());
    }

    for warning in config.validate()? {
        eprintln!("Warning: {}", warning);
    }

    let pipeline = Pipeline::new(&config)?;

    let mut failed = 0;
    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match pipeline.convert(input_path, args.output.as_deref()) {
            Ok(output_path) => {
                if args.verbose {
                    eprintln!("Written to: {}", output_path.display());
                }
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be converted", failed, args.input.len());
    }

    Ok(())
}
