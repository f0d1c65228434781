//! Layout Translator CLI - translate a PDF into print-ready HTML from the terminal.

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use layout_translator_core::{
    AppConfig, IncomingFile, PrintDocument, RunOutcome, TranslationEvent, client_from_config,
    drive_translation, intake, supported_languages, util::format_size,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "layout-translate")]
#[command(author, version, about = "Translate PDF documents while keeping their layout", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required_unless_present = "list_languages")]
    input: Option<PathBuf>,

    /// Output HTML file (default: input-<target>.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the supported target languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_output(input: &Path, lang: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("translated_document");
    input.with_file_name(format!("{stem}-{lang}.html"))
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    if let Some(ref target) = args.target {
        config.target_lang = layout_translator_core::Lang::new(target);
    }
    if let Some(ref base) = args.api_base {
        config.gemini.api_base.clone_from(base);
    }
    if let Some(ref key) = args.api_key
        && !key.trim().is_empty()
    {
        config.gemini.api_key = Some(key.clone());
    }
    if let Some(ref model) = args.model {
        config.gemini.model.clone_from(model);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[allow(clippy::print_stdout)]
fn print_languages() {
    for lang in supported_languages() {
        println!("{} {:<4} {}", lang.flag, lang.code, lang.name);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.list_languages {
        print_languages();
        return Ok(());
    }

    let Some(input) = args.input.clone() else {
        bail!("No input file given");
    };

    let config = load_config(&args)?;
    let target = config.target_language();

    let incoming = IncomingFile::from_path(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let file = intake::accept_with_limit(incoming, config.upload_soft_limit_bytes())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let client = client_from_config(&config).context("Failed to initialize translator")?;
    if !client.is_configured() {
        bail!(layout_translator_core::Error::MissingApiKey.user_message());
    }

    info!(
        "Translating {} ({}) into {}",
        file.name,
        file.display_size(),
        target.name
    );

    let pb = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut status = String::new();
    let mut content = String::new();
    let outcome = drive_translation(&client, &file, target, |event| {
        match event {
            TranslationEvent::Status(s) => status = s,
            TranslationEvent::Content(c) => content = c,
        }
        pb.set_message(format!("{status} {}", format_size(content.len() as u64)));
        std::future::ready(true)
    })
    .await;

    match outcome {
        RunOutcome::Completed => pb.finish_with_message("Translation complete"),
        RunOutcome::Failed(e) => {
            pb.abandon_with_message("Translation failed");
            bail!(e.user_message());
        }
        RunOutcome::Abandoned => {
            pb.abandon();
            bail!("Translation abandoned");
        }
    }

    if content.trim().is_empty() {
        bail!("The model returned no translated content");
    }

    let title = format!("{} ({})", file.name, target.name);
    let html = PrintDocument::from_translation(&title, &content)
        .to_html()
        .context("Failed to render the translated document")?;

    let output_path = args
        .output
        .unwrap_or_else(|| default_output(&input, target.code));
    std::fs::write(&output_path, html)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Translated document saved to: {}", output_path.display());
        println!("Open it in a browser and print to PDF to export.");
    }

    Ok(())
}
