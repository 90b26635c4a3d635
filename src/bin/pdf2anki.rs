//! CLI binary for pdf2anki.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `FlashcardConfig`, prints results, and optionally exports
//! them to TSV or AnkiConnect.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2anki::config::{DEFAULT_MODEL, DEFAULT_NUM_CTX, DEFAULT_OLLAMA_HOST};
use pdf2anki::{
    extract_pages, write_tsv, AnkiConnectClient, ExtractionProgress, FlashcardConfig,
    FlashcardGenerationPipeline, FlashcardSet, ProgressCallback, ProviderKind,
    DEFAULT_ANKICONNECT_HOST,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &'static str, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Page progress bar during extraction, then a spinner while the synthesis
/// request is in flight.
struct CliProgress {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
    synthesis: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: spinner("Preparing", "Opening PDF…"),
            page_started: Mutex::new(None),
            synthesis: Mutex::new(None),
        })
    }

    fn page_elapsed(&self) -> String {
        let secs = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl ExtractionProgress for CliProgress {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{text_len:>5} chars")),
            self.page_elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let msg = match error.char_indices().nth(79) {
            Some((i, _)) => format!("{}\u{2026}", &error[..i]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            self.page_elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} pages read",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages read  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }

    fn on_synthesis_start(&self, input_chars: usize) {
        let bar = spinner("Writing", "flashcards…");
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating flashcards from {input_chars} chars…"))
        ));
        if let Ok(mut slot) = self.synthesis.lock() {
            *slot = Some(bar);
        }
    }

    fn on_synthesis_complete(&self, cards: usize) {
        if let Some(bar) = self.synthesis.lock().ok().and_then(|mut s| s.take()) {
            bar.finish_and_clear();
        }
        eprintln!("{} {} flashcards", green("✔"), bold(&cards.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the text of the first 5 pages
  pdf2anki extract lecture.pdf 5

  # Generate cards from the first 10 pages into cards.tsv
  pdf2anki generate lecture.pdf 10 cards.tsv

  # Generate and push straight into an Anki deck
  pdf2anki generate lecture.pdf --deck "Biology::Cells"

  # Separate vision and text models on a remote Ollama
  OLLAMA_HOST=http://192.168.1.132:11435 OCR_MODEL=llava:13b \
    pdf2anki generate lecture.pdf

  # List Anki decks
  pdf2anki decks

ENVIRONMENT VARIABLES:
  OLLAMA_HOST          Ollama base URL (default http://localhost:11434)
  OLLAMA_MODEL         Model for OCR and synthesis
  OLLAMA_NUM_CTX       Context window sent with every request (default 16384)
  OCR_HOST             Ollama base URL for OCR only
  OCR_MODEL            Vision model for OCR only
  PDF2ANKI_PROVIDER    ollama (default) or a hosted provider: openai, anthropic, gemini
  PDF2ANKI_MAX_PAGES   Default page limit
  ANKICONNECT_HOST     AnkiConnect URL (default http://localhost:8765)
  PDFIUM_LIB_PATH      Path to libpdfium
  RUST_LOG             Log filter, overrides --verbose/--quiet
"#;

/// Turn PDF documents into Anki flashcards with vision and text LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2anki",
    version,
    about = "Turn PDF documents into Anki flashcards with vision and text LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2ANKI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2ANKI_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDF2ANKI_NO_PROGRESS")]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text extracted from each page
    Extract(ExtractArgs),
    /// Generate flashcards, write them to TSV and optionally to Anki
    Generate(GenerateArgs),
    /// List the decks in the running Anki
    Decks(DecksArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM provider: ollama, or any hosted provider (openai, anthropic, gemini).
    #[arg(long, env = "PDF2ANKI_PROVIDER", default_value = "ollama")]
    provider: String,

    /// Ollama base URL.
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST)]
    host: String,

    /// Model used for OCR and synthesis.
    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Context window size sent with every Ollama request.
    #[arg(long, env = "OLLAMA_NUM_CTX", default_value_t = DEFAULT_NUM_CTX)]
    num_ctx: u32,

    /// Ollama base URL for OCR only.
    #[arg(long, env = "OCR_HOST")]
    ocr_host: Option<String>,

    /// Vision model for OCR only.
    #[arg(long, env = "OCR_MODEL")]
    ocr_model: Option<String>,

    /// Sampling temperature (0.0–2.0). Model default when unset.
    #[arg(long, env = "PDF2ANKI_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDF2ANKI_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Path to a text file containing a custom OCR prompt.
    #[arg(long, env = "PDF2ANKI_OCR_PROMPT")]
    ocr_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// PDF file to read.
    pdf: PathBuf,

    /// Process at most this many pages.
    #[arg(env = "PDF2ANKI_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Output the per-page result as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    endpoints: ModelArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// PDF file to read.
    pdf: PathBuf,

    /// Process at most this many pages.
    #[arg(env = "PDF2ANKI_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Where to write the tab-separated export.
    #[arg(default_value = "flashcards.tsv")]
    output: PathBuf,

    /// Skip the TSV export.
    #[arg(long)]
    no_export: bool,

    /// Add the cards to this Anki deck (created if missing).
    #[arg(long, env = "ANKI_DECK")]
    deck: Option<String>,

    /// Tag attached to every note added to Anki. Repeatable.
    #[arg(long = "tag", default_value = "pdf2anki")]
    tags: Vec<String>,

    /// AnkiConnect URL.
    #[arg(long, env = "ANKICONNECT_HOST", default_value = DEFAULT_ANKICONNECT_HOST)]
    anki_host: String,

    /// Roughly how many cards to ask for per page.
    #[arg(long, env = "PDF2ANKI_CARDS_PER_PAGE", default_value_t = 3)]
    cards_per_page: usize,

    /// Pages with fewer characters are not used for synthesis (0 keeps all).
    #[arg(long, env = "PDF2ANKI_MIN_PAGE_CHARS", default_value_t = 100)]
    min_page_chars: usize,

    /// Use pages the vision model described as blank.
    #[arg(long, env = "PDF2ANKI_KEEP_BLANK_PAGES")]
    keep_blank_pages: bool,

    /// Output cards, page text and parse counts as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    endpoints: ModelArgs,
}

#[derive(Args, Debug)]
struct DecksArgs {
    /// AnkiConnect URL.
    #[arg(long, env = "ANKICONNECT_HOST", default_value = DEFAULT_ANKICONNECT_HOST)]
    anki_host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are suppressed while the progress bar is up;
    // the bar already reports per-page progress.
    let json = match &cli.command {
        Command::Extract(a) => a.json,
        Command::Generate(a) => a.json,
        Command::Decks(_) => false,
    };
    let show_progress = !cli.quiet && !cli.no_progress && !json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn ExtractionProgress>)
    } else {
        None
    };

    match cli.command {
        Command::Extract(args) => run_extract(args, progress).await,
        Command::Generate(args) => run_generate(args, progress, cli.quiet).await,
        Command::Decks(args) => run_decks(args).await,
    }
}

async fn run_extract(args: ExtractArgs, progress: Option<ProgressCallback>) -> Result<()> {
    let config = build_config(&args.endpoints, args.max_pages, progress, |b| b).await?;
    let result = extract_pages(&args.pdf, &config)
        .await
        .context("Extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise output")?
        );
        return Ok(());
    }

    for page in &result.pages {
        println!("=== Page {} ===", page.page_number());
        match page.error() {
            Some(e) => println!("[{e}]"),
            None => println!("{}", page.text()),
        }
        println!();
    }
    Ok(())
}

async fn run_generate(
    args: GenerateArgs,
    progress: Option<ProgressCallback>,
    quiet: bool,
) -> Result<()> {
    let (cards_per_page, min_page_chars) = (args.cards_per_page, args.min_page_chars);
    let skip_blank_pages = !args.keep_blank_pages;
    let config = build_config(&args.endpoints, args.max_pages, progress, |b| {
        b.cards_per_page(cards_per_page)
            .min_page_chars(min_page_chars)
            .skip_blank_pages(skip_blank_pages)
    })
    .await?;

    let output = FlashcardGenerationPipeline::from_config(&config)
        .context("Invalid configuration")?
        .generate_detailed(&args.pdf, config.max_pages)
        .await
        .context("Flashcard generation failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        print_cards(&output.cards);
    }

    if !args.no_export {
        write_tsv(&args.output, &output.cards).context("Export failed")?;
        if !quiet {
            eprintln!(
                "{} {} cards  →  {}",
                green("✔"),
                output.cards.len(),
                bold(&args.output.display().to_string())
            );
        }
    }

    if let Some(deck) = &args.deck {
        let anki = AnkiConnectClient::new(&args.anki_host)?;
        anki.create_deck(deck)
            .await
            .with_context(|| format!("Could not create deck '{deck}'"))?;
        let summary = anki
            .add_notes(deck, &output.cards, &args.tags)
            .await
            .context("Could not add notes to Anki")?;
        if !quiet {
            eprintln!(
                "{} {} notes added to {}{}",
                green("✔"),
                summary.added,
                bold(deck),
                if summary.rejected > 0 {
                    dim(&format!("  ({} already present)", summary.rejected))
                } else {
                    String::new()
                }
            );
        }
    }

    if !quiet && output.report.malformed + output.report.empty > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} malformed and {} empty records were skipped",
                output.report.malformed, output.report.empty
            ))
        );
    }
    Ok(())
}

async fn run_decks(args: DecksArgs) -> Result<()> {
    let anki = AnkiConnectClient::new(&args.anki_host)?;
    let mut decks = anki.deck_names().await.context("Could not list decks")?;
    decks.sort();
    for deck in decks {
        println!("{deck}");
    }
    Ok(())
}

fn print_cards(cards: &FlashcardSet) {
    for card in cards {
        println!("Q: {}", card.front());
        println!("A: {}", card.back());
        println!();
    }
}

/// Map CLI args to `FlashcardConfig`; `extra` adds subcommand-specific settings.
async fn build_config(
    args: &ModelArgs,
    max_pages: Option<usize>,
    progress: Option<ProgressCallback>,
    extra: impl FnOnce(pdf2anki::FlashcardConfigBuilder) -> pdf2anki::FlashcardConfigBuilder,
) -> Result<FlashcardConfig> {
    let mut builder = FlashcardConfig::builder()
        .provider(ProviderKind::from_name(&args.provider))
        .ollama_host(&args.host)
        .model(&args.model)
        .num_ctx(args.num_ctx)
        .timeout_secs(args.timeout)
        .max_pages(max_pages);

    if let Some(host) = &args.ocr_host {
        builder = builder.ocr_host(host);
    }
    if let Some(model) = &args.ocr_model {
        builder = builder.ocr_model(model);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(path) = &args.pdfium_lib {
        builder = builder.pdfium_library(path);
    }
    if let Some(path) = &args.ocr_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read OCR prompt from {:?}", path))?;
        builder = builder.ocr_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    extra(builder).build().context("Invalid configuration")
}
