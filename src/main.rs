//! Hanki - adaptive flashcards in the terminal
//!
//! Cards are picked by weighted random selection: the ones you get wrong,
//! have never seen, or have not seen in a while come up more often.

mod config;
mod deck_file;
mod models;
mod selection;
mod session;
mod storage;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::TimeZone;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

use storage::DeckStorage;
use ui::App;

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "hanki")]
#[command(author, version, about = "Adaptive flashcard TUI", long_about = None)]
struct Args {
    /// Directory containing deck files
    #[arg(short, long)]
    decks_dir: Option<PathBuf>,

    /// Copy a CSV file into the decks directory
    #[arg(short, long)]
    import: Option<PathBuf>,

    /// Print the decks with their stats and exit
    #[arg(short, long)]
    list: bool,

    /// Clear study progress for a deck file and exit
    #[arg(long, value_name = "FILE")]
    reset: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let args = Args::parse();

    // Logging goes to a file; the terminal belongs to the TUI.
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    // Determine decks directory
    let decks_dir = args.decks_dir.unwrap_or_else(DeckStorage::default_path);

    // Initialize storage
    let storage = DeckStorage::new(decks_dir.clone())
        .with_context(|| format!("Failed to open decks directory {:?}", decks_dir))?;
    tracing::info!(decks_dir = ?storage.decks_dir(), "starting hanki");

    // Handle import if requested
    if let Some(csv_path) = args.import {
        let filename = storage
            .import_csv(&csv_path)
            .with_context(|| format!("Failed to import {:?}", csv_path))?;
        let cards = storage.load_deck(&filename)?;
        println!("✓ Imported {} cards into '{}'", cards.len(), filename);
        return Ok(());
    }

    if let Some(filename) = args.reset {
        let count = storage
            .reset_progress(&filename)
            .with_context(|| format!("Failed to reset {}", filename))?;
        println!("✓ Reset progress on {} cards in '{}'", count, filename);
        return Ok(());
    }

    if args.list {
        return list_decks(&storage);
    }

    // Run TUI
    run_tui(storage)
}

fn init_logging(level: &str) -> Result<()> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hanki");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let path = dir.join("hanki.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

fn list_decks(storage: &DeckStorage) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let decks = storage.list_decks(now)?;
    if decks.is_empty() {
        println!("No decks in {:?}", storage.decks_dir());
        return Ok(());
    }

    for deck in decks {
        let last = deck
            .stats
            .last_studied
            .and_then(|ms| chrono::Local.timestamp_millis_opt(ms).single())
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<32} {:>5} cards  {:>4} new  {:>4} review  {:>3.0}%  best streak {:<3} last studied {}{}",
            deck.name,
            deck.stats.card_count,
            deck.stats.new_cards,
            deck.stats.cards_needing_review,
            deck.stats.average_accuracy * 100.0,
            deck.max_streak,
            last,
            if deck.needs_setup { "  (needs setup)" } else { "" },
        );
    }
    Ok(())
}

fn run_tui(storage: DeckStorage) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Load config
    let config = config::Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using default config");
        config::Config::default()
    });

    // Create app
    let mut app = App::new(storage, config);

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Handle any errors
    if let Err(err) = result {
        tracing::error!(error = %err, "exiting with error");
        eprintln!("Error: {}", err);
        return Err(err);
    }

    tracing::info!("exiting");
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| app.render(frame))?;
        app.handle_events()?;
    }
    Ok(())
}
