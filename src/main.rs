use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Level, info, warn};

use pop_atlas::{
    config::{AppConfig, LoggingConfig},
    data::{Dataset, Metric},
    map_draw::MapView,
    report::{self, OutputFormat, range_report},
    selection::{Selection, select_top_n},
    state::AppState,
    ui,
};

#[derive(Parser)]
#[command(author, version, about = "World population atlas for the terminal", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to ./atlas.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Population dataset, overriding input.data_csv
    #[arg(short, long, value_name = "CSV", global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive dashboard
    View,
    /// Print the most populous countries for a census year
    Top {
        #[arg(short, long)]
        year: Option<u16>,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Write here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print the choropleth color range of a metric
    Range {
        #[arg(short, long, default_value = "area")]
        metric: Metric,
    },
}

fn init_tracing(logging: &LoggingConfig, to_file: bool) -> Result<()> {
    let parsed = logging.max_level();
    let level = parsed.unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_max_level(level);
    if to_file {
        let file = File::create(&logging.file)
            .with_context(|| format!("Failed to create log file: {:?}", logging.file))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
    if parsed.is_none() {
        warn!(level = %logging.level, "unknown logging.level, using info");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::View);
    init_tracing(&config.logging, matches!(command, Commands::View))?;

    let data_path = cli.data.unwrap_or_else(|| config.input.data_csv.clone());
    let dataset = Arc::new(Dataset::load(&data_path)?);

    match command {
        Commands::View => {
            let map = config.input.world_geojson.as_ref().and_then(|path| {
                MapView::load(path)
                    .map_err(|e| warn!("map geometry unavailable: {:#}", e))
                    .ok()
            });
            let mut state = AppState::new(dataset, map, &config.dashboard, config.export.dir.clone());
            run_dashboard(&mut state)?;
        }
        Commands::Top { year, top_n, format, out } => {
            let year = year.unwrap_or(config.dashboard.year);
            let top_n = top_n.unwrap_or(config.dashboard.top_n);
            let selection = select_top_n(&dataset, year, top_n).unwrap_or_else(|e| {
                warn!("{}", e);
                eprintln!("warning: {}", e);
                Selection::empty(year, top_n)
            });
            let writer: Box<dyn Write> = match &out {
                Some(path) => Box::new(
                    File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            report::write_top(&selection, &dataset, format, writer)?;
            info!(year, top_n, rows = selection.len(), "printed selection");
        }
        Commands::Range { metric } => {
            let report = range_report(&dataset, metric);
            if report.low.is_none() {
                eprintln!("warning: {} not found in dataset.", report.metric);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn run_dashboard(state: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, state: &mut AppState) -> Result<()> {
    info!("dashboard started");
    loop {
        terminal.draw(|f| ui::draw(f, state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) = event::read()? {
                if state.handle_input(code) {
                    break;
                }
            }
        }
    }
    info!("dashboard closed");
    Ok(())
}
