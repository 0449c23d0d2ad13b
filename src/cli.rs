//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::session_calendar::RollingSessionCalendar;
use crate::domain::config_validation::{ResolvedConfig, build_engine_config};
use crate::domain::daily_series::DailySeries;
use crate::domain::engine::{BarOutput, LevelEngine};
use crate::domain::error::DaylevelsError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "daylevels", about = "Session range levels from OHLCV bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the level ladder for a symbol
    Levels {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
        /// Per-day levels CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Per-bar series CSV
        #[arg(long)]
        series: Option<PathBuf>,
    },
    /// Report expected-move success rates for a symbol
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Levels {
            config,
            data_dir,
            symbol,
            output,
            series,
        } => run_levels(
            config.as_deref(),
            data_dir.as_deref(),
            &symbol,
            output.as_deref(),
            series.as_deref(),
        ),
        Command::Backtest {
            config,
            data_dir,
            symbol,
        } => run_backtest(config.as_deref(), data_dir.as_deref(), &symbol),
        Command::ListSymbols { config, data_dir } => {
            run_list_symbols(config.as_deref(), data_dir.as_deref())
        }
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = DaylevelsError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_optional_config(path: Option<&Path>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            load_config(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// `--data-dir` wins over `[data] directory`.
pub fn resolve_data_dir(
    cli_dir: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, DaylevelsError> {
    cli_dir
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "directory").map(PathBuf::from))
        .ok_or_else(|| DaylevelsError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })
}

/// Result of replaying a symbol's bars through one engine.
#[derive(Debug)]
pub struct LevelsRun {
    pub engine: LevelEngine,
    pub series: Vec<BarOutput>,
    pub bar_count: usize,
    pub skipped_bars: usize,
}

/// Fetches the bars and feeds them through a freshly configured engine.
pub fn replay_symbol(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: &str,
) -> Result<LevelsRun, DaylevelsError> {
    let ResolvedConfig {
        config: engine_config,
        diagnostics,
    } = build_engine_config(config);
    for diagnostic in &diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let calendar = RollingSessionCalendar::from_config(config)?;
    let bars = data_port.fetch_bars(symbol)?;
    if bars.is_empty() {
        return Err(DaylevelsError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let daily = DailySeries::from_bars(&bars, &calendar);
    tracing::info!(symbol, bars = bars.len(), days = daily.len(), strategy = %engine_config.strategy, "replaying bars");

    let mut engine =
        LevelEngine::new(engine_config, Box::new(calendar)).with_daily_series(daily);
    let series: Vec<BarOutput> = bars.iter().filter_map(|bar| engine.advance(bar)).collect();

    Ok(LevelsRun {
        skipped_bars: bars.len() - series.len(),
        bar_count: bars.len(),
        engine,
        series,
    })
}

fn run_levels(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    symbol: &str,
    output: Option<&Path>,
    series_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Resolve data source
    let dir = match resolve_data_dir(data_dir, &config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_port = CsvAdapter::new(dir);

    // Stage 3: Replay
    eprintln!("Computing levels for {}...", symbol);
    let run = match replay_symbol(&data_port, &config, symbol) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "  Processed: {} bars ({} skipped), {} days",
        run.bar_count,
        run.skipped_bars,
        run.engine.history().len() + usize::from(run.engine.current_day().is_some()),
    );

    // Stage 4: Print current levels
    match run.engine.current_levels() {
        Some(published) => {
            let anchors = published.levels.anchors();
            eprintln!(
                "\n=== Levels for {} ({}) ===",
                published.day,
                run.engine.ladder().name()
            );
            eprintln!(
                "Q1 {:.4}  NR2 {:.4}  Q4 {:.4}  range {:.4}",
                anchors.q1(),
                anchors.nr2(),
                anchors.q4(),
                anchors.range()
            );
            for level in run.engine.display_levels() {
                println!("{},{}", level.name, level.value);
            }
        }
        None => eprintln!("\nNo levels: not enough history"),
    }

    if let Some(stats) = run.engine.expected_move().filter(|s| s.is_valid()) {
        eprintln!(
            "Expected move:    {:.4} / {:.4}",
            stats.expected_high, stats.expected_low
        );
    }

    // Stage 5: Write reports
    let report = CsvReportAdapter::new(run.engine.ladder().names().map(String::from).collect());
    if let Some(path) = output {
        let path = path.display().to_string();
        if let Err(e) = report.write_levels(&run.engine.level_rows(), &path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nLevels written to: {}", path);
    }
    if let Some(path) = series_path {
        let path = path.display().to_string();
        if let Err(e) = report.write_series(&run.series, &path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Series written to: {}", path);
    }

    ExitCode::SUCCESS
}

fn run_backtest(config_path: Option<&Path>, data_dir: Option<&Path>, symbol: &str) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = match resolve_data_dir(data_dir, &config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Running expected-move backtest for {}...", symbol);
    let run = match replay_symbol(&CsvAdapter::new(dir), &config, symbol) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let lookback = run.engine.config().lookback;
    let Some(result) = run.engine.backtest().filter(|b| b.total_days > 0) else {
        eprintln!("error: not enough days to evaluate (need at least 2)");
        return ExitCode::from(5);
    };

    eprintln!("\n=== Expected Move Backtest ===");
    eprintln!("Lookback:         {} days", lookback);
    eprintln!("Days Evaluated:   {}", result.total_days);
    eprintln!(
        "High Reached:     {} ({:.1}%)",
        result.high_success_count,
        result.high_success_rate()
    );
    eprintln!(
        "Low Reached:      {} ({:.1}%)",
        result.low_success_count,
        result.low_success_rate()
    );
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: Option<&Path>, data_dir: Option<&Path>) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = match resolve_data_dir(data_dir, &config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = RollingSessionCalendar::from_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let resolved = build_engine_config(&config);
    let engine = &resolved.config;

    eprintln!("\nResolved configuration:");
    eprintln!("  range mode:       {}", engine.strategy);
    eprintln!("  history capacity: {}", engine.history_capacity);
    eprintln!("  lookback:         {}", engine.lookback);
    eprintln!(
        "  ladder:           {} ({} levels)",
        engine.ladder.name(),
        engine.ladder.len()
    );
    eprintln!(
        "  rounding:         {} @ {}",
        engine.rounding.kind, engine.rounding.tick_size
    );
    eprintln!(
        "  volume:           {:?}, {} sessions",
        engine.volume_resolution, engine.volume_reference_period
    );

    if resolved.is_clean() {
        eprintln!("\nConfiguration is valid");
        return ExitCode::SUCCESS;
    }

    eprintln!("\n{} adjustment(s):", resolved.diagnostics.len());
    for diagnostic in &resolved.diagnostics {
        eprintln!("  {diagnostic}");
    }
    ExitCode::from(2)
}
