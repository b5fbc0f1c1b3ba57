//! cellcalc CLI - evaluate formulas and recompute grids

use anyhow::{bail, Context, Result};
use cellcalc::prelude::*;
use cellcalc::{compute_formula, function_registry};
use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellcalc")]
#[command(author, version, about = "Spreadsheet formula evaluation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Maximum reference-chain depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Pin the clock used by TODAY/NOW (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<NaiveDateTime>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one formula against inline cell assignments
    Eval {
        /// Formula to evaluate; the leading '=' is optional
        formula: String,

        /// Cell assignment such as A1=5 or B2==A1*2 (repeatable)
        #[arg(short, long = "cell", value_parser = parse_assignment)]
        cells: Vec<(CellAddress, String)>,
    },

    /// Recompute a CSV grid and print the display values as CSV
    #[command(alias = "csv")]
    Grid {
        /// Input CSV file (default: stdin)
        input: Option<PathBuf>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter (default: comma)
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Print calculation statistics to stderr
        #[arg(short, long)]
        stats: bool,
    },

    /// List the built-in functions and their aliases
    Functions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut options = EvaluationOptions::default();
    if let Some(max_depth) = cli.max_depth {
        options = options.with_max_depth(max_depth);
    }
    if let Some(now) = cli.now {
        options = options.with_now(now);
    }

    match cli.command {
        Commands::Eval { formula, cells } => eval(&formula, cells, &options),
        Commands::Grid {
            input,
            output,
            delimiter,
            stats,
        } => recompute_grid(input.as_deref(), output.as_deref(), delimiter, stats, options),
        Commands::Functions => list_functions(),
    }
}

/// Install a stderr subscriber; RUST_LOG overrides the level chosen by `-v`
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS: {}", e))
}

/// Parse a `LABEL=RAW` cell assignment; everything after the first '=' is the raw value
fn parse_assignment(s: &str) -> Result<(CellAddress, String), String> {
    let (label, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{}'", s))?;
    let addr = CellAddress::parse(label).map_err(|e| e.to_string())?;
    Ok((addr, raw.to_string()))
}

fn eval(
    formula: &str,
    cells: Vec<(CellAddress, String)>,
    options: &EvaluationOptions,
) -> Result<()> {
    let mut grid = Grid::new();
    for (addr, raw) in cells {
        grid.set(addr, raw);
    }

    println!("{}", compute_formula(formula, &grid, options));
    Ok(())
}

fn recompute_grid(
    input: Option<&Path>,
    output: Option<&Path>,
    delimiter: char,
    show_stats: bool,
    options: EvaluationOptions,
) -> Result<()> {
    let delimiter = delimiter_byte(delimiter)?;

    let grid = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
            read_grid(file, delimiter)
                .with_context(|| format!("Failed to read CSV from '{}'", path.display()))?
        }
        None => read_grid(io::stdin().lock(), delimiter).context("Failed to read CSV from stdin")?,
    };

    let calculation = CalculationOptions {
        evaluation: options,
        ..CalculationOptions::default()
    };
    let (sheet, stats) = Sheet::new_with_stats(grid, calculation);

    if show_stats {
        eprintln!("{}", stats_line(&stats));
    }

    let rendered = render_grid(&sheet.display_grid(), delimiter)?;

    if let Some(output_path) = output {
        std::fs::write(output_path, &rendered)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!(
            "Wrote {} rows to '{}'",
            sheet.grid().row_count(),
            output_path.display()
        );
    } else {
        io::stdout()
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
    }

    Ok(())
}

fn stats_line(stats: &CalculationStats) -> String {
    format!(
        "Calculated {} formulas ({} errors, {} circular)",
        stats.cells_calculated, stats.errors, stats.circular_references
    )
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    Ok(delimiter as u8)
}

/// Read headerless CSV records into a grid; records may have differing lengths
fn read_grid(reader: impl Read, delimiter: u8) -> Result<Grid> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    tracing::debug!(rows = rows.len(), "read grid");
    Ok(Grid::from_rows(rows))
}

/// Write display rows as CSV, quoting fields only where needed
fn render_grid(rows: &[Vec<String>], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn list_functions() -> Result<()> {
    let mut functions: Vec<_> = function_registry().functions().collect();
    functions.sort_by_key(|def| def.name);

    let mut stdout = io::stdout().lock();
    for def in functions {
        let arity = match def.max_args {
            Some(max) if max == def.min_args => format!("{}", max),
            Some(max) => format!("{}..{}", def.min_args, max),
            None => format!("{}..", def.min_args),
        };
        let volatile = if def.volatile { " (volatile)" } else { "" };
        writeln!(
            stdout,
            "{}\t{}\t{}{}",
            def.name,
            arity,
            def.aliases.join(", "),
            volatile
        )?;
    }

    Ok(())
}
