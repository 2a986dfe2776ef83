//! lightxl CLI - inspect and edit Excel workbooks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lightxl::prelude::*;
use lightxl::{keyed_table, CellError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lightxl")]
#[command(author, version, about = "Inspect and edit Excel workbooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sheets in a workbook
    Sheets {
        /// Input workbook (xlsx, xlsm)
        input: PathBuf,
    },

    /// Print a sheet as tab-separated values
    Dump {
        /// Input workbook
        input: PathBuf,

        /// Sheet name (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Print one cell
    Get {
        /// Input workbook
        input: PathBuf,

        /// Sheet name
        sheet: String,

        /// Cell label, e.g. B3
        cell: String,
    },

    /// Set one cell and save the workbook
    ///
    /// Values starting with `=` are stored as formulas, `TRUE`/`FALSE` as
    /// booleans, error codes such as `#N/A` as errors, and anything that
    /// parses as a number as a number.
    Set {
        /// Input workbook
        input: PathBuf,

        /// Sheet name
        sheet: String,

        /// Cell label, e.g. B3
        cell: String,

        /// New value
        value: String,

        /// Output file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a sheet as records keyed by its first column (or row)
    Keys {
        /// Input workbook
        input: PathBuf,

        /// Sheet name
        sheet: String,

        /// Records are columns keyed by a row instead of rows keyed by a column
        #[arg(short, long)]
        columns: bool,

        /// 1-based row or column holding the keys
        #[arg(short, long, default_value = "1")]
        line: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Dump { input, sheet } => dump(&input, sheet.as_deref()),
        Commands::Get { input, sheet, cell } => get(&input, &sheet, &cell),
        Commands::Set {
            input,
            sheet,
            cell,
            value,
            output,
        } => set(&input, &sheet, &cell, &value, output.as_deref()),
        Commands::Keys {
            input,
            sheet,
            columns,
            line,
        } => keys(&input, &sheet, columns, line),
    }
}

fn open(input: &Path) -> Result<Document> {
    Document::open(input).with_context(|| format!("Failed to open '{}'", input.display()))
}

fn list_sheets(input: &Path) -> Result<()> {
    let doc = open(input)?;

    for (i, sheet) in doc.workbook().sheets().enumerate() {
        let (rows, cols) = sheet.size();
        println!("{}\t{}\t{}x{}", i + 1, sheet.name(), rows, cols);
    }

    Ok(())
}

fn dump(input: &Path, sheet: Option<&str>) -> Result<()> {
    let doc = open(input)?;
    let workbook = doc.workbook();

    let sheet = match sheet {
        Some(name) => workbook
            .sheet(name)
            .with_context(|| format!("Sheet '{}' not found", name))?,
        None => workbook.sheet_at(0).context("Workbook has no sheets")?,
    };

    let mut out = io::stdout().lock();
    for row in sheet.rows() {
        let fields: Vec<String> = row.map(|v| escape_field(&v.to_string())).collect();
        writeln!(out, "{}", fields.join("\t")).context("Failed to write to stdout")?;
    }

    Ok(())
}

fn get(input: &Path, sheet: &str, cell: &str) -> Result<()> {
    let doc = open(input)?;
    let value = doc
        .workbook()
        .sheet(sheet)?
        .address(cell)
        .with_context(|| format!("Invalid cell '{}'", cell))?;

    match value.formula_text() {
        Some(formula) => println!("={}\t{}", formula, value),
        None => println!("{}", value),
    }

    Ok(())
}

fn set(input: &Path, sheet: &str, cell: &str, value: &str, output: Option<&Path>) -> Result<()> {
    let mut doc = open(input)?;
    let value = parse_value(value);

    doc.workbook_mut()
        .update_address(sheet, cell, value)
        .with_context(|| format!("Failed to set {}!{}", sheet, cell))?;

    let target = output.unwrap_or(input);
    doc.save(target)
        .with_context(|| format!("Failed to write '{}'", target.display()))?;
    eprintln!("Wrote '{}'", target.display());

    Ok(())
}

fn keys(input: &Path, sheet: &str, columns: bool, line: u32) -> Result<()> {
    if line == 0 {
        bail!("Key line numbers start at 1");
    }

    let doc = open(input)?;
    let ws = doc.workbook().sheet(sheet)?;

    let options = if columns {
        StructuredOptions::columns(line)
    } else {
        let col = u16::try_from(line).context("Key column out of range")?;
        StructuredOptions::rows(col)
    };
    let table = keyed_table(ws, &options)?;

    let mut out = io::stdout().lock();
    for (key, values) in &table.entries {
        let fields: Vec<String> = values.iter().map(|v| escape_field(&v.to_string())).collect();
        writeln!(out, "{}\t{}", escape_field(key), fields.join("\t"))
            .context("Failed to write to stdout")?;
    }

    Ok(())
}

/// Read a command-line value the way a user would type it into a cell
fn parse_value(raw: &str) -> CellValue {
    if let Some(formula) = raw.strip_prefix('=') {
        return CellValue::formula(formula, CachedValue::default());
    }
    if raw.eq_ignore_ascii_case("TRUE") {
        return CellValue::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("FALSE") {
        return CellValue::Boolean(false);
    }
    if let Some(error) = CellError::parse(raw) {
        return CellValue::Error(error);
    }
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::text(raw),
    }
}

/// Keep one record per output line
fn escape_field(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
