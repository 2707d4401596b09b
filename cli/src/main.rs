use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mongo2elastic_core::sync::index_settings;
use mongo2elastic_core::{convert, ConvertOptions};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "mongo2elastic")]
#[command(about = "Convert a MongoDB $jsonSchema into an Elasticsearch index mapping")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a $jsonSchema file to an Elasticsearch mapping
    Convert {
        /// Input $jsonSchema file
        input: PathBuf,

        /// Conversion options file (omit, rename, overrides, passthrough)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Omit a field path (repeatable, added to the options file's list)
        #[arg(long = "omit", value_name = "PATH")]
        omit: Vec<String>,

        /// Output mapping file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print index settings with ignore_malformed enabled
    Settings {
        /// Custom settings file, deep-merged over the defaults
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Output settings file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            options,
            omit,
            output,
            format,
        } => {
            let schema: Value = read_json(&input, "schema")?;
            let mut options: ConvertOptions = match options {
                Some(path) => read_json(&path, "options")?,
                None => ConvertOptions::default(),
            };
            options.omit.extend(omit);

            let mapping = convert(&schema, &options).map_err(|e| {
                let code = e.error_code();
                anyhow::Error::from(e).context(format!("Conversion failed ({code:?})"))
            })?;

            write_json(&mapping, output.as_ref(), format)?;
        }
        Commands::Settings {
            settings,
            output,
            format,
        } => {
            let custom: Value = match settings {
                Some(path) => read_json(&path, "settings")?,
                None => Value::Null,
            };
            write_json(&index_settings(custom), output.as_ref(), format)?;
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
