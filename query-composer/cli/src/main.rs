//! Command line front end: extend, prune and shake query documents stored in files.
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use apollo_compiler::ast;
use clap::Parser;
use query_composer::ColumnSelection;
use query_composer::ExtendOptions;
use query_composer::Extender;
use query_composer::ListPruner;
use query_composer::PruneOptions;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// CLI arguments. See <https://docs.rs/clap/latest/clap/_derive/index.html>
#[derive(Parser)]
struct Args {
    /// Log level (off|error|warn|info|debug|trace), overridden by `RUST_LOG`.
    #[arg(long = "log", default_value = "warn", global = true)]
    log_level: String,

    /// YAML file holding `extend` and `prune` options.
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Grafts one or more extension documents onto a base query document
    Extend {
        /// The path to the base document, or `-` for stdin
        base: PathBuf,
        /// Paths to extension documents, applied in order
        #[arg(required = true)]
        extensions: Vec<PathBuf>,
    },
    /// Shrinks the items of a list query to the given columns
    Prune {
        /// The path to the list query document, or `-` for stdin
        document: PathBuf,
        /// The path to a JSON array of `{ "name": ..., "isCustomField": ... }` columns
        columns: PathBuf,
        /// Root field of the list query, overriding the configuration
        #[arg(long)]
        list_field: Option<String>,
    },
    /// Removes unused fragment and variable definitions
    Shake {
        /// The path to the document, or `-` for stdin
        document: PathBuf,
    },
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    extend: ExtendOptions,
    prune: PruneOptions,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or(args.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&env_filter).context("could not parse log level")?)
        .with_writer(io::stderr)
        .init();

    let config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let output = match args.command {
        Command::Extend { base, extensions } => extend(config.extend, &base, &extensions)?,
        Command::Prune {
            document,
            columns,
            list_field,
        } => {
            let mut options = config.prune;
            if list_field.is_some() {
                options.list_field = list_field;
            }
            prune(options, &document, &columns)?
        }
        Command::Shake { document } => query_composer::shake(&parse(&document)?),
    };
    println!("{}", output);
    Ok(())
}

fn extend(options: ExtendOptions, base: &Path, extensions: &[PathBuf]) -> Result<ast::Document> {
    let base = parse(base)?;
    let extender = Extender::new(options);
    extensions.iter().try_fold(base, |document, path| {
        let extension = read(path)?;
        extender
            .extend(&document, extension)
            .with_context(|| format!("could not apply extension {}", path.display()))
    })
}

fn prune(options: PruneOptions, document: &Path, columns: &Path) -> Result<ast::Document> {
    let document = parse(document)?;
    let columns: Vec<ColumnSelection> = serde_json::from_str(&read(columns)?)
        .with_context(|| format!("could not parse columns in {}", columns.display()))?;
    tracing::debug!(columns = columns.len(), "pruning list query");
    Ok(ListPruner::new(options).prune(&document, &columns))
}

fn load_config(path: &Path) -> Result<Config> {
    serde_yaml::from_str(&read(path)?)
        .with_context(|| format!("could not parse configuration {}", path.display()))
}

fn parse(path: &Path) -> Result<ast::Document> {
    let source = read(path)?;
    ast::Document::parse(source, path).map_err(|invalid| {
        anyhow::anyhow!(query_composer::ParseErrors::from(invalid))
            .context(format!("could not parse {}", path.display()))
    })
}

/// Reads a file, or stdin when the path is `-`.
fn read(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        io::read_to_string(io::stdin()).context("could not read stdin")
    } else {
        fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
    }
}
