mod config;

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use docmodel::path::{self, Condition};
use docmodel::schema::infer_schema_with_policy;
use docmodel::{Document, ExportOptions, Node, Object, Sampler, Strategy};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "docmodel",
    version,
    about = "Parse, inspect, edit and sample XML configuration files"
)]
struct Args {
    /// TOML file with [parse], [export], [schema] and [sample] defaults
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Raise log verbosity (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct Files {
    /// Input file (defaults to stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct Layout {
    /// Indent with tabs, one element per line
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,
    /// Single-line output
    #[arg(long)]
    compact: bool,
    /// Reorder top-level children by an attribute (`@id`) or field path
    #[arg(long, value_name = "FIELD")]
    sort_by: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the document tree of an XML file as JSON
    Parse {
        #[command(flatten)]
        files: Files,
    },
    /// Write a JSON document tree back out as XML
    Export {
        #[command(flatten)]
        files: Files,
        /// Tag of the document element
        #[arg(long, value_name = "TAG")]
        root_tag: String,
        #[command(flatten)]
        layout: Layout,
    },
    /// Infer a schema from the elements of the list at a path
    Schema {
        #[command(flatten)]
        files: Files,
        /// Path of the sample list, starting at the document tag
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
    },
    /// Print the subtree at a path as JSON
    Get {
        /// Path starting at the document tag, e.g. `Items.Item.0.@id`
        #[arg(value_name = "PATH")]
        path: String,
        #[command(flatten)]
        files: Files,
    },
    /// Assign a text value at a path and print the document
    Set {
        #[arg(value_name = "PATH")]
        path: String,
        #[arg(value_name = "VALUE")]
        value: String,
        #[command(flatten)]
        files: Files,
        #[command(flatten)]
        layout: Layout,
    },
    /// Remove the elements of a list that match every `--where` condition
    Delete {
        #[arg(value_name = "PATH")]
        path: String,
        /// `field=value`; `@name` fields compare attributes
        #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_condition)]
        conditions: Vec<(String, String)>,
        #[command(flatten)]
        files: Files,
        #[command(flatten)]
        layout: Layout,
    },
    /// Print a bounded, representative subset of the list at a path
    Sample {
        #[command(flatten)]
        files: Files,
        #[arg(long, value_name = "PATH")]
        path: String,
        /// Maximum number of elements to keep
        #[arg(long, value_name = "N")]
        max: Option<usize>,
        /// Maximum size in bytes of the kept elements
        #[arg(long, value_name = "BYTES")]
        max_bytes: Option<usize>,
        /// head, head_tail, uniform, random or diverse
        #[arg(long, value_name = "STRATEGY")]
        strategy: Option<Strategy>,
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
        #[command(flatten)]
        layout: Layout,
    },
}

fn parse_condition(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load_or_default(args.config.as_deref())?;
    run(args.command, &config)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Parse { files } => {
            let doc = read_document(&files, config)?;
            write_json(&files, &doc.root)
        }
        Command::Export {
            files,
            root_tag,
            layout,
        } => {
            let text = read_input(&files)?;
            let node: Node = serde_json::from_str(&text).context("input is not a document tree")?;
            let xml = docmodel::xml_export_with_options(&node, &root_tag, &export_options(&layout, config));
            write_output(&files, xml.as_bytes())
        }
        Command::Schema { files, path } => {
            let doc = read_document(&files, config)?;
            let tree = doc.into_tree();
            let target = resolve(&tree, path.as_deref().unwrap_or_default())?;
            let samples: Vec<Node> = target.iter_items().cloned().collect();
            let summary = infer_schema_with_policy(&samples, &config.schema);
            write_json(&files, &summary)
        }
        Command::Get { path, files } => {
            let tree = read_document(&files, config)?.into_tree();
            let node = resolve(&tree, &path)?;
            write_json(&files, &node)
        }
        Command::Set {
            path,
            value,
            files,
            layout,
        } => {
            let mut tree = read_document(&files, config)?.into_tree();
            if !path::set(&mut tree, &path, Node::scalar(value)) {
                bail!("cannot assign to path '{path}'");
            }
            write_tree(&files, &tree, &export_options(&layout, config))
        }
        Command::Delete {
            path,
            conditions,
            files,
            layout,
        } => {
            let mut tree = read_document(&files, config)?.into_tree();
            let condition: Condition = conditions.into_iter().collect();
            let removed = path::delete(&mut tree, &path, &condition)?;
            debug!(removed, "deleted elements");
            write_tree(&files, &tree, &export_options(&layout, config))
        }
        Command::Sample {
            files,
            path,
            max,
            max_bytes,
            strategy,
            seed,
            layout,
        } => {
            let doc = read_document(&files, config)?;
            let root_tag = doc.root_tag.clone();
            let tree = doc.into_tree();
            let items: Vec<Node> = resolve(&tree, &path)?.iter_items().cloned().collect();

            let strategy = strategy.unwrap_or(config.sample.strategy);
            let mut sampler = seed
                .or(config.sample.seed)
                .map_or_else(Sampler::from_entropy, Sampler::seeded);
            let picked = match max_bytes.or(config.sample.max_bytes) {
                Some(budget) => sampler.sample_within_bytes(&items, budget, strategy)?,
                None => sampler.sample(&items, max.unwrap_or(config.sample.max_items), strategy)?,
            };
            debug!(kept = picked.len(), of = items.len(), "sampled");

            let item_tag = path
                .rsplit('.')
                .find(|segment| !segment.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(docmodel::xml::LIST_ITEM_TAG);
            let mut selection = Object::new();
            for item in picked {
                selection.push_child(item_tag, item);
            }
            let xml = docmodel::xml_export_with_options(
                &Node::Object(selection),
                &root_tag,
                &export_options(&layout, config),
            );
            write_output(&files, xml.as_bytes())
        }
    }
}

fn export_options(layout: &Layout, config: &Config) -> ExportOptions {
    let mut options = config.export.clone();
    if layout.pretty {
        options.pretty = true;
    }
    if layout.compact {
        options.pretty = false;
    }
    if let Some(sort_by) = &layout.sort_by {
        options.sort_by = Some(sort_by.clone());
    }
    options
}

fn resolve<'a>(tree: &'a Node, path: &str) -> Result<std::borrow::Cow<'a, Node>> {
    path::get(tree, path).ok_or_else(|| anyhow!("path not found: {path}"))
}

fn read_document(files: &Files, config: &Config) -> Result<Document> {
    let text = read_input(files)?;
    docmodel::xml_parse_with_config(&text, config.parse).with_context(|| match &files.input {
        Some(path) => format!("failed to parse {}", path.display()),
        None => "failed to parse stdin".to_string(),
    })
}

/// Export a tree produced by `Document::into_tree` under its single tag
fn write_tree(files: &Files, tree: &Node, options: &ExportOptions) -> Result<()> {
    let (root_tag, root) = tree
        .as_object()
        .and_then(|object| object.children.first())
        .ok_or_else(|| anyhow!("document has no root element"))?;
    let xml = docmodel::xml_export_with_options(root, root_tag, options);
    write_output(files, xml.as_bytes())
}

fn write_json<T: serde::Serialize>(files: &Files, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    json.push('\n');
    write_output(files, json.as_bytes())
}

fn read_input(files: &Files) -> Result<String> {
    match &files.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            if buffer.trim().is_empty() {
                bail!("no input provided on stdin");
            }
            Ok(buffer)
        }
    }
}

fn write_output(files: &Files, data: &[u8]) -> Result<()> {
    match &files.output {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(data).context("failed to write stdout")?;
            Ok(())
        }
    }
}
