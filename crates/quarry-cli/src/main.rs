//! Quarry CLI - build, inspect and encode search criteria trees

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use quarry_core::config::Config;
use quarry_core::domain::criteria::{
    BasicCriteriaMapping, Condition, CriteriaFactory, CriteriaNode, RenderFormat, SearchRequest,
    SearchTreeParams, can_render_in_basic_form, convert_advanced_to_basic, decode_search_tree,
    encode_search_tree, is_criteria_empty, sanitize_search_tree, stringify_criteria,
};
use serde_json::json;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(
    author,
    version,
    about = "Search criteria trees from the command line",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a criteria tree from search parameters
    Build {
        /// Object type to search for (repeatable)
        #[arg(short, long = "object-type")]
        object_type: Vec<String>,
        /// Free text query
        #[arg(short = 't', long)]
        free_text: Option<String>,
        /// Context instance the results must relate to (repeatable)
        #[arg(short, long)]
        context: Vec<String>,
        /// JSON file with a restriction node merged at root level
        #[arg(short, long)]
        restrictions: Option<PathBuf>,
        /// Print the search request payload instead of the bare tree
        #[arg(long)]
        request: bool,
    },

    /// Render a criteria tree as readable text
    Render {
        /// Criteria JSON file, `-` for stdin
        file: PathBuf,
        /// One item per line
        #[arg(short, long)]
        beautify: bool,
        /// Spaces per nesting level
        #[arg(short, long)]
        indent: Option<usize>,
        /// plain, ansi or html
        #[arg(long)]
        render_format: Option<String>,
    },

    /// Strip transient attributes from a criteria tree
    Sanitize {
        /// Criteria JSON file, `-` for stdin
        file: PathBuf,
    },

    /// Encode a criteria tree for links
    Encode {
        /// Criteria JSON file, `-` for stdin
        file: PathBuf,
    },

    /// Decode a criteria tree from its link form
    Decode {
        /// Encoded tree
        text: String,
    },

    /// Show the basic search projection of a criteria tree
    Basic {
        /// Criteria JSON file, `-` for stdin
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("quarry=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            object_type,
            free_text,
            context,
            restrictions,
            request,
        } => cmd_build(
            BuildArgs {
                object_type,
                free_text,
                context,
                restrictions,
                request,
            },
            cli.format,
        ),
        Commands::Render {
            file,
            beautify,
            indent,
            render_format,
        } => cmd_render(&file, beautify, indent, render_format.as_deref(), cli.format),
        Commands::Sanitize { file } => cmd_sanitize(&file),
        Commands::Encode { file } => cmd_encode(&file, cli.format),
        Commands::Decode { text } => cmd_decode(&text),
        Commands::Basic { file } => cmd_basic(&file, cli.format),
        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

// ============================================================================
// Input / Output
// ============================================================================

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Failed to read criteria from stdin")?;
        return Ok(contents);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read criteria file: {}", path.display()))
}

fn read_tree(path: &Path) -> anyhow::Result<Condition> {
    let contents = read_input(path)?;
    let tree: Condition = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid criteria tree in {}", path.display()))?;
    debug!(root = %tree.id, "Loaded criteria tree");
    Ok(tree)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

struct BuildArgs {
    object_type: Vec<String>,
    free_text: Option<String>,
    context: Vec<String>,
    restrictions: Option<PathBuf>,
    request: bool,
}

fn cmd_build(args: BuildArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let factory = CriteriaFactory::default();

    let mut params = SearchTreeParams::new().with_root_condition(config.search.root_junction()?);
    if !args.object_type.is_empty() {
        params = params.with_object_type(args.object_type);
    }
    if let Some(free_text) = args.free_text {
        params = params.with_free_text(free_text);
    }
    if !args.context.is_empty() {
        params = params.with_context(args.context);
    }
    if let Some(path) = &args.restrictions {
        let node: CriteriaNode = serde_json::from_str(&read_input(path)?)
            .with_context(|| format!("Invalid restriction node in {}", path.display()))?;
        params = params.with_restrictions(node);
    }

    let tree = factory.build_search_tree(params);
    info!(root = %tree.id, empty = is_criteria_empty(&tree), "Built criteria tree");

    if args.request {
        let request = SearchRequest::new(
            &tree,
            config.search.arguments(),
            config.search.mode()?,
            None,
        );
        return print_json(&request);
    }

    match format {
        OutputFormat::Json => print_json(&tree),
        OutputFormat::Text => {
            print_json(&tree)?;
            println!();
            println!("{}", stringify_criteria(&tree, &config.render.options()?));
            Ok(())
        }
    }
}

fn cmd_render(
    file: &Path,
    beautify: bool,
    indent: Option<usize>,
    render_format: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let tree = read_tree(file)?;

    let mut options = config.render.options()?;
    if beautify {
        options = options.with_beautify(true);
    }
    if let Some(indent) = indent {
        options = options.with_indent_width(indent);
    }
    if let Some(name) = render_format {
        let parsed = RenderFormat::parse(name).ok_or_else(|| {
            anyhow::anyhow!("Invalid render format: {}. Valid options: plain, ansi, html", name)
        })?;
        options = options.with_format(parsed);
    }

    let text = stringify_criteria(&tree, &options);
    match format {
        OutputFormat::Json => {
            print_json(&json!({ "text": text, "format": options.format.as_str() }))
        }
        OutputFormat::Text => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn cmd_sanitize(file: &Path) -> anyhow::Result<()> {
    let tree = read_tree(file)?;
    print_json(&sanitize_search_tree(&tree))
}

fn cmd_encode(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let tree = read_tree(file)?;
    let encoded = encode_search_tree(&tree)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "encoded": encoded })),
        OutputFormat::Text => {
            println!("{}", encoded);
            Ok(())
        }
    }
}

fn cmd_decode(text: &str) -> anyhow::Result<()> {
    let tree = decode_search_tree(text).map_err(|err| {
        let hint = err
            .suggestion()
            .map(|s| format!(" (try: {})", s))
            .unwrap_or_default();
        anyhow::anyhow!("[{}] {}{}", err.code(), err, hint)
    })?;
    print_json(&tree)
}

fn cmd_basic(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let tree = read_tree(file)?;
    let mut mapping = BasicCriteriaMapping::default();
    convert_advanced_to_basic(&mut mapping, &tree);
    let renderable = can_render_in_basic_form(&tree);

    match format {
        OutputFormat::Json => print_json(&json!({
            "renderable": renderable,
            "mapping": mapping,
        })),
        OutputFormat::Text => {
            for (basic, criterion) in mapping.iter() {
                println!("{} = {}", basic.key(), criterion.value.values().join(", "));
            }
            println!("hidden = {}", mapping.hidden.len());
            println!(
                "basic form: {}",
                if renderable { "supported" } else { "not supported" }
            );
            Ok(())
        }
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, config.get(&key)?);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod main_tests;
