use anyhow::Result;
use clap::{Parser, Subcommand};
use digfy::cache::{self, normalize_key, GraphCacheStore};
use digfy::relations::DeezerClient;
use digfy::{Config, CrawlLimits, DigfyError, GraphBuilder};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "digfy")]
#[command(about = "Build related-artist graphs from the Deezer API", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build (or load from cache) the graph around an artist and print it as JSON
    Build {
        /// Root artist name
        name: String,
        /// Deepest level to record (defaults to crawl.max_depth)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Node budget (defaults to crawl.max_nodes)
        #[arg(long)]
        max_nodes: Option<usize>,
        /// Pretty-print the document
        #[arg(long)]
        pretty: bool,
    },
    /// Remove the cached graph for an artist
    Evict {
        /// Root artist name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load()?;

    // Logs go to stderr; stdout carries the graph document
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.digfy.log_level.as_str()),
    )
    .init();

    let store = cache::open_store(&config).await?;

    match args.command {
        Command::Build {
            name,
            max_depth,
            max_nodes,
            pretty,
        } => run_build(&config, store, &name, max_depth, max_nodes, pretty).await,
        Command::Evict { name } => run_evict(store.as_ref(), &name).await,
    }
}

async fn run_build(
    config: &Config,
    store: Arc<dyn GraphCacheStore>,
    name: &str,
    max_depth: Option<usize>,
    max_nodes: Option<usize>,
    pretty: bool,
) -> Result<()> {
    let relations = Arc::new(DeezerClient::from_config(config)?);
    let builder =
        GraphBuilder::new(relations, store).with_related_limit(config.relations.related_limit);

    let defaults = config.crawl_limits();
    let limits = CrawlLimits {
        max_depth: max_depth.unwrap_or(defaults.max_depth),
        max_nodes: max_nodes.unwrap_or(defaults.max_nodes),
    };

    let result = match config.build_timeout() {
        Some(timeout) => builder.build_graph_within(name, limits, timeout).await,
        None => builder.build_graph(name, limits).await,
    };

    let document = match result {
        Ok(document) => document,
        Err(DigfyError::EntityNotFound(name)) => {
            anyhow::bail!("Artist not found: {}", name)
        }
        Err(e) => return Err(e.into()),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    println!("{}", json);

    Ok(())
}

async fn run_evict(store: &dyn GraphCacheStore, name: &str) -> Result<()> {
    let key = normalize_key(name);
    if store.evict(&key).await? {
        log::info!("Evicted cached graph '{}'", key);
    } else {
        log::info!("No cached graph for '{}'", key);
    }
    Ok(())
}
