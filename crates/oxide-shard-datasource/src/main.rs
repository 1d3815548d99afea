//! oxide-shard CLI
//!
//! Inspects a topology file: where a key lands, every destination, whether
//! the file is consistent and whether every master answers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use oxide_shard_core::expr::Op;
use oxide_shard_core::sharding::{Hash, Request};
use oxide_shard_core::{Context, Query, ShardingAlgorithm, SqlValue};
use oxide_shard_datasource::{DataSource, SqlxDataSource, TopologyConfig};

/// Routing and connectivity checks for sharded MySQL topologies.
#[derive(Parser)]
#[command(name = "oxide-shard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Topology file (JSON).
    #[arg(short, long, env = "OXIDE_SHARD_CONFIG", default_value = "topology.json")]
    config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the destination of a sharding key value.
    Route {
        /// Sharding key value.
        #[arg(long, allow_negative_numbers = true)]
        value: i64,
    },

    /// Print every destination of the sharding algorithm.
    Broadcast,

    /// Validate the topology file.
    CheckConfig,

    /// Run `SELECT 1` on every master.
    Ping {
        /// Per-database timeout in seconds.
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
}

fn algorithm(cfg: &TopologyConfig) -> anyhow::Result<&Hash> {
    cfg.sharding
        .as_ref()
        .context("the topology file has no `sharding` section")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cfg = TopologyConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let ctx = Context::new();

    match cli.command {
        Commands::Route { value } => {
            let hash = algorithm(&cfg)?;
            let request = Request::new(Op::Eq, &hash.sharding_key, SqlValue::Int(value));
            for dst in hash.sharding(&ctx, &request)?.destinations {
                println!("{dst}");
            }
        }

        Commands::Broadcast => {
            let hash = algorithm(&cfg)?;
            let all = hash.broadcast(&ctx);
            info!(destinations = all.len(), "broadcast");
            for dst in all {
                println!("{dst}");
            }
        }

        Commands::CheckConfig => {
            cfg.validate()?;
            let databases: usize = cfg.datasources.values().map(|ds| ds.databases.len()).sum();
            println!(
                "ok: {} datasources, {databases} databases",
                cfg.datasources.len()
            );
        }

        Commands::Ping { timeout } => {
            cfg.validate()?;
            let mut failed = 0usize;
            for (ds, ds_cfg) in &cfg.datasources {
                for (db, db_cfg) in &ds_cfg.databases {
                    let source = SqlxDataSource::connect_lazy(&db_cfg.master, 1)?;
                    let ctx = Context::new().with_timeout(Duration::from_secs(timeout));
                    let ping = Query::new(String::from("SELECT 1"), vec![]);
                    match source.query(&ctx, &ping).await {
                        Ok(_) => println!(" [ok] {ds}/{db}"),
                        Err(err) => {
                            warn!(datasource = %ds, database = %db, error = %err, "ping failed");
                            println!(" [!!] {ds}/{db}: {err}");
                            failed += 1;
                        }
                    }
                    source.close().await?;
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} database(s) unreachable");
            }
        }
    }

    Ok(())
}
