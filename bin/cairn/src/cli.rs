//! cairn CLI entry point.

use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use cairn_blockstore_api::{Blockstore, size_or_sentinel};
use cairn_cache::BlockCache;
use cairn_observability::LogArgs;
use cairn_primitives::{Block, Code, RAW, parse_cid};
use cairn_storage_redb::{RedbBlockstore, StoreArgs, StoreOptions};
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// cairn - content-addressed block store
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration (applies to all subcommands).
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Directory holding the block store.
    #[arg(long, default_value = ".")]
    datadir: PathBuf,

    /// Store basename; the engine file is `<datadir>/<name>.redb`.
    #[arg(long, default_value = "blocks")]
    name: String,

    /// Block store configuration.
    #[command(flatten)]
    store: StoreArgs,

    /// Read-through upstream configuration.
    #[command(flatten)]
    upstream: UpstreamArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Upstream store for read-through caching.
///
/// With an upstream configured the local store becomes a cache: reads fill it
/// from the upstream and writes are refused.
#[derive(Debug, Args)]
#[command(next_help_heading = "Upstream")]
struct UpstreamArgs {
    /// Directory of the upstream block store.
    #[arg(id = "upstream.datadir", long = "upstream.datadir")]
    datadir: Option<PathBuf>,

    /// Basename of the upstream block store.
    #[arg(id = "upstream.name", long = "upstream.name", default_value = "blocks")]
    name: String,
}

/// Available commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Store a file (stdin if omitted) as one block and print its CID.
    Put {
        /// File to store.
        path: Option<PathBuf>,

        /// Address the block with a CIDv1 (raw codec) instead of a CIDv0.
        #[arg(long)]
        raw: bool,
    },
    /// Write a block's payload to stdout.
    Get {
        /// CID of the block.
        cid: String,
    },
    /// Print whether a block is present.
    Has {
        /// CID of the block.
        cid: String,
    },
    /// Print a block's size in bytes, -1 if absent.
    Size {
        /// CID of the block.
        cid: String,
    },
    /// List every stored CID. Ctrl-C stops the listing.
    Ls,
    /// Print the local store's path and block count.
    Stat,
}

/// Open the configured stores and execute the command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let store = RedbBlockstore::open(&cli.datadir, &cli.name, &cli.store.options())
        .wrap_err("Failed to open block store")?;

    let Some(upstream_dir) = &cli.upstream.datadir else {
        let result = execute(&store, &store, &cli.command).await;
        store.close()?;
        store.closed().await;
        return result;
    };

    let upstream_options = StoreOptions {
        create_dir: false,
        ..StoreOptions::default()
    };
    let upstream = RedbBlockstore::open(upstream_dir, &cli.upstream.name, &upstream_options)
        .wrap_err("Failed to open upstream block store")?;
    let upstream = Arc::new(upstream);

    let cache = BlockCache::new(store, Some(Arc::clone(&upstream)));
    let result = execute(&cache, cache.store(), &cli.command).await;

    let store = cache.into_store();
    store.close()?;
    upstream.close()?;
    store.closed().await;
    upstream.closed().await;
    result
}

/// Run a command against `store`. `local` is the underlying persistent store.
async fn execute<B: Blockstore>(
    store: &B,
    local: &RedbBlockstore,
    command: &Command,
) -> Result<()> {
    match command {
        Command::Put { path, raw } => {
            let data = read_input(path.as_deref())?;
            let block = if *raw {
                Block::new_v1(RAW, Code::Sha2_256, data)
            } else {
                Block::new(data)
            };
            let cid = *block.cid();
            store.put(block).await?;
            println!("{cid}");
        }
        Command::Get { cid } => {
            let block = store.get(&parse_cid(cid)?).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(block.data())?;
            stdout.flush()?;
        }
        Command::Has { cid } => {
            println!("{}", store.has(&parse_cid(cid)?).await?);
        }
        Command::Size { cid } => {
            let size = size_or_sentinel(store.get_size(&parse_cid(cid)?).await)?;
            println!("{size}");
        }
        Command::Ls => {
            let cancel = CancellationToken::new();
            let ctrl_c = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                }
            });

            let mut keys = store.all_keys(cancel.clone()).await?;
            let mut count = 0usize;
            while let Some(cid) = keys.next().await {
                println!("{cid}");
                count += 1;
            }
            ctrl_c.abort();
            debug!(count, cancelled = cancel.is_cancelled(), "Listed blocks");
        }
        Command::Stat => {
            println!("path: {}", local.path().display());
            println!("blocks: {}", local.count().await?);
        }
    }
    Ok(())
}

/// Read a file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .wrap_err("Failed to read stdin")?;
            Ok(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_blockstore_api::BlockSource;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cairn").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_put() {
        let cli = parse(&["--datadir", "/tmp/x", "--name", "b", "put", "--raw", "file.bin"]);
        assert_eq!(cli.datadir, PathBuf::from("/tmp/x"));
        assert_eq!(cli.name, "b");
        assert!(cli.upstream.datadir.is_none());
        assert!(matches!(
            cli.command,
            Command::Put { raw: true, path: Some(ref p) } if p == Path::new("file.bin")
        ));
    }

    #[test]
    fn test_parse_upstream() {
        let cli = parse(&["--upstream.datadir", "/srv/origin", "--upstream.name", "origin", "ls"]);
        assert_eq!(cli.upstream.datadir, Some(PathBuf::from("/srv/origin")));
        assert_eq!(cli.upstream.name, "origin");
        assert!(matches!(cli.command, Command::Ls));
    }

    #[tokio::test]
    async fn test_put_then_read_through() {
        let origin_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let input = origin_dir.path().join("input.bin");
        std::fs::write(&input, b"cli payload").unwrap();

        let origin = parse(&[
            "--datadir",
            origin_dir.path().to_str().unwrap(),
            "put",
            input.to_str().unwrap(),
        ]);
        run(origin).await.unwrap();

        let block = Block::new(&b"cli payload"[..]);
        let cached = parse(&[
            "--datadir",
            cache_dir.path().to_str().unwrap(),
            "--upstream.datadir",
            origin_dir.path().to_str().unwrap(),
            "has",
            &block.cid().to_string(),
        ]);
        run(cached).await.unwrap();

        let local =
            RedbBlockstore::open(cache_dir.path(), "blocks", &StoreOptions::default()).unwrap();
        assert!(local.has(block.cid()).await.unwrap());
        local.close().unwrap();
    }

    #[tokio::test]
    async fn test_size_of_missing_block() {
        let dir = tempfile::tempdir().unwrap();
        let cid = Block::new(&b"absent"[..]).cid().to_string();
        let cli = parse(&["--datadir", dir.path().to_str().unwrap(), "size", &cid]);
        run(cli).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_refused_with_upstream() {
        let origin_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let input = cache_dir.path().join("input.bin");
        std::fs::write(&input, b"refused").unwrap();

        // Create the upstream store
        RedbBlockstore::open(origin_dir.path(), "blocks", &StoreOptions::default())
            .unwrap()
            .close()
            .unwrap();

        let cli = parse(&[
            "--datadir",
            cache_dir.path().to_str().unwrap(),
            "--upstream.datadir",
            origin_dir.path().to_str().unwrap(),
            "put",
            input.to_str().unwrap(),
        ]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
