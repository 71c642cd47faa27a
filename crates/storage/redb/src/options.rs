//! Block store options and CLI arguments.

use clap::Args;
use serde::{Deserialize, Serialize};

/// Engine options for [`RedbBlockstore::open`](crate::RedbBlockstore::open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// redb page cache size in bytes. `None` keeps the redb default.
    pub cache_size_bytes: Option<usize>,
    /// Largest payload accepted by `put`. `None` means unlimited.
    pub max_value_size: Option<usize>,
    /// Create the store directory if it does not exist.
    pub create_dir: bool,
    /// Verify payloads against their CID on every read.
    pub hash_on_read: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_size_bytes: None,
            max_value_size: None,
            create_dir: true,
            hash_on_read: false,
        }
    }
}

/// Block store configuration arguments.
#[derive(Debug, Default, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Block Store")]
#[serde(default)]
pub struct StoreArgs {
    /// Page cache size in bytes.
    #[arg(long = "store.cache-size", value_name = "BYTES")]
    pub cache_size: Option<usize>,

    /// Maximum block payload size in bytes.
    #[arg(long = "store.max-value-size", value_name = "BYTES")]
    pub max_value_size: Option<usize>,

    /// Verify every block against its CID when it is read.
    #[arg(long = "store.hash-on-read")]
    pub hash_on_read: bool,
}

impl StoreArgs {
    /// Engine options for these arguments.
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            cache_size_bytes: self.cache_size,
            max_value_size: self.max_value_size,
            hash_on_read: self.hash_on_read,
            ..StoreOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        store: StoreArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.store.options(), StoreOptions::default());
    }

    #[test]
    fn test_flags() {
        let cli = TestCli::parse_from([
            "test",
            "--store.cache-size",
            "1048576",
            "--store.max-value-size",
            "4096",
            "--store.hash-on-read",
        ]);
        let options = cli.store.options();
        assert_eq!(options.cache_size_bytes, Some(1_048_576));
        assert_eq!(options.max_value_size, Some(4096));
        assert!(options.hash_on_read);
        assert!(options.create_dir);
    }
}
