//! `folio render` command implementation.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use folio_cache::{Cache, MemoryCache};
use folio_config::{CliSettings, Config, StorageConfig};
use folio_storage::{AssetStore, FsAssetStore};
use folio_storage_s3::{S3AssetStore, S3Config};
use folio_viz::VizProcessor;

use crate::error::CliError;
use crate::output::Output;

/// Region used for S3-compatible endpoints when none is configured.
const DEFAULT_REGION: &str = "auto";

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to transform.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the result here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not upload diagrams; embed them inline.
    #[arg(long)]
    offline: bool,

    /// Object key prefix for stored diagrams (overrides config).
    #[arg(long, env = "FOLIO_KEY_PREFIX")]
    key_prefix: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            key_prefix: self.key_prefix.clone(),
            offline: self.offline.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let mut processor = VizProcessor::new()
            .with_memo(MemoryCache::new().bucket("viz"))
            .key_prefix(config.viz.key_prefix.clone());
        match build_store(&config.storage_resolved)? {
            Some(store) => processor = processor.with_store(store),
            None => output.info("No asset store configured, flow diagrams will be inlined"),
        }

        let document = std::fs::read_to_string(&self.file)?;
        let processed = processor.process_with_stats(&document);

        match &self.output {
            Some(path) => std::fs::write(path, &processed.content)?,
            None => std::io::stdout()
                .lock()
                .write_all(processed.content.as_bytes())?,
        }

        output.render_summary(&self.file, &processed.stats);
        Ok(())
    }
}

/// Create the asset store described by the configuration.
fn build_store(config: &StorageConfig) -> Result<Option<Arc<dyn AssetStore>>, CliError> {
    let store: Arc<dyn AssetStore> = match config {
        StorageConfig::None => return Ok(None),
        StorageConfig::Fs { dir, public_url } => {
            let store = FsAssetStore::new(dir.clone());
            match public_url {
                Some(url) => Arc::new(store.with_public_url(url.as_str())),
                None => Arc::new(store),
            }
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            public_url,
        } => Arc::new(S3AssetStore::new(S3Config {
            bucket: bucket.clone(),
            endpoint: endpoint.clone(),
            region: region.clone().unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            public_url: public_url.clone(),
        })?),
    };
    tracing::info!(backend = config.backend(), "Using asset store");
    Ok(Some(store))
}
