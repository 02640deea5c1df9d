use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::corpus::Corpus;
use crate::encoder::{ConfigBackendFactory, EncoderRegistry};

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub corpus: Arc<Corpus>,
    pub registry: Arc<EncoderRegistry>,
}

impl AppState {
    /// Load the corpus and set up the encoder registry. Backends themselves
    /// are constructed lazily on first request.
    pub fn new(config: Config) -> Result<Self> {
        let corpus = Arc::new(
            Corpus::load(&config.corpus_path())
                .with_context(|| "Failed to load verse corpus")?,
        );
        if corpus.is_empty() {
            anyhow::bail!("Corpus {} is empty", config.corpus_path().display());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        let factory = ConfigBackendFactory::new(config.clone(), corpus.clone(), client);
        let registry = Arc::new(EncoderRegistry::new(Box::new(factory)));

        Ok(Self {
            config: Arc::new(config),
            corpus,
            registry,
        })
    }
}
