pub mod api;
pub mod client;
pub mod config;
pub mod critique;
pub mod error;
pub mod llm;
pub mod page;

use std::sync::Arc;
use config::Config;
use error::Result;
use llm::LlmClient;
use page::PageFetcher;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: LlmClient,
    pub pages: PageFetcher,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let llm = LlmClient::new(&config)?;
        let pages = PageFetcher::new()?;
        Ok(AppState {
            config: Arc::new(config),
            llm,
            pages,
        })
    }
}
