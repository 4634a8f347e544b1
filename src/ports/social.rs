//! Social data port
//!
//! Raw per-platform activity for a token. Sentiment and virality are derived
//! by the aggregator, so sources only report counts and post text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Platform;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SocialError {
    #[error("{platform} source error: {message}")]
    Source { platform: Platform, message: String },

    #[error("{0} source unavailable")]
    Unavailable(Platform),
}

/// Raw activity reported by one platform
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlatformActivity {
    pub mentions: u64,
    pub engagement: u64,
    pub trending: bool,
    /// Recent post text
    pub posts: Vec<String>,
    /// Sentiment 24 hours ago, when the source tracks it
    pub prior_sentiment: Option<f64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialDataPort: Send + Sync {
    async fn activity(
        &self,
        platform: Platform,
        token_id: &str,
    ) -> Result<PlatformActivity, SocialError>;

    fn name(&self) -> &'static str;
}
