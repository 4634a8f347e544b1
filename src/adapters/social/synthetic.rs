//! Synthetic social activity
//!
//! Generates plausible mention/engagement counts and templated posts per
//! platform. Trending tokens get enthusiastic posts, the rest get neutral ones,
//! so the keyword sentiment has something to score.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::Platform;
use crate::ports::{PlatformActivity, SocialDataPort, SocialError};

const TRENDING_TEMPLATES: &[&str] = &[
    "{t} is showing amazing potential right now!",
    "Huge partnership announcement coming for {t}",
    "{t} technical analysis looks incredibly bullish",
    "This could be the next moonshot: {t}",
    "{t} fundamentals are stronger than ever",
];

const QUIET_TEMPLATES: &[&str] = &[
    "{t} looks interesting, needs more research",
    "Keeping an eye on {t} development",
    "{t} market activity increasing",
    "New updates from {t} team",
    "{t} community growing steadily",
];

const POSTS_PER_PLATFORM: usize = 3;

#[derive(Debug, Clone)]
pub struct SyntheticSocialData {
    seed: u64,
    /// Probability that a token trends on a platform
    trending_probability: f64,
}

impl SyntheticSocialData {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            trending_probability: 0.2,
        }
    }

    fn rng_for(&self, platform: Platform, token_id: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        platform.hash(&mut hasher);
        token_id.hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }
}

#[async_trait]
impl SocialDataPort for SyntheticSocialData {
    async fn activity(
        &self,
        platform: Platform,
        token_id: &str,
    ) -> Result<PlatformActivity, SocialError> {
        let mut rng = self.rng_for(platform, token_id);

        let engagement: u64 = rng.gen_range(0..10_000);
        let mentions = (engagement as f64 * rng.gen_range(0.5..1.5)) as u64;
        let trending = rng.gen_bool(self.trending_probability);

        let templates = if trending {
            TRENDING_TEMPLATES
        } else {
            QUIET_TEMPLATES
        };
        let posts = templates
            .choose_multiple(&mut rng, POSTS_PER_PLATFORM)
            .map(|template| template.replace("{t}", token_id))
            .collect();

        Ok(PlatformActivity {
            mentions,
            engagement,
            trending,
            posts,
            prior_sentiment: Some(rng.gen_range(-0.5..0.5)),
        })
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
