//! Application Layer - Discovery and scoring runs
//!
//! - `discovery`: multi-source token discovery behind a circuit breaker
//! - `social_aggregator`: rate-limited, cached per-platform social metrics
//! - `pipeline`: per-token enrichment and scoring
//! - `job_manager`: job lifecycle, bounded fan-out and ranked results

pub mod discovery;
pub mod social_aggregator;
pub mod pipeline;
pub mod job_manager;

pub use discovery::{DiscoveryConfig, DiscoveryError, TokenDiscovery};
pub use social_aggregator::{SocialAggregator, SocialConfig};
pub use pipeline::{PipelineError, TokenPipeline};
pub use job_manager::{results_key, JobConfig, JobManager};
