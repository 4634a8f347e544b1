//! Domain Layer - Core types for the moonshot scanner
//!
//! Pure domain types and logic with no external I/O.
//! - `token`: enriched token metrics, social metrics, volume patterns
//! - `job`: scraping job lifecycle state machine
//! - `circuit_breaker`: upstream health gate for the discovery path

pub mod token;
pub mod job;
pub mod circuit_breaker;

pub use token::{
    clamp_score, ratio_or_zero, PatternKind, PatternMetrics, Platform, PlatformMetrics,
    RiskLevel, SocialMetrics, TechnicalIndicators, TokenMetrics, VolumePattern,
};
pub use job::{JobError, JobId, JobStatus, ScrapingJob};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerState,
    CircuitBreakerStatus,
};
