//! Social Data Adapters
//!
//! Sources behind `SocialDataPort`. Only a seeded synthetic source ships;
//! real platform clients plug in behind the same trait.

mod synthetic;

pub use synthetic::SyntheticSocialData;
