mod client;
mod error;
pub mod suggest;
pub mod types;

pub use client::VisionClient;
pub use error::VisionError;
pub use types::{Analysis, ScoredLabel};
