pub mod artifacts;
pub mod dedup;
pub mod orchestrator;
pub mod writer;

pub use artifacts::{NewsArtifact, NewsIndex, PriceArtifact, PriceIndex};
pub use dedup::{DedupCache, DedupDecision};
pub use orchestrator::{DataKind, NewsPipeline, PricePipeline, RunSummary, SymbolOutcome};
pub use writer::ArtifactStore;
