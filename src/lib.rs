pub mod classifier;
pub mod error;
pub mod extractor;
pub mod learner;
pub mod patterns;
pub mod processor;
pub mod sink;
pub mod store;

pub use classifier::{classify, Bounds, ClassificationResult, Verdict};
pub use error::StoreError;
pub use extractor::{extract_score, header_section, Score};
pub use learner::{observe, LearnedHeaderSet};
pub use patterns::{PatternRegistry, ScorePattern, DEFAULT_REGISTRY};
pub use processor::MessageProcessor;
pub use sink::{LogSink, PresentationSink};
pub use store::{ConfigSnapshot, ConfigStore, InMemoryStore, StoredConfig, TomlFileStore};
