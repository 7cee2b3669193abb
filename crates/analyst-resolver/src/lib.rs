//! Resolution layer for the analyst agent
//!
//! Converts the free-text parts of a plan (client names, group names,
//! regions, countries, business lines, date phrases) into canonical,
//! typed values, with fuzzy or semantic matching behind one strategy
//! seam. The knowledge base is loaded once and shared read-only.

pub mod dates;
pub mod entity;
pub mod kb;
pub mod matcher;
pub mod semantic;
pub mod vocab;

// Re-exports for convenience
pub use dates::{DateRangeResolver, NaturalDateParser};
pub use entity::EntityResolver;
pub use kb::{BusinessLines, KbError, KnowledgeBase};
pub use matcher::{FuzzyMatch, Match, MatchError, MatchStrategy, MATCH_THRESHOLD};
pub use semantic::{EmbeddingProvider, SemanticMatch};
pub use vocab::VocabResolver;
