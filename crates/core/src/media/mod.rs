//! Media classification and the output format catalog.
//!
//! Classification looks at file content only. The catalog lists, per
//! category, the formats a file of that category can be converted to.

mod catalog;
mod category;
mod classifier;

pub use catalog::{is_supported, possible_formats};
pub use category::{MediaCategory, OutputFormat};
pub use classifier::{classify, classify_bytes, ContentClassifier, MagicClassifier};
