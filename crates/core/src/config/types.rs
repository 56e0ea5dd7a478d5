use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::converter::ConverterConfig;

/// Top-level configuration.
///
/// Every section and field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}
