use serde::{Deserialize, Serialize};

/// A user-added classification rule consulted by `Classifier` after the
/// built-in tables miss (spec §4.1, §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    pub category: Vec<String>,
}
