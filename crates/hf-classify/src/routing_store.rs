use std::path::{Path, PathBuf};
use std::sync::RwLock;

use hf_errors::StorageError;
use hf_types::RoutingRule;
use tracing::instrument;

/// Durable store of user-added classification rules (spec §6:
/// `metadata/routing_rules.json`). Consulted by [`crate::classify`] only
/// after both built-in tables miss.
pub struct RoutingRulesStore {
    path: PathBuf,
    rules: RwLock<Vec<RoutingRule>>,
}

impl RoutingRulesStore {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let rules = hf_fs::read_json::<Vec<RoutingRule>>(&path)
            .await?
            .unwrap_or_default();
        Ok(Self {
            path,
            rules: RwLock::new(rules),
        })
    }

    #[instrument(skip(self))]
    pub async fn add_rule(&self, rule: RoutingRule) -> Result<(), StorageError> {
        let snapshot = {
            let mut rules = self.rules.write().expect("routing rules lock poisoned");
            rules.push(rule);
            rules.clone()
        };
        hf_fs::write_json_atomic(&self.path, &snapshot).await
    }

    pub fn resolve(&self, mime_type: &str, extension: Option<&str>) -> Option<Vec<String>> {
        let rules = self.rules.read().expect("routing rules lock poisoned");
        rules
            .iter()
            .find(|r| r.mime_type.as_deref() == Some(mime_type))
            .or_else(|| {
                extension.and_then(|ext| {
                    rules
                        .iter()
                        .find(|r| r.extension.as_deref() == Some(ext))
                })
            })
            .map(|r| r.category.clone())
    }

    pub fn list(&self) -> Vec<RoutingRule> {
        self.rules.read().expect("routing rules lock poisoned").clone()
    }
}
