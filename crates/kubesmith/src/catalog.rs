use std::sync::Arc;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SmithError;

const BUILTIN_KINDS: &str = include_str!("assets/kinds.yaml");

/// One resource kind offered by the catalog. The core treats descriptors as
/// opaque candidates and keys resources on `kind`/`api_version` alone.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KindDescriptor {
    pub kind: String,
    pub api_version: String,
    pub group: String,
    #[serde(default)]
    pub template_type: String,
}

/// Lookup surface for the schema catalog consumed when adding a resource to
/// a template.
pub trait SchemaCatalog: Send + Sync {
    fn available_kinds(&self) -> Result<Vec<KindDescriptor>, SmithError>;

    /// Fuzzy search over the kind inventory, best matches first.
    fn search_resources(&self, query: &str) -> Result<Vec<KindDescriptor>, SmithError>;
}

impl<T> SchemaCatalog for Arc<T>
where
    T: SchemaCatalog + ?Sized,
{
    fn available_kinds(&self) -> Result<Vec<KindDescriptor>, SmithError> {
        (**self).available_kinds()
    }

    fn search_resources(&self, query: &str) -> Result<Vec<KindDescriptor>, SmithError> {
        (**self).search_resources(query)
    }
}

#[derive(Deserialize)]
struct KindInventory {
    kinds: Vec<KindDescriptor>,
}

/// Catalog backed by a fixed kind inventory. The builtin inventory covers
/// the core workload, config, network, storage, and RBAC kinds.
pub struct StaticCatalog {
    kinds: Vec<KindDescriptor>,
}

impl StaticCatalog {
    pub fn new(kinds: Vec<KindDescriptor>) -> Self {
        Self { kinds }
    }

    pub fn builtin() -> Result<Self, SmithError> {
        let inventory: KindInventory = serde_yaml::from_str(BUILTIN_KINDS)
            .map_err(|err| SmithError::Catalog(format!("invalid builtin kind inventory: {err}")))?;
        Ok(Self::new(inventory.kinds))
    }
}

impl SchemaCatalog for StaticCatalog {
    fn available_kinds(&self) -> Result<Vec<KindDescriptor>, SmithError> {
        Ok(self.kinds.clone())
    }

    fn search_resources(&self, query: &str) -> Result<Vec<KindDescriptor>, SmithError> {
        Ok(rank_kinds(&self.kinds, query))
    }
}

/// Scores each descriptor against the query over `kind` and `group`,
/// returning matches ranked best-first. A blank query returns everything in
/// inventory order.
pub(crate) fn rank_kinds(kinds: &[KindDescriptor], query: &str) -> Vec<KindDescriptor> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return kinds.to_vec();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, &KindDescriptor)> = kinds
        .iter()
        .filter_map(|descriptor| {
            let haystack = format!("{} {}", descriptor.kind, descriptor.group);
            matcher
                .fuzzy_match(&haystack, trimmed)
                .map(|score| (score, descriptor))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .map(|(_, descriptor)| descriptor.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_inventory_parses_and_contains_core_kinds() {
        let catalog = StaticCatalog::builtin().unwrap();
        let kinds = catalog.available_kinds().unwrap();
        assert!(kinds.len() >= 20);
        assert!(
            kinds
                .iter()
                .any(|k| k.kind == "Deployment" && k.api_version == "apps/v1")
        );
        assert!(kinds.iter().any(|k| k.kind == "Service" && k.api_version == "v1"));
    }

    #[test]
    fn fuzzy_search_ranks_deployment_first_for_deploy() {
        let catalog = StaticCatalog::builtin().unwrap();
        let results = catalog.search_resources("deploy").unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].kind, "Deployment");
    }

    #[test]
    fn blank_query_returns_full_inventory() {
        let catalog = StaticCatalog::builtin().unwrap();
        let all = catalog.available_kinds().unwrap();
        let results = catalog.search_resources("   ").unwrap();
        assert_eq!(results, all);
    }

    #[test]
    fn unmatched_query_returns_nothing() {
        let catalog = StaticCatalog::builtin().unwrap();
        let results = catalog.search_resources("zzzzqqqq").unwrap();
        assert!(results.is_empty());
    }
}
