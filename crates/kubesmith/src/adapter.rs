use std::collections::BTreeMap;
use std::sync::Arc;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SmithError;
use crate::model::{SemVer, Template, TemplateResource};

/// Initial data for a template being created through the store boundary.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemVer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TemplateResource>,
}

impl TemplateDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Materializes the draft into a template with a fresh id. Duplicate
    /// tags and duplicate resource keys in the draft are dropped silently,
    /// matching the aggregate's insert rules.
    pub fn into_template(self) -> Template {
        let mut template = Template::new(self.name);
        template.description = self.description;
        if let Some(version) = self.version {
            template.version = version;
        }
        for tag in &self.tags {
            template.add_tag(tag);
        }
        for resource in self.resources {
            template.add_resource(resource);
        }
        template
    }
}

/// Persistence boundary for templates. Implementations are keyed by
/// template id and must never interpret template contents.
pub trait TemplateStore: Send + Sync {
    fn create(&self, draft: TemplateDraft) -> Result<Template, SmithError>;
    fn save(&self, template: &Template) -> Result<(), SmithError>;
    fn get(&self, id: &str) -> Result<Option<Template>, SmithError>;
    fn get_all(&self) -> Result<Vec<Template>, SmithError>;
    fn search(&self, query: &str) -> Result<Vec<Template>, SmithError>;
    fn delete(&self, id: &str) -> Result<(), SmithError>;
}

impl<T> TemplateStore for Arc<T>
where
    T: TemplateStore + ?Sized,
{
    fn create(&self, draft: TemplateDraft) -> Result<Template, SmithError> {
        (**self).create(draft)
    }

    fn save(&self, template: &Template) -> Result<(), SmithError> {
        (**self).save(template)
    }

    fn get(&self, id: &str) -> Result<Option<Template>, SmithError> {
        (**self).get(id)
    }

    fn get_all(&self) -> Result<Vec<Template>, SmithError> {
        (**self).get_all()
    }

    fn search(&self, query: &str) -> Result<Vec<Template>, SmithError> {
        (**self).search(query)
    }

    fn delete(&self, id: &str) -> Result<(), SmithError> {
        (**self).delete(id)
    }
}

/// In-memory store for hosts and tests.
#[derive(Default)]
pub struct InMemoryStore {
    templates: Mutex<BTreeMap<String, Template>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for InMemoryStore {
    fn create(&self, draft: TemplateDraft) -> Result<Template, SmithError> {
        let template = draft.into_template();
        self.templates
            .lock()
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    fn save(&self, template: &Template) -> Result<(), SmithError> {
        self.templates
            .lock()
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Template>, SmithError> {
        Ok(self.templates.lock().get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Template>, SmithError> {
        Ok(self.templates.lock().values().cloned().collect())
    }

    fn search(&self, query: &str) -> Result<Vec<Template>, SmithError> {
        let all: Vec<Template> = self.templates.lock().values().cloned().collect();
        Ok(search_templates(all, query))
    }

    fn delete(&self, id: &str) -> Result<(), SmithError> {
        match self.templates.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(SmithError::Store(format!("template {id} does not exist"))),
        }
    }
}

/// Fuzzy ranking over name, description, and tags, best matches first. A
/// blank query returns everything unchanged.
pub(crate) fn search_templates(templates: Vec<Template>, query: &str) -> Vec<Template> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return templates;
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, Template)> = templates
        .into_iter()
        .filter_map(|template| {
            let mut haystack = template.name.clone();
            if let Some(description) = &template.description {
                haystack.push(' ');
                haystack.push_str(description);
            }
            for tag in &template.tags {
                haystack.push(' ');
                haystack.push_str(tag);
            }
            matcher
                .fuzzy_match(&haystack, trimmed)
                .map(|score| (score, template))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, template)| template).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_fresh_ids_and_round_trips() {
        let store = InMemoryStore::new();
        let created = store.create(TemplateDraft::named("edge-stack")).unwrap();
        assert!(!created.id.is_empty());

        let loaded = store.get(&created.id).unwrap().expect("stored");
        assert_eq!(loaded, created);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let store = InMemoryStore::new();
        let mut template = store.create(TemplateDraft::named("edge-stack")).unwrap();
        template.add_tag("web");
        store.save(&template).unwrap();

        let loaded = store.get(&template.id).unwrap().unwrap();
        assert_eq!(loaded.tags, ["web"]);
    }

    #[test]
    fn delete_removes_and_errors_on_unknown_id() {
        let store = InMemoryStore::new();
        let template = store.create(TemplateDraft::named("gone")).unwrap();
        store.delete(&template.id).unwrap();
        assert!(store.get(&template.id).unwrap().is_none());
        assert!(matches!(
            store.delete(&template.id),
            Err(SmithError::Store(_))
        ));
    }

    #[test]
    fn search_matches_tags_and_description() {
        let store = InMemoryStore::new();
        let mut draft = TemplateDraft::named("backend");
        draft.tags = vec!["postgres".into()];
        store.create(draft).unwrap();
        store.create(TemplateDraft::named("frontend")).unwrap();

        let hits = store.search("postgres").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "backend");
    }

    #[test]
    fn draft_resources_respect_duplicate_rejection() {
        let mut draft = TemplateDraft::named("dupes");
        draft.resources = vec![
            TemplateResource::new("Service", "v1"),
            TemplateResource::new("Service", "v1"),
        ];
        let template = draft.into_template();
        assert_eq!(template.resources.len(), 1);
    }
}
