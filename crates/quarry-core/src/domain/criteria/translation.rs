//! Label translation of criteria trees
//!
//! Turns `emf:createdBy set_to emf:42` into something a person can read by
//! swapping identifiers for labels from a [`LabelSource`]. Base labels are
//! loaded once per translator, concurrent first callers share the same load.
//! Instance titles are cached and only unknown ones are requested.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::entity::{CRITERIA_TYPES_RULE_FIELD, Condition, Junction, Rule, RuleValue, rule_type};
use super::render::{CriteriaRenderer, RenderOptions};
use super::walker::{RuleVisitor, collect_rules, walk_mut};
use crate::error::Result;

/// Identifier to label lookup
pub type Labels = HashMap<String, String>;

/// Provider of display labels, usually backed by remote services
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Searchable property labels by field
    async fn property_labels(&self) -> Result<Labels>;

    async fn operator_labels(&self) -> Result<Labels>;

    /// Junction labels keyed `AND` and `OR`
    async fn junction_labels(&self) -> Result<Labels>;

    /// Object type (model) labels by type identifier
    async fn model_labels(&self) -> Result<Labels>;

    async fn codelist_labels(&self) -> Result<Labels>;

    /// Titles of the given instances; unknown ids may be left out
    async fn instance_titles(&self, ids: &[String]) -> Result<Labels>;
}

/// Labels that do not depend on the translated tree
#[derive(Debug, Clone, Default)]
pub struct BaseLabels {
    pub properties: Labels,
    pub operators: Labels,
    pub junctions: Labels,
    pub models: Labels,
    pub codelists: Labels,
}

impl BaseLabels {
    pub fn junction(&self, junction: Junction) -> String {
        self.junctions
            .get(junction.as_str())
            .cloned()
            .unwrap_or_else(|| junction.as_str().to_string())
    }
}

/// Translates criteria trees, caching labels for its own lifetime
pub struct CriteriaTranslator {
    source: Arc<dyn LabelSource>,
    base: OnceCell<BaseLabels>,
    titles: RwLock<Labels>,
}

impl std::fmt::Debug for CriteriaTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaTranslator")
            .field("base_loaded", &self.base.initialized())
            .finish_non_exhaustive()
    }
}

impl CriteriaTranslator {
    pub fn new(source: Arc<dyn LabelSource>) -> Self {
        Self {
            source,
            base: OnceCell::new(),
            titles: RwLock::new(Labels::new()),
        }
    }

    /// Base labels, loading them on first use
    ///
    /// A failed load is not cached; the next call tries again.
    pub async fn base_labels(&self) -> Result<&BaseLabels> {
        self.base
            .get_or_try_init(|| async {
                let (properties, operators, junctions, models, codelists) = futures_util::try_join!(
                    self.source.property_labels(),
                    self.source.operator_labels(),
                    self.source.junction_labels(),
                    self.source.model_labels(),
                    self.source.codelist_labels(),
                )?;
                info!(
                    properties = properties.len(),
                    models = models.len(),
                    codelists = codelists.len(),
                    "Loaded base labels"
                );
                Ok(BaseLabels {
                    properties,
                    operators,
                    junctions,
                    models,
                    codelists,
                })
            })
            .await
    }

    /// Fetch titles for object values of `tree` not cached yet
    async fn load_titles(&self, tree: &Condition) -> Result<()> {
        let wanted: Vec<String> = collect_rules(tree)
            .into_iter()
            .filter(|rule| rule.rule_type == rule_type::OBJECT)
            .flat_map(|rule| rule.value.values())
            .map(str::to_string)
            .collect();

        let missing: Vec<String> = {
            let cached = self.titles.read().await;
            let mut missing: Vec<String> = wanted
                .into_iter()
                .filter(|id| !cached.contains_key(id))
                .collect();
            missing.sort();
            missing.dedup();
            missing
        };
        if missing.is_empty() {
            return Ok(());
        }

        let loaded = self.source.instance_titles(&missing).await?;
        debug!(requested = missing.len(), loaded = loaded.len(), "Loaded instance titles");
        self.titles.write().await.extend(loaded);
        Ok(())
    }

    /// Translated copy of `tree`; the original is left as is
    pub async fn translate(&self, tree: &Condition) -> Result<Condition> {
        let base = self.base_labels().await?;
        self.load_titles(tree).await?;
        let titles = self.titles.read().await;

        let mut translated = tree.clone();
        walk_mut(
            &mut translated,
            &mut RuleVisitor(|rule: &mut Rule| translate_rule(rule, base, &titles)),
        );
        Ok(translated)
    }

    /// Translate `tree` and render it with translated junction labels
    pub async fn translate_and_render(
        &self,
        tree: &Condition,
        options: &RenderOptions,
    ) -> Result<String> {
        let translated = self.translate(tree).await?;
        let base = self.base_labels().await?;
        let renderer = CriteriaRenderer::new(options.clone())
            .with_junction_labels(base.junction(Junction::And), base.junction(Junction::Or));
        Ok(renderer.render(&translated))
    }
}

fn translate_rule(rule: &mut Rule, base: &BaseLabels, titles: &Labels) {
    let value_labels: Option<Vec<&Labels>> = if rule.field == CRITERIA_TYPES_RULE_FIELD {
        Some(vec![&base.models])
    } else if rule.rule_type == rule_type::OBJECT {
        Some(vec![titles, &base.models])
    } else if rule.rule_type == rule_type::CODE_LIST {
        Some(vec![&base.codelists])
    } else {
        None
    };

    if let Some(sources) = value_labels {
        let label_of = |value: &str| {
            sources
                .iter()
                .find_map(|labels| labels.get(value))
                .cloned()
                .unwrap_or_else(|| value.to_string())
        };
        rule.value = match &rule.value {
            RuleValue::List(values) => {
                RuleValue::List(values.iter().map(|v| label_of(v.as_str())).collect())
            }
            RuleValue::Text(text) if text.is_empty() => RuleValue::Text(String::new()),
            RuleValue::Text(text) => RuleValue::Text(label_of(text)),
        };
    }

    if let Some(label) = base.properties.get(&rule.field) {
        rule.field = label.clone();
    }
    if let Some(label) = base.operators.get(&rule.operator) {
        rule.operator = label.clone();
    }
}
