//! Quarry Core Integration Tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quarry_core::{
    Error, Result,
    domain::criteria::{
        BasicCriteriaMapping, BasicField, BasicSearchSync, Condition, CriteriaFactory,
        CriteriaNode, CriteriaTranslator, Junction, LabelSource, Labels, QueryBuilder,
        RenderOptions, Rule, RuleValue, SearchMediator, SearchOutcome, SearchRequest,
        SearchResponse, SearchService, SearchTreeParams, SequentialIdGenerator,
        assign_restrictions, convert_advanced_to_basic, convert_basic_to_advanced,
        decode_search_tree, encode_search_tree, is_criteria_empty, is_criteria_topmost,
        rule_values_by_field, stringify_criteria,
        walker::{RuleVisitor, collect_rules, walk},
    },
    domain::events::InMemoryEventStore,
};

fn factory() -> CriteriaFactory {
    CriteriaFactory::new(Arc::new(SequentialIdGenerator::new("it")))
}

fn rule_values(tree: &Condition) -> Vec<(String, RuleValue)> {
    collect_rules(tree)
        .into_iter()
        .map(|rule| (rule.field.clone(), rule.value.clone()))
        .collect()
}

#[test]
fn test_round_trip_idempotence() {
    let factory = factory();
    let mut tree = factory.build_search_tree(
        SearchTreeParams::new()
            .with_object_type(vec!["emf:Case", "emf:Document"])
            .with_free_text("quarterly")
            .with_context("emf:project-7"),
    );
    let before = rule_values(&tree);

    let mut mapping = BasicCriteriaMapping::default();
    convert_advanced_to_basic(&mut mapping, &tree);
    convert_basic_to_advanced(&factory, &mapping, &mut tree);

    assert_eq!(rule_values(&tree), before);
}

#[test]
fn test_emptiness_of_built_trees() {
    let factory = factory();
    assert!(is_criteria_empty(&factory.build_search_tree(SearchTreeParams::new())));
    assert!(!is_criteria_empty(
        &factory.build_search_tree(SearchTreeParams::new().with_free_text("x"))
    ));
}

#[test]
fn test_default_shape() {
    let tree = factory().default_advanced_tree(None);
    assert_eq!(tree.condition, Junction::Or);
    assert_eq!(tree.rules.len(), 1);
    let child = tree.rules[0].as_condition().unwrap();
    assert_eq!(child.condition, Junction::And);
    assert!(child.rules.is_empty());
}

#[test]
fn test_add_then_remove_restores_condition() {
    let factory = factory();
    let mut builder = QueryBuilder::new(factory.clone());
    let tree = factory.build_search_tree(SearchTreeParams::new().with_object_type("emf:Case"));
    builder.init(Some(tree));

    let parent = builder.primary_group_id().cloned().unwrap();
    let before = builder.primary_group().unwrap().rules.clone();

    let rule = factory.build_rule("title", "", "contains", "draft");
    let rule_id = rule.id.clone();
    assert!(builder.add(rule, &parent).unwrap());
    builder.remove(&rule_id).unwrap();

    assert_eq!(builder.primary_group().unwrap().rules, before);
}

#[test]
fn test_restriction_injection() {
    let factory = factory();
    let mut tree = factory.default_advanced_tree(None);
    let restriction = factory.build_rule("x", "object", "equals", vec!["1"]);

    assign_restrictions(&factory, &mut tree, Some(restriction.clone().into()));

    assert_eq!(tree.condition, Junction::And);
    assert!(tree.rules.contains(&CriteriaNode::Rule(restriction.clone())));
    let primary = tree.rules[0].as_condition().unwrap();
    assert!(!primary.rules.contains(&CriteriaNode::Rule(restriction)));
}

#[test]
fn test_topmost_detection() {
    let factory = factory();
    let mut builder = QueryBuilder::new(factory.clone());
    builder.init(None);
    let primary = builder.primary_group_id().cloned().unwrap();

    let r1 = factory.build_rule("a", "", "equals", "1");
    let r2 = factory.build_rule("b", "", "equals", "2");
    builder.add(r1.clone(), &primary).unwrap();
    builder.add(r2.clone(), &primary).unwrap();

    let tree = builder.tree_mut().unwrap();
    let group = tree.rules[0].as_condition_mut().unwrap();
    group.rules[1] = factory
        .build_condition(Some(Junction::And), Some(vec![r1.clone().into(), r2.clone().into()]))
        .into();

    let tree = builder.tree().unwrap();
    assert!(is_criteria_topmost(tree, &r1));
    assert!(!is_criteria_topmost(tree, &r2));
}

#[test]
fn test_stringify_formatting() {
    let factory = factory();
    let tree = factory.build_condition(
        Some(Junction::And),
        Some(vec![factory.build_rule("prop1", "object", "equals", vec!["v1", "v2"]).into()]),
    );
    let text = stringify_criteria(&tree, &RenderOptions::default().with_beautify(false));
    assert!(text.contains("prop1 equals v1, v2"));
}

#[test]
fn test_walker_order() {
    let tree = factory().build_search_tree(
        SearchTreeParams::new()
            .with_object_type("A")
            .with_free_text("f")
            .with_context("C"),
    );

    let mut fields = Vec::new();
    walk(&tree, &mut RuleVisitor(|rule: &Rule| fields.push(rule.field.clone())));
    assert_eq!(fields, vec!["types", "freeText", "anyRelation"]);
}

#[test]
fn test_mode_switch_keeps_ids_and_advanced_rules() {
    let factory = factory();
    let mut tree = factory.build_search_tree(
        SearchTreeParams::new().with_object_type("emf:Case").with_free_text("audit"),
    );
    let custom = factory.build_rule("emf:status", "codeList", "equals", vec!["OPEN"]);
    tree.rules[0].as_condition_mut().unwrap().rules[1]
        .as_condition_mut()
        .unwrap()
        .rules
        .push(custom.into());
    let fts_id = quarry_core::domain::criteria::first_rule(&tree, "freeText")
        .unwrap()
        .id
        .clone();

    let mut sync = BasicSearchSync::new();
    let mut mapping = BasicCriteriaMapping::default();
    sync.project(&mut mapping, &tree);
    assert_eq!(mapping.hidden.len(), 1);

    mapping.set_value(BasicField::CreatedBy, vec!["emf:auditor"]);
    assert!(sync.sync(&factory, &mapping, &mut tree));

    assert_eq!(rule_values_by_field(&tree, "emf:status"), vec!["OPEN"]);
    assert_eq!(rule_values_by_field(&tree, "emf:createdBy"), vec!["emf:auditor"]);
    assert_eq!(
        quarry_core::domain::criteria::first_rule(&tree, "freeText").unwrap().id,
        fts_id
    );
}

#[test]
fn test_encoded_link_round_trip() {
    let tree = factory().build_search_tree(
        SearchTreeParams::new().with_free_text("a & b").with_context("emf:1"),
    );
    let encoded = encode_search_tree(&tree).unwrap();
    assert_eq!(decode_search_tree(&encoded).unwrap(), tree);
    assert!(matches!(decode_search_tree("%%%"), Err(Error::Decode(_))));
}

struct StaticLabels;

#[async_trait]
impl LabelSource for StaticLabels {
    async fn property_labels(&self) -> Result<Labels> {
        Ok(HashMap::from([("freeText".to_string(), "Free text".to_string())]))
    }

    async fn operator_labels(&self) -> Result<Labels> {
        Ok(HashMap::from([("contains".to_string(), "contains".to_string())]))
    }

    async fn junction_labels(&self) -> Result<Labels> {
        Ok(HashMap::from([("AND".to_string(), "and".to_string())]))
    }

    async fn model_labels(&self) -> Result<Labels> {
        Ok(HashMap::from([("emf:Case".to_string(), "Case".to_string())]))
    }

    async fn codelist_labels(&self) -> Result<Labels> {
        Ok(Labels::new())
    }

    async fn instance_titles(&self, ids: &[String]) -> Result<Labels> {
        Ok(ids.iter().map(|id| (id.clone(), id.to_uppercase())).collect())
    }
}

#[tokio::test]
async fn test_translate_and_render() {
    let tree = factory().build_search_tree(
        SearchTreeParams::new().with_object_type("emf:Case").with_free_text("audit"),
    );
    let translator = CriteriaTranslator::new(Arc::new(StaticLabels));

    let text = translator
        .translate_and_render(&tree, &RenderOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "(types equals Case and (Free text contains audit))");
}

struct CountingService;

#[async_trait]
impl SearchService for CountingService {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let mut response = SearchResponse::default();
        response.data.result_size = request.arguments.page_size.into();
        Ok(response)
    }
}

#[tokio::test]
async fn test_search_session() {
    let factory = factory();
    let mut builder = QueryBuilder::new(factory);
    builder.init(None);
    let store = Arc::new(InMemoryEventStore::new());
    let mediator =
        SearchMediator::new(builder, Arc::new(CountingService)).with_publisher(store.clone());

    let outcome = mediator.search().await.unwrap();
    let SearchOutcome::Completed(response) = outcome else {
        panic!("search should complete");
    };
    assert_eq!(response.data.result_size, 25);
    assert_eq!(store.events_for(mediator.session_id()).len(), 2);
}
