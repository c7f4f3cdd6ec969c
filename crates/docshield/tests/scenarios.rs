//! End-to-end filtering scenarios through the node.

use docshield::proto::{FilterExpr, SimpleFilter, Value};
use docshield::{
    AbsentContextPolicy, Error, FieldVisibilitySpec, IndexSettings, Node, RequestContext, SearchQuery,
    SecurityConfig, SecurityContext, SecurityError,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Indices `a`, `bandc` and `d`, all protected, plus an unprotected `open`.
fn setup() -> Node {
    init_tracing();
    let node = Node::default();

    node.create_index("a", IndexSettings::protected()).unwrap();
    node.create_index("bandc", IndexSettings::protected()).unwrap();
    node.create_index(
        "d",
        IndexSettings::protected().with_fields(FieldVisibilitySpec::include(["title"])),
    )
    .unwrap();
    node.create_index("open", IndexSettings::default()).unwrap();

    for (index, field, value) in [
        ("a", "title", "a1"),
        ("a", "title", "a2"),
        ("bandc", "title", "b1"),
        ("bandc", "title", "b2"),
        ("bandc", "title", "c1"),
        ("bandc", "title", "c2"),
        ("d", "title", "d1"),
        ("d", "title", "d2"),
        ("d", "nottitle", "d1"),
        ("d", "nottitle", "d2"),
        ("open", "title", "o1"),
        ("open", "title", "o2"),
    ] {
        node.index(index, vec![(field, Value::from(value))]).unwrap();
    }
    for index in ["a", "bandc", "d", "open"] {
        node.refresh(index).unwrap();
    }
    node
}

/// What the authorization layer would resolve for each index.
fn context_for(index: &str) -> SecurityContext {
    let predicate = match index {
        "a" => FilterExpr::eq("title", "a1"),
        "bandc" => FilterExpr::or(vec![SimpleFilter::eq("title", "b1"), SimpleFilter::eq("title", "c2")]),
        "d" => FilterExpr::eq("title", "d1"),
        _ => FilterExpr::is_not_null("title"),
    };
    SecurityContext::with_predicate(predicate.to_json().unwrap())
}

fn request_for(index: &str) -> RequestContext {
    RequestContext::with_security_context(&context_for(index)).unwrap()
}

fn titles(node: &Node, request: &RequestContext, index: &str) -> Vec<String> {
    node.search(request, index, &SearchQuery::all())
        .unwrap()
        .values_of("title")
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_row_filtering_single_index() {
    let node = setup();
    let request = request_for("a");

    assert_eq!(titles(&node, &request, "a"), vec!["a1".to_string()]);
    assert_eq!(node.count(&request, "a", None).unwrap(), 1);
}

#[test]
fn test_unrelated_index_unaffected() {
    let node = setup();
    let request = request_for("a");

    assert_eq!(titles(&node, &request, "open"), vec!["o1".to_string(), "o2".to_string()]);
}

#[test]
fn test_or_predicate_selects_one_tag_per_group() {
    let node = setup();
    let request = request_for("bandc");

    assert_eq!(titles(&node, &request, "bandc"), vec!["b1".to_string(), "c2".to_string()]);
    assert_eq!(node.count(&request, "bandc", Some(&FilterExpr::eq("title", "b2"))).unwrap(), 0);
}

#[test]
fn test_field_filtering() {
    let node = setup();
    let request = request_for("d");

    let response = node.search(&request, "d", &SearchQuery::all()).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(
        response.hits[0].fields,
        vec![("title".to_string(), Value::from("d1"))]
    );
    assert_eq!(node.field_names(&request, "d").unwrap(), vec!["title".to_string()]);
}

#[test]
fn test_field_filtering_without_row_predicate() {
    let node = setup();
    let request = RequestContext::with_security_context(&SecurityContext::unrestricted()).unwrap();

    let response = node.search(&request, "d", &SearchQuery::all()).unwrap();
    assert_eq!(response.total, 4);
    assert!(response.hits.iter().all(|hit| hit.get("nottitle").is_none()));
    assert_eq!(node.field_names(&request, "d").unwrap(), vec!["title".to_string()]);

    // A clause on a hidden field sees no values.
    let hidden = SearchQuery::filtered(FilterExpr::is_not_null("nottitle"));
    assert_eq!(node.search(&request, "d", &hidden).unwrap().total, 0);
}

#[test]
fn test_request_field_spec_narrows_further() {
    let node = setup();
    let context = SecurityContext::unrestricted().with_field_spec(FieldVisibilitySpec::include(["nottitle"]));
    let request = RequestContext::with_security_context(&context).unwrap();

    assert!(node.field_names(&request, "d").unwrap().is_empty());
}

#[test]
fn test_missing_context_fails_closed() {
    let node = setup();
    let request = RequestContext::new();

    let err = node.search(&request, "a", &SearchQuery::all()).unwrap_err();
    assert!(matches!(
        err,
        Error::Security(SecurityError::ContextMissing { ref index }) if index == "a"
    ));
    assert_eq!(titles(&node, &request, "open").len(), 2);
}

#[test]
fn test_missing_context_fail_open() {
    let node = setup();
    node.create_index(
        "lenient",
        IndexSettings::protected()
            .with_security(SecurityConfig::enabled().with_absent_context(AbsentContextPolicy::FailOpen)),
    )
    .unwrap();
    node.index("lenient", vec![("title", "l1".into())]).unwrap();
    node.refresh("lenient").unwrap();

    assert_eq!(titles(&node, &RequestContext::new(), "lenient"), vec!["l1".to_string()]);
}

#[test]
fn test_malformed_predicate_fails_request() {
    let node = setup();
    let request = RequestContext::with_security_context(&SecurityContext::with_predicate("title:a1")).unwrap();

    let err = node.search(&request, "a", &SearchQuery::all()).unwrap_err();
    assert!(matches!(err, Error::Security(SecurityError::PredicateCompile(_))));
}

#[test]
fn test_cached_results_never_cross_contexts() {
    let node = setup();
    let a1 = request_for("a");
    let a2 = RequestContext::with_security_context(&SecurityContext::with_predicate(
        FilterExpr::eq("title", "a2").to_json().unwrap(),
    ))
    .unwrap();

    assert_eq!(titles(&node, &a1, "a"), vec!["a1".to_string()]);
    assert_eq!(titles(&node, &a2, "a"), vec!["a2".to_string()]);
    assert_eq!(titles(&node, &a1, "a"), vec!["a1".to_string()]);
    assert_eq!(node.cache_stats().hits(), 1);
}

#[test]
fn test_refresh_is_visible_to_filtered_reads() {
    let node = setup();
    let request = request_for("a");

    node.index("a", vec![("title", "a1".into())]).unwrap();
    node.index("a", vec![("title", "a3".into())]).unwrap();
    assert_eq!(node.count(&request, "a", None).unwrap(), 1);

    node.refresh("a").unwrap();
    assert_eq!(node.count(&request, "a", None).unwrap(), 2);

    node.delete_by_term("a", "title", "a1").unwrap();
    node.refresh("a").unwrap();
    assert_eq!(node.count(&request, "a", None).unwrap(), 0);
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let node = setup();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let node = &node;
            scope.spawn(move || {
                let (index, expected) = if i % 2 == 0 {
                    ("a", vec!["a1".to_string()])
                } else {
                    ("bandc", vec!["b1".to_string(), "c2".to_string()])
                };
                for _ in 0..25 {
                    let request = request_for(index);
                    assert_eq!(titles(node, &request, index), expected);
                }
            });
        }
    });
}
