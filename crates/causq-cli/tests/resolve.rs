use super::*;
use causq_model::{Model, ModelData};

fn test_model() -> Model {
    let data = ModelData {
        type_names: vec![],
        method_names: vec![
            "root".into(),
            "a.foo()".into(),
            "a.bar()".into(),
            "b.baz()".into(),
        ],
        typestates: vec![causq_model::Bitset::new(0)],
        interflows: vec![],
        direct_invokes: vec![],
        typeflow_methods: vec![causq_model::ContainingMethod::NONE],
        typeflow_filters: vec![causq_model::FilterId(0)],
    };
    Model::new(data).unwrap()
}

#[test]
fn exact_names_resolve() {
    let model = test_model();
    let mids = resolve_methods(&model, &["a.bar()".into(), "b.baz()".into()]).unwrap();
    assert_eq!(mids, vec![MethodId(2), MethodId(3)]);
}

#[test]
fn prefix_patterns_expand_in_id_order() {
    let model = test_model();
    let mids = resolve_methods(&model, &["a.*".into()]).unwrap();
    assert_eq!(mids, vec![MethodId(1), MethodId(2)]);

    // The root is never matched by a pattern.
    let mids = resolve_methods(&model, &["*".into()]).unwrap();
    assert_eq!(mids, vec![MethodId(1), MethodId(2), MethodId(3)]);
}

#[test]
fn duplicates_are_dropped() {
    let model = test_model();
    let mids =
        resolve_methods(&model, &["a.*".into(), "a.foo()".into(), "2".into()]).unwrap();
    assert_eq!(mids, vec![MethodId(1), MethodId(2)]);
}

#[test]
fn numeric_ids_resolve() {
    let model = test_model();
    let mids = resolve_methods(&model, &["3".into()]).unwrap();
    assert_eq!(mids, vec![MethodId(3)]);
    assert!(resolve_methods(&model, &["17".into()]).is_err());
}

#[test]
fn unknown_names_are_reported() {
    let model = test_model();
    let err = resolve_methods(&model, &["c.quux()".into()]).unwrap_err();
    assert!(err.to_string().contains("doesn't exist"));
    assert!(resolve_methods(&model, &["c.*".into()]).is_err());
}

#[test]
fn single_method_resolution() {
    let model = test_model();
    assert_eq!(resolve_method(&model, "a.foo()").unwrap(), MethodId(1));
    assert!(resolve_method(&model, "a.*").is_err(), "ambiguous pattern");
}
