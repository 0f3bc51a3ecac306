use mapshare_model::{field_pointer, ExtractedValue, IndexOp, IndexSpec, IndexType};
use mapshare_types::DatasetId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn blob() -> serde_json::Value {
    json!({
        "name": "Central Park",
        "acres": 843,
        "rating": "4.5",
        "category": "  Park ",
        "open": true,
        "address": {"city": "New York", "zip": "10024"},
        "tags": ["green", "big"],
        "a/b": "slash",
        "nothing": null
    })
}

// ── field_pointer ────────────────────────────────────────────────

#[test]
fn pointer_from_top_level_name() {
    assert_eq!(field_pointer("name"), "/name");
}

#[test]
fn pointer_from_dotted_path() {
    assert_eq!(field_pointer("address.city"), "/address/city");
    assert_eq!(field_pointer("tags.0"), "/tags/0");
}

#[test]
fn pointer_passthrough() {
    assert_eq!(field_pointer("/address/zip"), "/address/zip");
}

#[test]
fn pointer_escapes_reserved_characters() {
    assert_eq!(field_pointer("a/b"), "/a~1b");
    assert_eq!(field_pointer("x~y"), "/x~0y");
}

// ── Extraction ───────────────────────────────────────────────────

#[test]
fn string_extraction() {
    let ds = DatasetId::new();
    assert_eq!(
        IndexSpec::string(ds, "name").extract(&blob()),
        Some(ExtractedValue::Text("Central Park".into()))
    );
    assert_eq!(
        IndexSpec::string(ds, "address.city").extract(&blob()),
        Some(ExtractedValue::Text("New York".into()))
    );
    assert_eq!(
        IndexSpec::string(ds, "acres").extract(&blob()),
        Some(ExtractedValue::Text("843".into()))
    );
    assert_eq!(
        IndexSpec::string(ds, "a/b").extract(&blob()),
        Some(ExtractedValue::Text("slash".into()))
    );
}

#[test]
fn numeric_extraction_accepts_numbers_and_numeric_strings() {
    let ds = DatasetId::new();
    assert_eq!(
        IndexSpec::numeric(ds, "acres").extract(&blob()),
        Some(ExtractedValue::Numeric(843.0))
    );
    assert_eq!(
        IndexSpec::numeric(ds, "rating").extract(&blob()),
        Some(ExtractedValue::Numeric(4.5))
    );
    assert_eq!(IndexSpec::numeric(ds, "name").extract(&blob()), None);
    assert_eq!(IndexSpec::numeric(ds, "open").extract(&blob()), None);
}

#[test]
fn lookup_extraction_is_canonicalized() {
    let ds = DatasetId::new();
    assert_eq!(
        IndexSpec::lookup(ds, "category").extract(&blob()),
        Some(ExtractedValue::Lookup("park".into()))
    );
    assert_eq!(
        IndexSpec::lookup(ds, "open").extract(&blob()),
        Some(ExtractedValue::Lookup("true".into()))
    );
}

#[test]
fn missing_or_structured_values_miss() {
    let ds = DatasetId::new();
    for path in ["missing", "address", "tags", "nothing", "address.country", "tags.9"] {
        assert_eq!(IndexSpec::string(ds, path).extract(&blob()), None, "path {path}");
    }
}

#[test]
fn extraction_from_non_object_blob_misses() {
    let spec = IndexSpec::string(DatasetId::new(), "name");
    assert_eq!(spec.extract(&serde_json::Value::Null), None);
    assert_eq!(spec.extract(&json!([1, 2, 3])), None);
    assert_eq!(spec.extract(&json!("name")), None);
}

// ── Operator support ─────────────────────────────────────────────

#[test]
fn lookup_supports_only_equality_and_membership() {
    assert!(IndexType::Lookup.supports(IndexOp::Eq));
    assert!(IndexType::Lookup.supports(IndexOp::Ne));
    assert!(IndexType::Lookup.supports(IndexOp::In));
    assert!(!IndexType::Lookup.supports(IndexOp::Lt));
    assert!(!IndexType::Lookup.supports(IndexOp::Contains));
}

#[test]
fn numeric_supports_ordering_but_not_contains() {
    assert!(IndexType::Numeric.supports(IndexOp::Gte));
    assert!(!IndexType::Numeric.supports(IndexOp::Contains));
    assert!(IndexType::String.supports(IndexOp::Contains));
}

#[test]
fn index_type_parse_roundtrip() {
    for t in [IndexType::Numeric, IndexType::String, IndexType::Lookup] {
        assert_eq!(t.as_str().parse::<IndexType>().unwrap(), t);
    }
    assert!("float".parse::<IndexType>().is_err());
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn string_extraction_returns_stored_text(key in "[a-z]{1,8}", text in ".*") {
        let spec = IndexSpec::string(DatasetId::new(), key.clone());
        let blob = json!({ key: text.clone() });
        prop_assert_eq!(spec.extract(&blob), Some(ExtractedValue::Text(text)));
    }

    #[test]
    fn numeric_extraction_returns_stored_number(n in -1.0e9f64..1.0e9) {
        let spec = IndexSpec::numeric(DatasetId::new(), "n");
        prop_assert_eq!(spec.extract(&json!({ "n": n })), Some(ExtractedValue::Numeric(n)));
    }

    #[test]
    fn extraction_never_panics_on_arbitrary_paths(path in "[a-z./~0-9]{0,12}") {
        let spec = IndexSpec::lookup(DatasetId::new(), path);
        let _ = spec.extract(&blob());
    }
}
