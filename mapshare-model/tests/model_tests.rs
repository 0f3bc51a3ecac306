use mapshare_model::{
    alternate_path, attachment_path, validate_slug, Action, ActionKind, BoundingBox, Dataset,
    Geometry, Origin, Place, Thing, ThingKind, Webhook,
};
use mapshare_types::{base62_time, now, DatasetId, ThingId, UserId};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Dataset ──────────────────────────────────────────────────────

#[test]
fn dataset_new_is_unsaved() {
    let ds = Dataset::new(UserId::new(), "Parks", "parks").unwrap();
    assert!(ds.id.is_none());
    assert_eq!(ds.slug, "parks");
}

#[test]
fn slug_validation() {
    assert!(validate_slug("parks_2024-nyc").is_ok());
    assert!(validate_slug("").is_err());
    assert!(validate_slug("has space").is_err());
    assert!(validate_slug(&"x".repeat(129)).is_err());
    assert!(Dataset::new(UserId::new(), "Bad", "a/b").is_err());
}

// ── Thing ────────────────────────────────────────────────────────

#[test]
fn thing_defaults() {
    let thing = Thing::new(DatasetId::new());
    assert!(thing.is_new());
    assert!(thing.visible);
    assert_eq!(thing.data, "{}");
    assert_eq!(thing.created_datetime, thing.updated_datetime);
}

#[test]
fn malformed_blob_parses_as_null() {
    let mut thing = Thing::new(DatasetId::new());
    thing.data = "{not json".into();
    assert_eq!(thing.parsed_data(), serde_json::Value::Null);
}

#[test]
fn thing_kind_roundtrip() {
    for kind in [ThingKind::Place, ThingKind::Submission] {
        assert_eq!(kind.as_str().parse::<ThingKind>().unwrap(), kind);
    }
}

// ── Geometry ─────────────────────────────────────────────────────

#[test]
fn geometry_serializes_as_geojson() {
    let g = Geometry::Point([1.5, 2.5]);
    assert_eq!(
        serde_json::to_value(&g).unwrap(),
        json!({"type": "Point", "coordinates": [1.5, 2.5]})
    );
}

#[test]
fn polygon_bbox() {
    let g = Geometry::Polygon(vec![vec![[0.0, 0.0], [4.0, 1.0], [2.0, 5.0], [0.0, 0.0]]]);
    assert_eq!(g.bbox(), Some(BoundingBox::new(0.0, 0.0, 4.0, 5.0)));
    assert_eq!(Geometry::LineString(vec![]).bbox(), None);
}

#[test]
fn bbox_intersection_includes_edges() {
    let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    assert!(a.intersects(&BoundingBox::new(1.0, 1.0, 2.0, 2.0)));
    assert!(!a.intersects(&BoundingBox::new(1.1, 0.0, 2.0, 1.0)));
}

#[test]
fn place_serde_roundtrip() {
    let place = Place::new(DatasetId::new(), Geometry::Point([1.0, 2.0]))
        .with_data(&json!({"name": "x"}));
    let text = serde_json::to_string(&place).unwrap();
    let back: Place = serde_json::from_str(&text).unwrap();
    assert_eq!(back, place);
}

// ── Action / Attachment / Webhook ────────────────────────────────

#[test]
fn action_kind_strings() {
    assert_eq!(ActionKind::Create.as_str(), "create");
    assert_eq!("update".parse::<ActionKind>().unwrap(), ActionKind::Update);
    let action = Action::new(ThingId::new(), ActionKind::Create, Some("api".into()));
    assert_eq!(action.source.as_deref(), Some("api"));
}

#[test]
fn attachment_path_uses_base62_time_prefix() {
    let at = now();
    assert_eq!(
        attachment_path("photo.jpg", at),
        format!("attachments/{}-photo.jpg", base62_time(at))
    );
}

#[test]
fn attachment_path_strips_directories() {
    let at = now();
    let path = attachment_path("../../etc/passwd", at);
    assert!(path.ends_with("-passwd"));
    assert!(attachment_path("dir/", at).ends_with("-file"));
}

#[test]
fn alternate_path_suffixes_before_extension() {
    assert_eq!(alternate_path("attachments/k-photo.jpg", 2), "attachments/k-photo_2.jpg");
    assert_eq!(alternate_path("attachments/k-a.tar.gz", 1), "attachments/k-a.tar_1.gz");
    assert_eq!(alternate_path("attachments/k-README", 3), "attachments/k-README_3");
    assert_eq!(alternate_path("plain", 1), "plain_1");
}

#[test]
fn webhook_display() {
    let hook = Webhook::new(DatasetId::new(), "comments", "https://example.com/hook");
    assert_eq!(hook.to_string(), "On add data in comments");
}

// ── Origin ───────────────────────────────────────────────────────

#[test]
fn origin_matches_host_ignoring_scheme() {
    assert!(Origin::matches("(?:www.)?openplans.org", "http://openplans.org"));
    assert!(Origin::matches("(?:www.)?openplans.org", "https://www.openplans.org/"));
    assert!(!Origin::matches("(?:www.)?openplans.org", "https://evil-openplans.org"));
    assert!(Origin::matches("openplans.github.io", "openplans.github.io"));
}

#[test]
fn origin_wildcard_matches_anything() {
    assert!(Origin::matches("*", "https://example.com"));
}

#[test]
fn origin_rejects_invalid_pattern() {
    assert!(Origin::new(DatasetId::new(), "(unclosed").is_err());
    let origin = Origin::new(DatasetId::new(), "localhost:\\d+").unwrap();
    assert!(origin.permissions.can_update);
}
