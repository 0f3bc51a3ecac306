use mapshare_model::{
    Action, ActionKind, ApiKey, Attachment, DataPermission, Dataset, Geometry, IndexSpec, Origin,
    Place, Submission, User, Webhook,
};
use mapshare_storage::{
    access, actions, attachments, datasets, index_engine, things, users, webhooks, RecordStore,
    StorageError, ThingQuery,
};
use mapshare_types::{DatasetId, ThingId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn setup() -> (RecordStore, User, DatasetId) {
    let store = RecordStore::open_in_memory().unwrap();
    let user = User::new("alice");
    let mut dataset = Dataset::new(user.id, "Bikes", "bikes").unwrap();
    store
        .write(|tx| {
            users::insert(tx, &user)?;
            datasets::persist(tx, &mut dataset)
        })
        .unwrap();
    let id = dataset.id.unwrap();
    (store, user, id)
}

fn save_place(store: &RecordStore, dataset: DatasetId, data: serde_json::Value) -> Place {
    let mut place = Place::new(dataset, Geometry::Point([-75.16, 39.95])).with_data(&data);
    store.write(|tx| things::persist(tx, &mut place)).unwrap();
    place
}

// ── Users and datasets ───────────────────────────────────────────

#[test]
fn user_lookup_by_name() {
    let (store, user, _) = setup();
    let found = store.read(|c| users::get_by_username(c, "alice")).unwrap();
    assert_eq!(found, Some(user.clone()));
    assert_eq!(store.read(|c| users::get(c, user.id)).unwrap(), Some(user));
    assert!(store.read(|c| users::get_by_username(c, "bob")).unwrap().is_none());
}

#[test]
fn dataset_persist_assigns_id_once() {
    let store = RecordStore::open_in_memory().unwrap();
    let user = User::new("owner");
    let mut dataset = Dataset::new(user.id, "Trees", "trees").unwrap();
    assert!(dataset.id.is_none());

    let inserted = store
        .write(|tx| {
            users::insert(tx, &user)?;
            datasets::persist(tx, &mut dataset)
        })
        .unwrap();
    assert!(inserted);
    let id = dataset.id.unwrap();

    dataset.display_name = "Street trees".into();
    let inserted = store.write(|tx| datasets::persist(tx, &mut dataset)).unwrap();
    assert!(!inserted);
    assert_eq!(dataset.id, Some(id));

    let loaded = store.read(|c| datasets::require(c, id)).unwrap();
    assert_eq!(loaded.display_name, "Street trees");
}

#[test]
fn duplicate_slug_per_owner_is_constraint_error() {
    let (store, user, _) = setup();
    let mut again = Dataset::new(user.id, "Bikes 2", "bikes").unwrap();
    let err = store.write(|tx| datasets::persist(tx, &mut again)).unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)), "{err:?}");
    assert!(again.id.is_none());
}

#[test]
fn dataset_lookup_by_slug_and_owner() {
    let (store, user, id) = setup();
    let found = store.read(|c| datasets::get_by_slug(c, user.id, "bikes")).unwrap();
    assert_eq!(found.and_then(|d| d.id), Some(id));
    let listed = store.read(|c| datasets::list_for_owner(c, user.id)).unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn require_missing_dataset_is_not_found() {
    let store = RecordStore::open_in_memory().unwrap();
    let err = store.read(|c| datasets::require(c, DatasetId::new())).unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: "dataset", .. }));
}

// ── Things ───────────────────────────────────────────────────────

#[test]
fn place_round_trips_through_store() {
    let (store, _, dataset) = setup();
    let mut place = Place::new(
        dataset,
        Geometry::Polygon(vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 0.0]]]),
    )
    .with_data(&json!({"name": "Lot"}));
    let inserted = store.write(|tx| things::persist(tx, &mut place)).unwrap();
    assert!(inserted);
    let id = place.thing.id.unwrap();

    let loaded: Place = store.read(|c| things::require(c, id)).unwrap();
    assert_eq!(loaded, place);
    assert_eq!(loaded.thing.parsed_data()["name"], "Lot");
}

#[test]
fn update_refreshes_updated_datetime() {
    let (store, _, dataset) = setup();
    let mut place = save_place(&store, dataset, json!({}));
    let first = place.thing.updated_datetime;
    std::thread::sleep(std::time::Duration::from_millis(5));

    place.thing.set_data(&json!({"name": "renamed"}));
    let inserted = store.write(|tx| things::persist(tx, &mut place)).unwrap();
    assert!(!inserted);
    assert!(place.thing.updated_datetime > first);
}

#[test]
fn update_of_deleted_thing_is_not_found() {
    let (store, _, dataset) = setup();
    let mut place = save_place(&store, dataset, json!({}));
    let id = place.thing.id.unwrap();
    store.write(|tx| things::delete(tx, id)).unwrap();

    let err = store.write(|tx| things::persist(tx, &mut place)).unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[test]
fn update_cannot_change_dataset() {
    let (store, user, dataset) = setup();
    let mut other = Dataset::new(user.id, "Other", "other").unwrap();
    store.write(|tx| datasets::persist(tx, &mut other)).unwrap();
    let mut place = save_place(&store, dataset, json!({"name": "x"}));
    let id = place.thing.id.unwrap();

    place.thing.dataset = other.id.unwrap();
    let err = store.write(|tx| things::persist(tx, &mut place)).unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));

    let stored: Place = store.read(|c| things::require(c, id)).unwrap();
    assert_eq!(stored.thing.dataset, dataset);
    assert!(store.read(|c| things::ids_in_dataset(c, other.id.unwrap())).unwrap().is_empty());
}

#[test]
fn place_is_not_loadable_as_submission() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    let got: Option<Submission> = store.read(|c| things::get(c, place.thing.id.unwrap())).unwrap();
    assert!(got.is_none());
}

#[test]
fn submission_requires_existing_place() {
    let (store, _, dataset) = setup();
    let mut sub = Submission::new(dataset, ThingId::new(), "comments");
    let err = store.write(|tx| things::persist(tx, &mut sub)).unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));
    assert!(sub.thing.is_new());
    assert_eq!(store.read(|c| things::ids_in_dataset(c, dataset)).unwrap(), vec![]);
}

#[test]
fn submission_place_must_share_dataset() {
    let (store, user, dataset) = setup();
    let mut other = Dataset::new(user.id, "Other", "other").unwrap();
    store.write(|tx| datasets::persist(tx, &mut other)).unwrap();
    let place = save_place(&store, dataset, json!({}));

    let mut sub = Submission::new(other.id.unwrap(), place.thing.id.unwrap(), "comments");
    let err = store.write(|tx| things::persist(tx, &mut sub)).unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));
}

#[test]
fn thing_ref_reports_parent_place() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    let place_id = place.thing.id.unwrap();
    let mut sub = Submission::new(dataset, place_id, "comments");
    store.write(|tx| things::persist(tx, &mut sub)).unwrap();

    let r = store.read(|c| things::thing_ref(c, sub.thing.id.unwrap())).unwrap().unwrap();
    assert_eq!(r.place, Some(place_id));
    assert_eq!(r.dataset, dataset);
    let r = store.read(|c| things::thing_ref(c, place_id)).unwrap().unwrap();
    assert_eq!(r.place, None);
}

#[test]
fn submission_counts_skip_hidden() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    let place_id = place.thing.id.unwrap();
    for (set, visible) in [("comments", true), ("comments", true), ("support", true), ("support", false)] {
        let mut sub = Submission::new(dataset, place_id, set);
        sub.thing.visible = visible;
        store.write(|tx| things::persist(tx, &mut sub)).unwrap();
    }
    let counts = store.read(|c| things::submission_counts(c, place_id)).unwrap();
    assert_eq!(counts, vec![("comments".to_string(), 2), ("support".to_string(), 1)]);
}

#[test]
fn deleting_place_cascades_to_submissions_and_index() {
    let (store, _, dataset) = setup();
    let spec = IndexSpec::numeric(dataset, "rating");
    store.write(|tx| index_engine::create_spec(tx, &spec)).unwrap();
    let place = save_place(&store, dataset, json!({"rating": 3}));
    let place_id = place.thing.id.unwrap();
    let mut sub = Submission::new(dataset, place_id, "comments").with_data(&json!({"rating": 1}));
    store
        .write(|tx| {
            things::persist(tx, &mut sub)?;
            index_engine::index_values(tx, &place.thing, None)?;
            index_engine::index_values(tx, &sub.thing, None)
        })
        .unwrap();
    let sub_id = sub.thing.id.unwrap();

    assert!(store.write(|tx| things::delete(tx, place_id)).unwrap());
    let gone: Option<Submission> = store.read(|c| things::get(c, sub_id)).unwrap();
    assert!(gone.is_none());
    assert_eq!(store.read(|c| index_engine::count_for_thing(c, sub_id)).unwrap(), 0);
}

#[test]
fn failed_write_rolls_back() {
    let (store, _, dataset) = setup();
    let result = store.write(|tx| {
        let mut place = Place::new(dataset, Geometry::Point([0.0, 0.0]));
        things::persist(tx, &mut place)?;
        Err::<(), _>(StorageError::InvalidData("abort".into()))
    });
    assert!(result.is_err());
    assert!(store.read(|c| things::ids_in_dataset(c, dataset)).unwrap().is_empty());
}

#[test]
fn places_filter_by_submitter() {
    let (store, alice, dataset) = setup();
    let bob = User::new("bob");
    store.write(|tx| users::insert(tx, &bob)).unwrap();

    let mut by_bob = Place::new(dataset, Geometry::Point([0.0, 0.0]));
    by_bob.thing.submitter = Some(bob.id);
    store.write(|tx| things::persist(tx, &mut by_bob)).unwrap();
    let anonymous = save_place(&store, dataset, json!({}));

    let query = ThingQuery::<Place>::new(dataset).submitted_by(bob.id);
    let found = store.read(|c| query.fetch(c)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].thing.id, by_bob.thing.id);
    assert_ne!(found[0].thing.id, anonymous.thing.id);

    let none = ThingQuery::<Place>::new(dataset).submitted_by(alice.id);
    assert_eq!(store.read(|c| none.count(c)).unwrap(), 0);
}

// ── Actions ──────────────────────────────────────────────────────

#[test]
fn actions_newest_first_and_submitter_from_thing() {
    let (store, user, dataset) = setup();
    let mut place = Place::new(dataset, Geometry::Point([1.0, 1.0]));
    place.thing.submitter = Some(user.id);
    store.write(|tx| things::persist(tx, &mut place)).unwrap();
    let id = place.thing.id.unwrap();

    let create = Action::new(id, ActionKind::Create, Some("web".into()));
    std::thread::sleep(std::time::Duration::from_millis(5));
    let update = Action::new(id, ActionKind::Update, None);
    store
        .write(|tx| {
            actions::insert(tx, &create)?;
            actions::insert(tx, &update)
        })
        .unwrap();

    let listed = store.read(|c| actions::for_thing(c, id)).unwrap();
    assert_eq!(listed, vec![update.clone(), create.clone()]);
    assert_eq!(store.read(|c| actions::count_for_thing(c, id)).unwrap(), 2);
    assert_eq!(store.read(|c| actions::submitter(c, &create)).unwrap(), Some(user.id));
    assert_eq!(store.read(|c| actions::for_dataset(c, dataset, 1)).unwrap(), vec![update]);
}

// ── Attachments and webhooks ─────────────────────────────────────

#[test]
fn attachments_listed_per_thing() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    let id = place.thing.id.unwrap();
    let a = Attachment::new(id, Some("photo".into()), "tree.jpg");
    store.write(|tx| attachments::insert(tx, &a)).unwrap();

    assert_eq!(store.read(|c| attachments::for_thing(c, id)).unwrap(), vec![a.clone()]);
    assert_eq!(store.read(|c| attachments::get(c, a.id)).unwrap(), Some(a.clone()));
    assert!(store.write(|tx| attachments::delete(tx, a.id)).unwrap());
    assert!(store.read(|c| attachments::for_thing(c, id)).unwrap().is_empty());
}

#[test]
fn files_under_place_include_its_submissions() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    let other = save_place(&store, dataset, json!({}));
    let place_id = place.thing.id.unwrap();
    let mut sub = Submission::new(dataset, place_id, "comments");
    store.write(|tx| things::persist(tx, &mut sub)).unwrap();
    let sub_id = sub.thing.id.unwrap();

    let mut on_place = Attachment::new(place_id, None, "a.jpg");
    on_place.file = "attachments/a.jpg".into();
    let mut on_sub = Attachment::new(sub_id, None, "b.jpg");
    on_sub.file = "attachments/b.jpg".into();
    let elsewhere = Attachment::new(other.thing.id.unwrap(), None, "c.jpg");
    store
        .write(|tx| {
            attachments::insert(tx, &on_place)?;
            attachments::insert(tx, &on_sub)?;
            attachments::insert(tx, &elsewhere)
        })
        .unwrap();

    assert_eq!(
        store.read(|c| attachments::files_under(c, place_id)).unwrap(),
        vec!["attachments/a.jpg".to_string(), "attachments/b.jpg".to_string()]
    );
    assert_eq!(
        store.read(|c| attachments::files_under(c, sub_id)).unwrap(),
        vec!["attachments/b.jpg".to_string()]
    );
}

#[test]
fn webhooks_filter_by_submission_set() {
    let (store, _, dataset) = setup();
    let places = Webhook::new(dataset, "places", "https://example.com/p");
    let comments = Webhook::new(dataset, "comments", "https://example.com/c");
    store
        .write(|tx| {
            webhooks::insert(tx, &places)?;
            webhooks::insert(tx, &comments)
        })
        .unwrap();

    let all = store.read(|c| webhooks::for_dataset(c, dataset, None)).unwrap();
    assert_eq!(all.len(), 2);
    let only = store.read(|c| webhooks::for_dataset(c, dataset, Some("comments"))).unwrap();
    assert_eq!(only, vec![comments]);
}

// ── Access ───────────────────────────────────────────────────────

#[test]
fn origin_matching_and_permission_update() {
    let (store, _, dataset) = setup();
    let origin = Origin::new(dataset, r"(?:www\.)?openplans\.org").unwrap();
    store.write(|tx| access::insert_origin(tx, &origin)).unwrap();

    let found = store
        .read(|c| access::matching_origin(c, dataset, "http://www.openplans.org"))
        .unwrap();
    assert_eq!(found.map(|o| o.id), Some(origin.id));
    assert!(store
        .read(|c| access::matching_origin(c, dataset, "http://evil.example"))
        .unwrap()
        .is_none());

    let locked = DataPermission {
        can_update: false,
        can_destroy: false,
        ..DataPermission::default()
    };
    store
        .write(|tx| access::update_origin_permissions(tx, origin.id, &locked))
        .unwrap();
    let origins = store.read(|c| access::origins_for_dataset(c, dataset)).unwrap();
    assert_eq!(origins[0].permissions, locked);

    assert!(store.write(|tx| access::delete_origin(tx, origin.id)).unwrap());
    assert!(!store.write(|tx| access::delete_origin(tx, origin.id)).unwrap());
    assert!(store
        .read(|c| access::matching_origin(c, dataset, "http://www.openplans.org"))
        .unwrap()
        .is_none());
}

#[test]
fn api_keys_are_unique() {
    let (store, _, dataset) = setup();
    let key = ApiKey::new(dataset, "abc123");
    store.write(|tx| access::insert_key(tx, &key)).unwrap();
    let dup = ApiKey::new(dataset, "abc123");
    let err = store.write(|tx| access::insert_key(tx, &dup)).unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));

    assert_eq!(store.read(|c| access::key_by_value(c, "abc123")).unwrap(), Some(key));
    assert_eq!(store.read(|c| access::keys_for_dataset(c, dataset)).unwrap().len(), 1);
}

#[test]
fn deleting_dataset_cascades() {
    let (store, _, dataset) = setup();
    let place = save_place(&store, dataset, json!({}));
    store.write(|tx| access::insert_key(tx, &ApiKey::new(dataset, "k"))).unwrap();

    assert!(store.write(|tx| datasets::delete(tx, dataset)).unwrap());
    assert!(store.read(|c| things::get_thing(c, place.thing.id.unwrap())).unwrap().is_none());
    assert!(store.read(|c| access::key_by_value(c, "k")).unwrap().is_none());
}

// ── On disk ──────────────────────────────────────────────────────

#[test]
fn reopen_on_disk_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapshare.db");
    let user = User::new("disk");
    let mut dataset = Dataset::new(user.id, "Disk", "disk").unwrap();
    {
        let store = RecordStore::open(&path).unwrap();
        store
            .write(|tx| {
                users::insert(tx, &user)?;
                datasets::persist(tx, &mut dataset)
            })
            .unwrap();
    }
    let store = RecordStore::open(&path).unwrap();
    let loaded = store.read(|c| datasets::get(c, dataset.id.unwrap())).unwrap();
    assert_eq!(loaded, Some(dataset));
}
