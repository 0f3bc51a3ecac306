//! The entity lifecycle: every write to a place, submission or dataset goes
//! through [`DataLayer`].
//!
//! A save persists the record, re-derives its indexed values, appends an
//! audit action and, once all of that has committed, invalidates the cached
//! representations of the record and its ancestors. The three storage steps
//! share one transaction: if any of them fails nothing is kept, no action is
//! recorded and the cache is left alone.

use crate::config::MapshareConfig;
use crate::hooks::{DatasetHook, SeedDefaultOrigins};
use crate::scope::RequestScope;
use crate::{CoreError, CoreResult};
use mapshare_blobstore::{
    AttachmentStorage, BlobStoreError, FsAttachmentStorage, MemoryAttachmentStorage,
};
use mapshare_cache::{Cache, CacheTarget, ThingChain};
use mapshare_model::{
    alternate_path, clone_entity, Action, ActionKind, ApiKey, Attachment, Dataset, FieldValue, IndexSpec,
    IndexType, Origin, Place, Submission, SubmittedThing, ThingKind, User, Webhook,
};
use mapshare_storage::{
    access, actions, attachments, datasets, index_engine, things, users, webhooks, RecordStore,
    StorageError, StoredThing, ThingQuery, ThingRef,
};
use mapshare_types::{AttachmentId, DatasetId, ThingId, UserId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Renames tried after the generated attachment path turns out to be taken.
const MAX_ATTACHMENT_RENAMES: u32 = 100;

/// How a place or submission is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Skip the audit action.
    pub silent: bool,
    /// Label recorded on the action, e.g. the client that made the change.
    pub source: Option<String>,
    /// Re-derive indexed values from the blob.
    pub reindex: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            silent: false,
            source: None,
            reindex: true,
        }
    }
}

impl SaveOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn without_reindex(mut self) -> Self {
        self.reindex = false;
        self
    }
}

/// A stored thing type whose position in the cache hierarchy is known.
pub trait CachedThing: StoredThing {
    fn cache_chain(&self, id: ThingId) -> ThingChain;
}

impl CachedThing for Place {
    fn cache_chain(&self, id: ThingId) -> ThingChain {
        ThingChain::place(self.thing.dataset, id)
    }
}

impl CachedThing for Submission {
    fn cache_chain(&self, id: ThingId) -> ThingChain {
        ThingChain::submission(self.thing.dataset, self.place, id)
    }
}

/// Entry point for reads and writes of mapshare data.
#[derive(Clone)]
pub struct DataLayer {
    store: RecordStore,
    cache: Cache,
    attachments: Arc<dyn AttachmentStorage>,
    hooks: Vec<Arc<dyn DatasetHook>>,
}

impl DataLayer {
    /// A data layer with no dataset hooks.
    pub fn new(store: RecordStore, cache: Cache, attachments: Arc<dyn AttachmentStorage>) -> Self {
        Self {
            store,
            cache,
            attachments,
            hooks: Vec::new(),
        }
    }

    /// Opens the database and attachment directory named in `config` and
    /// registers the default origin seeding hook.
    pub fn from_config(config: &MapshareConfig) -> CoreResult<Self> {
        let store = RecordStore::open(&config.database_path)?;
        let attachments = FsAttachmentStorage::new(&config.attachment_root)?;
        let cache = Cache::in_memory(Duration::from_secs(config.cache_ttl_secs));
        info!(
            database = %config.database_path.display(),
            attachments = %config.attachment_root.display(),
            "opened data layer"
        );
        Ok(Self::new(store, cache, Arc::new(attachments)).with_default_hooks(config))
    }

    /// Everything in memory, with the default hooks. For tests and tooling.
    pub fn in_memory() -> CoreResult<Self> {
        let config = MapshareConfig::default();
        let store = RecordStore::open_in_memory()?;
        let cache = Cache::in_memory(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self::new(store, cache, Arc::new(MemoryAttachmentStorage::new()))
            .with_default_hooks(&config))
    }

    pub fn with_hook(mut self, hook: Arc<dyn DatasetHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    fn with_default_hooks(self, config: &MapshareConfig) -> Self {
        self.with_hook(Arc::new(SeedDefaultOrigins::new(
            config.default_origins.clone(),
            config.default_origin_permissions.clone(),
        )))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// A fresh memo for one request's access lookups.
    pub fn request_scope(&self) -> RequestScope {
        RequestScope::new(self.store.clone())
    }

    // ── Users and datasets ───────────────────────────────────────

    pub fn create_user(&self, username: &str) -> CoreResult<User> {
        let user = User::new(username);
        self.store.write(|tx| users::insert(tx, &user))?;
        Ok(user)
    }

    pub fn user_by_name(&self, username: &str) -> CoreResult<Option<User>> {
        Ok(self.store.read(|c| users::get_by_username(c, username))?)
    }

    /// Creates a dataset and runs every dataset hook in the same transaction.
    pub fn create_dataset(&self, owner: UserId, display_name: &str, slug: &str) -> CoreResult<Dataset> {
        let mut dataset = Dataset::new(owner, display_name, slug)?;
        self.store.write(|tx| {
            datasets::persist(tx, &mut dataset)?;
            for hook in &self.hooks {
                hook.on_dataset_created(tx, &dataset).map_err(|err| match err {
                    CoreError::Hook { .. } => err,
                    other => CoreError::Hook {
                        hook: hook.name(),
                        message: other.to_string(),
                    },
                })?;
            }
            Ok::<_, CoreError>(())
        })?;
        let id = saved_dataset_id(&dataset)?;
        self.cache.clear(&CacheTarget::Dataset(id));
        info!(dataset = %id, slug = %dataset.slug, "created dataset");
        Ok(dataset)
    }

    pub fn update_dataset(&self, dataset: &mut Dataset) -> CoreResult<()> {
        mapshare_model::validate_slug(&dataset.slug)?;
        let id = saved_dataset_id(dataset)?;
        self.store.write(|tx| datasets::persist(tx, dataset))?;
        self.cache.clear(&CacheTarget::Dataset(id));
        Ok(())
    }

    /// Deletes a dataset and everything it owns. Attachment bytes are left in
    /// attachment storage.
    pub fn delete_dataset(&self, id: DatasetId) -> CoreResult<bool> {
        let deleted = self.store.write(|tx| datasets::delete(tx, id))?;
        if deleted {
            self.cache.clear(&CacheTarget::Dataset(id));
            info!(dataset = %id, "deleted dataset");
        }
        Ok(deleted)
    }

    pub fn dataset(&self, id: DatasetId) -> CoreResult<Dataset> {
        Ok(self.store.read(|c| datasets::require(c, id))?)
    }

    pub fn dataset_by_slug(&self, owner: UserId, slug: &str) -> CoreResult<Option<Dataset>> {
        Ok(self.store.read(|c| datasets::get_by_slug(c, owner, slug))?)
    }

    // ── Index specs ──────────────────────────────────────────────

    /// Declares an indexed field and indexes every existing thing in the
    /// dataset for it.
    pub fn add_index_spec(
        &self,
        dataset: DatasetId,
        attr_name: &str,
        attr_type: IndexType,
    ) -> CoreResult<IndexSpec> {
        let spec = IndexSpec::new(dataset, attr_name, attr_type);
        let visited = self.store.write(|tx| {
            datasets::require(tx, dataset)?;
            index_engine::create_spec(tx, &spec)?;
            index_engine::reindex_dataset(tx, dataset)
        })?;
        self.cache.clear(&CacheTarget::Dataset(dataset));
        info!(dataset = %dataset, field = attr_name, kind = %attr_type, things = visited, "added index");
        Ok(spec)
    }

    pub fn remove_index_spec(&self, dataset: DatasetId, attr_name: &str) -> CoreResult<bool> {
        let removed = self.store.write(|tx| {
            match index_engine::spec_by_name(tx, dataset, attr_name)? {
                Some(spec) => index_engine::delete_spec(tx, spec.id),
                None => Ok(false),
            }
        })?;
        if removed {
            self.cache.clear(&CacheTarget::Dataset(dataset));
        }
        Ok(removed)
    }

    pub fn index_specs(&self, dataset: DatasetId) -> CoreResult<Vec<IndexSpec>> {
        Ok(self.store.read(|c| index_engine::specs_for_dataset(c, dataset))?)
    }

    /// Re-derives every indexed value in the dataset. Returns the number of
    /// things visited.
    pub fn reindex_dataset(&self, dataset: DatasetId) -> CoreResult<usize> {
        let visited = self.store.write(|tx| {
            datasets::require(tx, dataset)?;
            index_engine::reindex_dataset(tx, dataset)
        })?;
        self.cache.clear(&CacheTarget::Dataset(dataset));
        Ok(visited)
    }

    // ── Places and submissions ───────────────────────────────────

    pub fn save_place(&self, place: Place, options: &SaveOptions) -> CoreResult<Place> {
        self.save(place, options)
    }

    pub fn save_submission(&self, submission: Submission, options: &SaveOptions) -> CoreResult<Submission> {
        self.save(submission, options)
    }

    fn save<T: CachedThing>(&self, mut record: T, options: &SaveOptions) -> CoreResult<T> {
        let (id, previous, action) = self.store.write(|tx| {
            let previous = match record.id() {
                Some(id) => things::thing_ref(tx, id)?,
                None => None,
            };
            let inserted = things::persist(tx, &mut record)?;
            let id = record
                .id()
                .ok_or_else(|| StorageError::InvalidData("persist did not assign an id".into()))?;
            if options.reindex {
                index_engine::index_values(tx, record.thing(), None)?;
            }
            if options.silent {
                return Ok::<_, StorageError>((id, previous, None));
            }
            let kind = if inserted { ActionKind::Create } else { ActionKind::Update };
            let action = Action::new(id, kind, options.source.clone());
            actions::insert(tx, &action)?;
            Ok((id, previous, Some(action)))
        })?;

        let chain = record.cache_chain(id);
        // A submission moved to another place leaves the old place stale too.
        if let Some(old) = previous.as_ref().map(chain_of).filter(|old| *old != chain) {
            self.cache.clear(&CacheTarget::Thing(old));
        }
        self.cache.clear(&CacheTarget::Thing(chain));
        if let Some(action) = &action {
            self.cache.clear(&CacheTarget::Action(action.id, chain));
        }
        let kind = T::KIND;
        debug!(thing = %id, kind = %kind, action = ?action.map(|a| a.kind), "saved thing");
        Ok(record)
    }

    pub fn place(&self, id: ThingId) -> CoreResult<Place> {
        Ok(self.store.read(|c| things::require(c, id))?)
    }

    pub fn submission(&self, id: ThingId) -> CoreResult<Submission> {
        Ok(self.store.read(|c| things::require(c, id))?)
    }

    pub fn places(&self, query: &ThingQuery<Place>) -> CoreResult<Vec<Place>> {
        Ok(self.store.read(|c| query.fetch(c))?)
    }

    pub fn submissions(&self, query: &ThingQuery<Submission>) -> CoreResult<Vec<Submission>> {
        Ok(self.store.read(|c| query.fetch(c))?)
    }

    /// Hides a place or submission. A silent save: no action is recorded.
    pub fn hide_thing(&self, id: ThingId) -> CoreResult<()> {
        let kind = self
            .store
            .read(|c| things::thing_ref(c, id))?
            .map(|r| r.kind)
            .ok_or_else(|| StorageError::not_found("thing", id))?;
        let options = SaveOptions::silent().without_reindex();
        match kind {
            ThingKind::Place => {
                let mut place = self.place(id)?;
                place.thing.visible = false;
                self.save_place(place, &options)?;
            }
            ThingKind::Submission => {
                let mut submission = self.submission(id)?;
                submission.thing.visible = false;
                self.save_submission(submission, &options)?;
            }
        }
        info!(thing = %id, "hid thing");
        Ok(())
    }

    /// Hard-deletes a place or submission and everything it owns: a place's
    /// submissions, actions, attachments and indexed values. Attachment bytes
    /// are removed once the delete has committed.
    pub fn delete_thing(&self, id: ThingId) -> CoreResult<bool> {
        let removed = self.store.write(|tx| {
            let Some(r) = things::thing_ref(tx, id)? else {
                return Ok::<_, StorageError>(None);
            };
            let files = attachments::files_under(tx, id)?;
            things::delete(tx, id)?;
            Ok(Some((r, files)))
        })?;
        let Some((r, files)) = removed else {
            return Ok(false);
        };
        self.cache.clear(&CacheTarget::Thing(chain_of(&r)));
        self.remove_attachment_bytes(&files);
        info!(thing = %id, kind = %r.kind, attachments = files.len(), "deleted thing");
        Ok(true)
    }

    /// Audit trail of a thing, newest first.
    pub fn actions_for(&self, thing: ThingId) -> CoreResult<Vec<Action>> {
        Ok(self.store.read(|c| actions::for_thing(c, thing))?)
    }

    // ── Cloning ──────────────────────────────────────────────────

    /// Copies `source` into a new place with `overrides` applied. With
    /// `commit` the copy is saved as a new place; otherwise it is returned
    /// unsaved.
    pub fn clone_place(&self, source: &Place, overrides: Vec<FieldValue>, commit: bool) -> CoreResult<Place> {
        let copy = clone_entity(source, overrides)?;
        if commit {
            return self.save_place(copy, &SaveOptions::default());
        }
        Ok(copy)
    }

    pub fn clone_submission(
        &self,
        source: &Submission,
        overrides: Vec<FieldValue>,
        commit: bool,
    ) -> CoreResult<Submission> {
        let copy = clone_entity(source, overrides)?;
        if commit {
            return self.save_submission(copy, &SaveOptions::default());
        }
        Ok(copy)
    }

    // ── Attachments ──────────────────────────────────────────────

    /// Stores `data` for `thing` and records the attachment.
    pub fn add_attachment(
        &self,
        thing: ThingId,
        name: Option<String>,
        filename: &str,
        data: &[u8],
    ) -> CoreResult<Attachment> {
        let chain = self.thing_chain(thing)?;
        let mut attachment = Attachment::new(thing, name, filename);
        let generated = attachment.file.clone();
        let mut renames = 0;
        let stored = loop {
            match self.attachments.put(&attachment.file, data) {
                Ok(stored) => break stored,
                Err(BlobStoreError::AlreadyExists(_)) if renames < MAX_ATTACHMENT_RENAMES => {
                    renames += 1;
                    attachment.file = alternate_path(&generated, renames);
                }
                Err(err) => return Err(err.into()),
            }
        };
        if let Err(err) = self.store.write(|tx| attachments::insert(tx, &attachment)) {
            if let Err(cleanup) = self.attachments.delete(&attachment.file) {
                warn!(path = %attachment.file, error = %cleanup, "failed to remove orphaned attachment");
            }
            return Err(err.into());
        }
        self.cache.clear(&CacheTarget::Attachment(attachment.id, chain));
        debug!(thing = %thing, path = %stored.path, size = stored.size, "added attachment");
        Ok(attachment)
    }

    /// Deletes an attachment's metadata and then its bytes.
    pub fn delete_attachment(&self, id: AttachmentId) -> CoreResult<bool> {
        let removed = self.store.write(|tx| {
            let Some(attachment) = attachments::get(tx, id)? else {
                return Ok::<_, StorageError>(None);
            };
            let owner = things::thing_ref(tx, attachment.thing)?
                .ok_or_else(|| StorageError::not_found("thing", attachment.thing))?;
            attachments::delete(tx, id)?;
            Ok(Some((attachment, chain_of(&owner))))
        })?;
        let Some((attachment, chain)) = removed else {
            return Ok(false);
        };
        self.cache.clear(&CacheTarget::Attachment(id, chain));
        self.remove_attachment_bytes(std::slice::from_ref(&attachment.file));
        debug!(attachment = %id, path = %attachment.file, "deleted attachment");
        Ok(true)
    }

    /// Removes stored bytes. Failures are logged, not returned.
    fn remove_attachment_bytes(&self, paths: &[String]) {
        for path in paths {
            match self.attachments.delete(path) {
                Ok(()) | Err(BlobStoreError::NotFound(_)) => {}
                Err(err) => warn!(path = %path, error = %err, "failed to remove attachment bytes"),
            }
        }
    }

    pub fn attachments_for(&self, thing: ThingId) -> CoreResult<Vec<Attachment>> {
        Ok(self.store.read(|c| attachments::for_thing(c, thing))?)
    }

    pub fn attachment_data(&self, attachment: &Attachment) -> CoreResult<Vec<u8>> {
        Ok(self.attachments.get(&attachment.file)?)
    }

    // ── Webhooks and access ──────────────────────────────────────

    pub fn add_webhook(&self, dataset: DatasetId, submission_set: &str, url: &str) -> CoreResult<Webhook> {
        let hook = Webhook::new(dataset, submission_set, url);
        self.store.write(|tx| webhooks::insert(tx, &hook))?;
        info!(dataset = %dataset, "{hook}");
        Ok(hook)
    }

    pub fn webhooks_for(&self, dataset: DatasetId, submission_set: Option<&str>) -> CoreResult<Vec<Webhook>> {
        Ok(self.store.read(|c| webhooks::for_dataset(c, dataset, submission_set))?)
    }

    pub fn add_origin(&self, dataset: DatasetId, pattern: &str) -> CoreResult<Origin> {
        let origin = Origin::new(dataset, pattern)?;
        self.store.write(|tx| access::insert_origin(tx, &origin))?;
        Ok(origin)
    }

    pub fn origins(&self, dataset: DatasetId) -> CoreResult<Vec<Origin>> {
        Ok(self.store.read(|c| access::origins_for_dataset(c, dataset))?)
    }

    pub fn add_api_key(&self, dataset: DatasetId, key: &str) -> CoreResult<ApiKey> {
        let key = ApiKey::new(dataset, key);
        self.store.write(|tx| access::insert_key(tx, &key))?;
        Ok(key)
    }

    // ── Cached reads ─────────────────────────────────────────────

    /// Read-through cache for a representation of a place.
    pub fn cached_place<T, F>(&self, place: &Place, variant: &str, compute: F) -> CoreResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> CoreResult<T>,
    {
        let id = place
            .id()
            .ok_or_else(|| StorageError::InvalidData("cannot cache an unsaved place".into()))?;
        self.cache
            .get_or_set(&CacheTarget::Thing(place.cache_chain(id)), variant, compute)
    }

    /// Read-through cache for a representation of a dataset.
    pub fn cached_dataset<T, F>(&self, dataset: DatasetId, variant: &str, compute: F) -> CoreResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> CoreResult<T>,
    {
        self.cache.get_or_set(&CacheTarget::Dataset(dataset), variant, compute)
    }

    fn thing_chain(&self, id: ThingId) -> CoreResult<ThingChain> {
        let r = self
            .store
            .read(|c| things::thing_ref(c, id))?
            .ok_or_else(|| StorageError::not_found("thing", id))?;
        Ok(chain_of(&r))
    }
}

fn chain_of(r: &ThingRef) -> ThingChain {
    match r.place {
        Some(place) => ThingChain::submission(r.dataset, place, r.id),
        None => ThingChain::place(r.dataset, r.id),
    }
}

fn saved_dataset_id(dataset: &Dataset) -> CoreResult<DatasetId> {
    Ok(dataset
        .id
        .ok_or_else(|| StorageError::InvalidData("dataset has not been saved".into()))?)
}
