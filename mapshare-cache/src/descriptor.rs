//! Cache keys and the ownership chains they are invalidated along.
//!
//! Every cached entity type has a [`CacheDescriptor`] that turns a
//! [`CacheTarget`] into its own key and the keys of its ancestors. Clearing an
//! attachment or action clears its thing, a submission clears its place, and
//! everything clears its dataset.

use mapshare_types::{ActionId, AttachmentId, DatasetId, ThingId};
use std::fmt;

/// Entity types that have cached representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Dataset,
    Place,
    Submission,
    Action,
    Attachment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Place => "place",
            EntityKind::Submission => "submission",
            EntityKind::Action => "action",
            EntityKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a thing sits: its dataset, its place (itself, for a place) and, for
/// submissions, its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThingChain {
    pub dataset: DatasetId,
    pub place: ThingId,
    pub submission: Option<ThingId>,
}

impl ThingChain {
    pub fn place(dataset: DatasetId, place: ThingId) -> Self {
        Self {
            dataset,
            place,
            submission: None,
        }
    }

    pub fn submission(dataset: DatasetId, place: ThingId, submission: ThingId) -> Self {
        Self {
            dataset,
            place,
            submission: Some(submission),
        }
    }

    /// The thing itself.
    pub fn id(&self) -> ThingId {
        self.submission.unwrap_or(self.place)
    }
}

/// Something whose cached representations can be read or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTarget {
    Dataset(DatasetId),
    Thing(ThingChain),
    Action(ActionId, ThingChain),
    Attachment(AttachmentId, ThingChain),
}

impl CacheTarget {
    pub fn kind(&self) -> EntityKind {
        match self {
            CacheTarget::Dataset(_) => EntityKind::Dataset,
            CacheTarget::Thing(chain) if chain.submission.is_some() => EntityKind::Submission,
            CacheTarget::Thing(_) => EntityKind::Place,
            CacheTarget::Action(..) => EntityKind::Action,
            CacheTarget::Attachment(..) => EntityKind::Attachment,
        }
    }

    pub fn dataset(&self) -> DatasetId {
        match self {
            CacheTarget::Dataset(id) => *id,
            CacheTarget::Thing(chain)
            | CacheTarget::Action(_, chain)
            | CacheTarget::Attachment(_, chain) => chain.dataset,
        }
    }

    /// The owning thing's chain, for everything below a dataset.
    pub fn chain(&self) -> Option<&ThingChain> {
        match self {
            CacheTarget::Dataset(_) => None,
            CacheTarget::Thing(chain)
            | CacheTarget::Action(_, chain)
            | CacheTarget::Attachment(_, chain) => Some(chain),
        }
    }

    fn entity_id(&self) -> String {
        match self {
            CacheTarget::Dataset(id) => id.to_string(),
            CacheTarget::Thing(chain) => chain.id().to_string(),
            CacheTarget::Action(id, _) => id.to_string(),
            CacheTarget::Attachment(id, _) => id.to_string(),
        }
    }

    /// This target's key followed by every ancestor key, nearest first.
    pub fn invalidation_keys(&self) -> Vec<String> {
        let descriptor = descriptor_for(self.kind());
        let mut keys = vec![descriptor.compute_key(self)];
        keys.extend(descriptor.ancestor_keys(self));
        keys
    }
}

/// Key derivation for one entity type.
pub trait CacheDescriptor: Sync {
    fn kind(&self) -> EntityKind;

    /// Deterministic key for `target`.
    fn compute_key(&self, target: &CacheTarget) -> String {
        format!("{}:{}", self.kind(), target.entity_id())
    }

    /// Keys that must be invalidated along with `target`'s own.
    fn ancestor_keys(&self, target: &CacheTarget) -> Vec<String>;
}

struct DatasetDescriptor;
struct PlaceDescriptor;
struct SubmissionDescriptor;
struct ActionDescriptor;
struct AttachmentDescriptor;

fn dataset_key(dataset: DatasetId) -> String {
    DatasetDescriptor.compute_key(&CacheTarget::Dataset(dataset))
}

/// Keys of the thing a chain ends at, and that thing's ancestors.
fn thing_keys(chain: &ThingChain) -> Vec<String> {
    CacheTarget::Thing(*chain).invalidation_keys()
}

impl CacheDescriptor for DatasetDescriptor {
    fn kind(&self) -> EntityKind {
        EntityKind::Dataset
    }

    fn ancestor_keys(&self, _target: &CacheTarget) -> Vec<String> {
        Vec::new()
    }
}

impl CacheDescriptor for PlaceDescriptor {
    fn kind(&self) -> EntityKind {
        EntityKind::Place
    }

    fn ancestor_keys(&self, target: &CacheTarget) -> Vec<String> {
        vec![dataset_key(target.dataset())]
    }
}

impl CacheDescriptor for SubmissionDescriptor {
    fn kind(&self) -> EntityKind {
        EntityKind::Submission
    }

    fn ancestor_keys(&self, target: &CacheTarget) -> Vec<String> {
        match target.chain() {
            Some(chain) => thing_keys(&ThingChain::place(chain.dataset, chain.place)),
            None => vec![dataset_key(target.dataset())],
        }
    }
}

impl CacheDescriptor for ActionDescriptor {
    fn kind(&self) -> EntityKind {
        EntityKind::Action
    }

    fn ancestor_keys(&self, target: &CacheTarget) -> Vec<String> {
        target.chain().map(thing_keys).unwrap_or_default()
    }
}

impl CacheDescriptor for AttachmentDescriptor {
    fn kind(&self) -> EntityKind {
        EntityKind::Attachment
    }

    fn ancestor_keys(&self, target: &CacheTarget) -> Vec<String> {
        target.chain().map(thing_keys).unwrap_or_default()
    }
}

static REGISTRY: [&'static dyn CacheDescriptor; 5] = [
    &DatasetDescriptor,
    &PlaceDescriptor,
    &SubmissionDescriptor,
    &ActionDescriptor,
    &AttachmentDescriptor,
];

/// The registered descriptor for `kind`.
pub fn descriptor_for(kind: EntityKind) -> &'static dyn CacheDescriptor {
    let index = match kind {
        EntityKind::Dataset => 0,
        EntityKind::Place => 1,
        EntityKind::Submission => 2,
        EntityKind::Action => 3,
        EntityKind::Attachment => 4,
    };
    REGISTRY[index]
}
