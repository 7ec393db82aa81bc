//! Entity identity and tagged cross-entity references.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// Opaque stable identifier assigned to every entity at creation.
pub type EntityId = Uuid;

/// The three persisted entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Blog,
    Comment,
}

impl EntityKind {
    /// Lowercase label used in logs and storage diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Blog => "blog",
            Self::Comment => "comment",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every persisted entity type.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
}

/// Reference to another entity, tagged with the target kind at the type level.
///
/// A `Ref<Blog>` can only be stored where a blog is expected; the runtime
/// tag is available through [`Ref::kind`]. A reference may dangle: resolving
/// it is a lookup that can come back empty.
pub struct Ref<T> {
    id: EntityId,
    target: PhantomData<fn() -> T>,
}

impl<T: Entity> Ref<T> {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            target: PhantomData,
        }
    }

    /// Reference pointing at `entity`.
    pub fn to(entity: &T) -> Self {
        Self::new(entity.id())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: Entity> Debug for Ref<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ref<{}>({})", T::KIND, self.id)
    }
}

impl<T> Display for Ref<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.id, f)
    }
}

impl<T: Entity> From<EntityId> for Ref<T> {
    fn from(value: EntityId) -> Self {
        Self::new(value)
    }
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, T: Entity> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EntityId::deserialize(deserializer).map(Self::new)
    }
}
