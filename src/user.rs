//! Per-reporter end-user identity.

use std::sync::{PoisonError, RwLock};

use crate::record::Fields;

/// The end user a reporter currently attributes errors to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserIdentity {
    /// The user id, if one has been set.
    pub id: Option<String>,
    /// Additional properties, merged by [`UserIdentity::merge_properties`].
    pub properties: Fields,
}

impl UserIdentity {
    /// Merges `properties` into the current ones. Keys present in both are
    /// overwritten; all other keys are kept.
    pub fn merge_properties(&mut self, properties: &Fields) {
        for (key, value) in properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    /// Whether an id has been set.
    pub fn is_identified(&self) -> bool {
        self.id.is_some()
    }
}

/// Lock-guarded [`UserIdentity`] owned by a single reporter.
///
/// Reporters are shared behind `Arc`, so the identity needs interior
/// mutability. A poisoned lock is recovered: the identity is plain data and
/// stays consistent even if a writer panicked.
#[derive(Debug, Default)]
pub(crate) struct UserSlot(RwLock<UserIdentity>);

impl UserSlot {
    pub(crate) fn identify(&self, id: &str) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).id = Some(id.to_owned());
    }

    pub(crate) fn merge_properties(&self, properties: &Fields) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge_properties(properties);
    }

    pub(crate) fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = UserIdentity::default();
    }

    pub(crate) fn snapshot(&self) -> UserIdentity {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
