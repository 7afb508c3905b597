//! Resolution of configured references to typed backend objects.

use async_trait::async_trait;
use skiff_common::SkiffResult;

use crate::reference::{ObjectRef, TypedRef};

/// Resolves an opaque configured reference to its concrete backend object.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolve `reference` against the backend inventory.
    ///
    /// # Errors
    ///
    /// Returns [`skiff_common::SkiffError::ReferenceResolution`] if the
    /// object does not exist or cannot be typed.
    async fn resolve(&self, reference: &ObjectRef) -> SkiffResult<TypedRef>;
}
