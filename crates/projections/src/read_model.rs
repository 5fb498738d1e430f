//! Read model trait for query-side views.

/// A read model providing query access to denormalized data.
///
/// Implementors are also [`Projection`](crate::Projection)s; this trait only
/// exposes what callers need to inspect the view without querying it.
pub trait ReadModel: Send + Sync {
    /// Returns the name of this read model.
    fn name(&self) -> &'static str;

    /// Returns the number of entries in this read model.
    fn count(&self) -> usize;
}
