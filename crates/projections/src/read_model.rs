//! Read model trait for query-side views.

/// A read model providing query access to denormalized data.
///
/// Read models are updated only by projections. They serve as a secondary
/// index over the event log and can lag it until pending events are published.
pub trait ReadModel: Send + Sync {
    /// Returns the name of this read model.
    fn name(&self) -> &'static str;

    /// Returns the number of rows, or 0 while a writer holds the lock.
    fn count(&self) -> usize;
}
