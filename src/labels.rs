use std::sync::Arc;

/// An opaque, shared-ownership label payload.
///
/// The original host kept labels alive as a runtime value reachable
/// through a global handle; the core here only needs to pass the value
/// through to whatever serializer the embedder uses, so it is modeled as
/// an `Arc<dyn Any>`-like opaque blob with reference-counted sharing and
/// no introspection.
#[derive(Clone)]
pub struct Labels(Arc<dyn std::any::Any + Send + Sync>);

impl Labels {
    pub fn new<T: std::any::Any + Send + Sync>(value: T) -> Self {
        Labels(Arc::new(value))
    }

    /// Attempts to downcast back to the concrete type the embedder stored.
    pub fn downcast_ref<T: std::any::Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Identity comparison: two `Labels` are the "same" label set iff they
    /// share the underlying allocation, matching `SetLabels`/`GetLabels`
    /// semantics (every sample captured between two `SetLabels` calls
    /// carries the exact same handle).
    pub fn same_handle(&self, other: &Labels) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Labels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Labels(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_handle_identifies_shared_allocation() {
        let a = Labels::new(42u32);
        let b = a.clone();
        let c = Labels::new(42u32);
        assert!(a.same_handle(&b));
        assert!(!a.same_handle(&c));
    }

    #[test]
    fn downcast_recovers_concrete_value() {
        let l = Labels::new(String::from("request-id"));
        assert_eq!(l.downcast_ref::<String>().map(String::as_str), Some("request-id"));
        assert_eq!(l.downcast_ref::<u32>(), None);
    }
}
