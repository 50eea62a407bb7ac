use crate::runtime::{AnyShared, Service, Shared};

/// Sized carrier for a `Shared<C>` so that unsized capabilities
/// (`dyn Trait`) can be type-erased into an [`AnyShared`] and recovered intact.
pub struct Instance<C: ?Sized + 'static> {
    value: Shared<C>,
}

impl<C: ?Sized + Service> Instance<C> {
    pub fn new(value: Shared<C>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Shared<C> {
        self.value.clone()
    }

    pub fn erase(self) -> AnyShared {
        Shared::new(self)
    }

    /// Recovers the value from an erased instance, `None` if `erased` holds another capability.
    pub fn recover(erased: AnyShared) -> Option<Shared<C>> {
        erased
            .downcast::<Instance<C>>()
            .ok()
            .map(|instance| instance.value())
    }
}

impl<C: ?Sized + 'static> Clone for Instance<C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}
