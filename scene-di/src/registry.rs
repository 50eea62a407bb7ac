//! Type-keyed registration store and singleton cache.
//!
//! The [`Registry`] maps each [`Capability`] to exactly one [`Registration`]
//! and keeps the instances built for it so far. It performs no construction
//! itself; the [`Container`](crate::Container) drives resolution on top of it.
//!
//! No borrow or lock is held across calls: every accessor clones what it hands
//! out, so producers may freely re-enter the registry while they run. The one
//! exception is the per-capability production gate, which the container holds
//! while a producer runs so that a capability is built at most once.

use std::collections::HashMap;
use std::fmt;

use crate::capability::Capability;
use crate::config::{ContainerOptions, DuplicatePolicy};
use crate::error::Error;
use crate::producer::Producer;
use crate::runtime::{AnyShared, Shared, Store, read, write};

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// What a capability was registered with.
#[derive(Clone)]
pub enum Registration {
    /// Built on first resolution, then cached.
    Producer(Shared<Producer>),
    /// Pre-built value returned as-is forever.
    Instance(AnyShared),
}

impl Registration {
    /// Human-readable description of the binding, for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Registration::Producer(producer) => producer.implementation(),
            Registration::Instance(_) => "a fixed instance",
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Registration::Instance(_))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Producer(producer) => f.debug_tuple("Producer").field(producer).finish(),
            Registration::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

#[derive(Default)]
struct Entries {
    bindings: HashMap<Capability, Registration>,
    order: Vec<Capability>,
}

/// Position in the registration order, returned by [`Registry::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

pub struct Registry {
    options: ContainerOptions,
    entries: Store<Entries>,
    singletons: Store<HashMap<Capability, AnyShared>>,
    gates: Store<HashMap<Capability, Shared<Store<()>>>>,
}

impl Registry {
    pub fn new(options: ContainerOptions) -> Self {
        Self {
            options,
            entries: Store::new(Entries::default()),
            singletons: Store::new(HashMap::new()),
            gates: Store::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Records `registration` for `capability`.
    ///
    /// An existing registration is never replaced. Depending on the
    /// [`DuplicatePolicy`], the attempt fails with `DuplicateRegistration` or
    /// is logged and ignored.
    pub fn register(&self, capability: Capability, registration: Registration) -> Result<(), Error> {
        let mut entries = write(&self.entries);

        if let Some(existing) = entries.bindings.get(&capability) {
            return match self.options.duplicate_policy {
                DuplicatePolicy::Reject => Err(Error::duplicate_registration(
                    capability.name(),
                    existing.describe(),
                )),
                DuplicatePolicy::Ignore => {
                    #[cfg(feature = "tracing")]
                    warn!(
                        capability = capability.name(),
                        kept = existing.describe(),
                        "Ignoring duplicate registration"
                    );
                    Ok(())
                }
            };
        }

        #[cfg(feature = "tracing")]
        debug!(
            capability = capability.name(),
            binding = registration.describe(),
            "Registered capability"
        );

        entries.bindings.insert(capability, registration);
        entries.order.push(capability);
        Ok(())
    }

    pub fn lookup(&self, capability: &Capability) -> Option<Registration> {
        read(&self.entries).bindings.get(capability).cloned()
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        read(&self.entries).bindings.contains_key(capability)
    }

    /// Registered capabilities, in registration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        read(&self.entries).order.clone()
    }

    pub fn len(&self) -> usize {
        read(&self.entries).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cached(&self, capability: &Capability) -> Option<AnyShared> {
        let cached = read(&self.singletons).get(capability).cloned();

        #[cfg(feature = "tracing")]
        if cached.is_some() {
            trace!(capability = capability.name(), "Singleton cache hit");
        }

        cached
    }

    /// Caches `instance` unless a value is already cached, and returns the cached value.
    ///
    /// The first write wins, so concurrent resolutions converge on one instance.
    pub fn cache(&self, capability: Capability, instance: AnyShared) -> AnyShared {
        write(&self.singletons)
            .entry(capability)
            .or_insert(instance)
            .clone()
    }

    /// Lock serializing the producer runs of `capability`.
    ///
    /// Holding its write guard while producing and caching makes concurrent
    /// first resolutions wait for the first one instead of building again.
    pub(crate) fn gate(&self, capability: Capability) -> Shared<Store<()>> {
        write(&self.gates)
            .entry(capability)
            .or_insert_with(|| Shared::new(Store::new(())))
            .clone()
    }

    /// Marks the current end of the registration order.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(read(&self.entries).order.len())
    }

    /// Removes every registration made after `checkpoint`, with its cached instance.
    ///
    /// Registrations that existed at the checkpoint are untouched.
    pub fn rollback(&self, checkpoint: Checkpoint) {
        let mut entries = write(&self.entries);
        if checkpoint.0 >= entries.order.len() {
            return;
        }

        let removed: Vec<Capability> = entries.order.drain(checkpoint.0..).collect();
        let mut singletons = write(&self.singletons);
        for capability in &removed {
            entries.bindings.remove(capability);
            singletons.remove(capability);
        }

        #[cfg(feature = "tracing")]
        debug!(removed = removed.len(), "Rolled back registrations");
    }

    pub fn cached_len(&self) -> usize {
        read(&self.singletons).len()
    }

    /// Drops every registration and cached instance. Idempotent.
    pub fn clear(&self) {
        let mut entries = write(&self.entries);
        let mut singletons = write(&self.singletons);

        #[cfg(feature = "tracing")]
        debug!(
            registrations = entries.order.len(),
            singletons = singletons.len(),
            "Clearing registry"
        );

        entries.bindings.clear();
        entries.order.clear();
        singletons.clear();
        write(&self.gates).clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(ContainerOptions::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.options)
            .field("capabilities", &self.capabilities())
            .field("singletons", &self.cached_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::instance::Instance;

    struct Audio;
    struct Input;

    fn fixed<T: crate::runtime::Service>(value: T) -> Registration {
        Registration::Instance(Instance::new(Shared::new(value)).erase())
    }

    #[test]
    fn register_then_lookup() {
        let registry = Registry::default();
        registry
            .register(Capability::of::<Audio>(), fixed(Audio))
            .unwrap();

        assert!(registry.contains(&Capability::of::<Audio>()));
        assert!(registry.lookup(&Capability::of::<Audio>()).unwrap().is_instance());
        assert!(registry.lookup(&Capability::of::<Input>()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_is_rejected_and_first_kept() {
        let registry = Registry::default();
        let capability = Capability::of::<Audio>();
        registry
            .register(capability, Registration::Producer(Shared::new(Producer::default_of::<String>())))
            .unwrap();

        let err = registry.register(capability, fixed(Audio)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateRegistration);

        let kept = registry.lookup(&capability).unwrap();
        assert!(!kept.is_instance());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_is_ignored_when_configured() {
        let registry =
            Registry::new(ContainerOptions::new().duplicate_policy(DuplicatePolicy::Ignore));
        let capability = Capability::of::<Audio>();
        registry
            .register(capability, Registration::Producer(Shared::new(Producer::default_of::<String>())))
            .unwrap();

        assert!(registry.register(capability, fixed(Audio)).is_ok());
        assert!(!registry.lookup(&capability).unwrap().is_instance());
    }

    #[test]
    fn capabilities_keep_registration_order() {
        let registry = Registry::default();
        registry.register(Capability::of::<Input>(), fixed(Input)).unwrap();
        registry.register(Capability::of::<Audio>(), fixed(Audio)).unwrap();

        assert_eq!(
            registry.capabilities(),
            vec![Capability::of::<Input>(), Capability::of::<Audio>()]
        );
    }

    #[test]
    fn cache_keeps_first_value() {
        let registry = Registry::default();
        let capability = Capability::of::<u32>();
        let first = Instance::new(Shared::new(1u32)).erase();
        let second = Instance::new(Shared::new(2u32)).erase();

        registry.cache(capability, first);
        let kept = registry.cache(capability, second);

        let value = Instance::<u32>::recover(kept).unwrap();
        assert_eq!(*value, 1);
    }

    #[test]
    fn rollback_removes_only_later_registrations() {
        let registry = Registry::default();
        registry.register(Capability::of::<Input>(), fixed(Input)).unwrap();
        let checkpoint = registry.checkpoint();

        registry.register(Capability::of::<Audio>(), fixed(Audio)).unwrap();
        registry.cache(
            Capability::of::<Audio>(),
            Instance::new(Shared::new(Audio)).erase(),
        );
        registry.rollback(checkpoint);

        assert_eq!(registry.capabilities(), vec![Capability::of::<Input>()]);
        assert!(registry.cached(&Capability::of::<Audio>()).is_none());

        // Nothing after the checkpoint is a no-op.
        registry.rollback(checkpoint);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn gate_is_shared_per_capability() {
        let registry = Registry::default();
        let first = registry.gate(Capability::of::<Audio>());
        let again = registry.gate(Capability::of::<Audio>());
        let other = registry.gate(Capability::of::<Input>());

        assert!(Shared::ptr_eq(&first, &again));
        assert!(!Shared::ptr_eq(&first, &other));
    }

    #[test]
    fn clear_is_idempotent() {
        let registry = Registry::default();
        registry.register(Capability::of::<Audio>(), fixed(Audio)).unwrap();
        registry.cache(
            Capability::of::<Audio>(),
            Instance::new(Shared::new(Audio)).erase(),
        );

        registry.clear();
        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.cached_len(), 0);
        assert!(registry.cached(&Capability::of::<Audio>()).is_none());
    }
}
