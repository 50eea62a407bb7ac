//! The dependency injection container.
//!
//! A [`Container`] owns a [`Registry`] and resolves capabilities against it:
//!
//! - `register_*`: record how a capability is provided (setup phase)
//! - [`resolve`](Container::resolve): return the singleton for a capability,
//!   building it on first use
//! - [`clear`](Container::clear): forget every registration and instance
//!
//! Containers are plain values. Create one per application scope (and one per
//! test); nothing is process-global.
//!
//! # Examples
//!
//! ```
//! use scene_di::{Construct, Container, Error, Shared};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 {
//!         7
//!     }
//! }
//!
//! impl Construct for FixedClock {
//!     fn construct(_container: &Container) -> Result<Self, Error> {
//!         Ok(FixedClock)
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_as::<dyn Clock, FixedClock>(|clock| clock).unwrap();
//!
//! let first = container.resolve::<dyn Clock>().unwrap();
//! let second = container.resolve::<dyn Clock>().unwrap();
//! assert_eq!(first.now(), 7);
//! assert!(Shared::ptr_eq(&first, &second));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::capability::Capability;
use crate::config::ContainerOptions;
use crate::construct::{Construct, Dependencies};
use crate::error::Error;
use crate::instance::Instance;
use crate::producer::Producer;
use crate::registry::{Registration, Registry};
use crate::resolve_guard::ResolveGuard;
use crate::runtime::{AnyShared, Service, Shared, write};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

pub struct Container {
    id: u64,
    registry: Registry,
    /// Set once a global installer has run; survives [`clear`](Container::clear).
    globally_installed: AtomicBool,
}

impl Container {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        let id = NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        info!(container = id, policy = ?options.duplicate_policy, "Creating container");

        Self {
            id,
            registry: Registry::new(options),
            globally_installed: AtomicBool::new(false),
        }
    }

    /// Process-unique identity of this container.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether a global installer already set up this container.
    ///
    /// Not a registration: it is invisible to the registry and kept by `clear`.
    pub fn is_globally_installed(&self) -> bool {
        self.globally_installed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_globally_installed(&self) {
        self.globally_installed.store(true, Ordering::Release);
    }

    /// Registers `producer` as the recipe for `capability`.
    pub fn register(&self, capability: Capability, producer: Producer) -> Result<(), Error> {
        self.registry
            .register(capability, Registration::Producer(Shared::new(producer)))
    }

    /// Registers a factory closure for capability `C`.
    pub fn register_producer<C, F>(&self, factory: F) -> Result<(), Error>
    where
        C: ?Sized + Service,
        F: Fn(&Container) -> Result<Shared<C>, Error> + Service,
    {
        self.register(Capability::of::<C>(), Producer::from_fn::<C, F>(factory))
    }

    /// Registers `T` as its own capability, built through [`Construct`].
    pub fn register_type<T>(&self) -> Result<(), Error>
    where
        T: Construct + Service,
    {
        self.register(Capability::of::<T>(), Producer::construct::<T>())
    }

    /// Registers implementation `T` for capability `C` (usually `dyn Trait`).
    ///
    /// `upcast` converts the built `Shared<T>` into `Shared<C>`; the identity
    /// closure `|value| value` is enough for trait objects.
    pub fn register_as<C, T>(&self, upcast: fn(Shared<T>) -> Shared<C>) -> Result<(), Error>
    where
        C: ?Sized + Service,
        T: Construct + Service,
    {
        self.register(Capability::of::<C>(), Producer::construct_as::<C, T>(upcast))
    }

    /// Registers `T` built through [`Default`], for types with nothing to inject.
    pub fn register_default<T>(&self) -> Result<(), Error>
    where
        T: Default + Service,
    {
        self.register(Capability::of::<T>(), Producer::default_of::<T>())
    }

    /// Registers a pre-built instance as the permanent value of capability `C`.
    pub fn register_instance<C>(&self, instance: Shared<C>) -> Result<(), Error>
    where
        C: ?Sized + Service,
    {
        self.registry.register(
            Capability::of::<C>(),
            Registration::Instance(Instance::new(instance).erase()),
        )
    }

    /// Registers `value` as the permanent value of its own type.
    pub fn register_value<T>(&self, value: T) -> Result<(), Error>
    where
        T: Service,
    {
        self.register_instance::<T>(Shared::new(value))
    }

    pub fn lookup(&self, capability: &Capability) -> Option<Registration> {
        self.registry.lookup(capability)
    }

    pub fn is_registered<C>(&self) -> bool
    where
        C: ?Sized + 'static,
    {
        self.registry.contains(&Capability::of::<C>())
    }

    /// Resolves capability `C`, building and caching it on first use.
    ///
    /// # Errors
    ///
    /// - `UnregisteredCapability` if nothing is registered for `C` (or for a
    ///   dependency its producer requires)
    /// - `CyclicDependency` if producing `C` requires `C` again
    /// - `ConstructionFailure` if a producer reports one
    pub fn resolve<C>(&self) -> Result<Shared<C>, Error>
    where
        C: ?Sized + Service,
    {
        let capability = Capability::of::<C>();

        if let Some(cached) = self.registry.cached(&capability) {
            return Instance::<C>::recover(cached)
                .ok_or_else(|| Error::type_mismatch(capability.name()));
        }

        let registration = self
            .registry
            .lookup(&capability)
            .ok_or_else(|| Error::unregistered_capability(capability.name()))?;

        let built = match registration {
            Registration::Instance(instance) => self.registry.cache(capability, instance),
            Registration::Producer(producer) => self.produce(capability, &producer)?,
        };

        Instance::<C>::recover(built).ok_or_else(|| Error::type_mismatch(capability.name()))
    }

    /// Runs `producer` for `capability` and caches the result.
    ///
    /// The cycle check comes first so that re-entering the same capability on
    /// this thread fails instead of waiting on its own gate. Callers racing on
    /// the gate find the first caller's instance in the cache.
    fn produce(&self, capability: Capability, producer: &Producer) -> Result<AnyShared, Error> {
        let _guard = ResolveGuard::push(self.id, capability)?;
        let gate = self.registry.gate(capability);
        let _turn = write(&gate);

        if let Some(cached) = self.registry.cached(&capability) {
            return Ok(cached);
        }

        #[cfg(feature = "tracing")]
        debug!(
            capability = capability.name(),
            implementation = producer.implementation(),
            depth = ResolveGuard::depth(self.id),
            "Producing instance"
        );

        let built = producer.produce(self)?;
        Ok(self.registry.cache(capability, built))
    }

    /// Like [`resolve`](Container::resolve), discarding the error.
    pub fn optional_resolve<C>(&self) -> Option<Shared<C>>
    where
        C: ?Sized + Service,
    {
        self.resolve::<C>().ok()
    }

    /// Resolves a whole [`Dependencies`] set, e.g. a tuple of `Shared<_>`.
    pub fn resolve_all<D>(&self) -> Result<D, Error>
    where
        D: Dependencies,
    {
        D::resolve_from(self)
    }

    /// Drops all registrations and cached instances.
    ///
    /// Must not run while a resolution is in flight on this container.
    pub fn clear(&self) {
        #[cfg(feature = "tracing")]
        info!(container = self.id, "Clearing container");

        self.registry.clear();
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .field("globally_installed", &self.is_globally_installed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::runtime::{Store, read, write};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    impl Construct for English {
        fn construct(_container: &Container) -> Result<Self, Error> {
            Ok(English)
        }
    }

    struct French;

    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".to_string()
        }
    }

    impl Construct for French {
        fn construct(_container: &Container) -> Result<Self, Error> {
            Ok(French)
        }
    }

    struct Reception {
        greeter: Shared<dyn Greeter>,
    }

    impl Construct for Reception {
        fn construct(container: &Container) -> Result<Self, Error> {
            Ok(Self {
                greeter: container.resolve::<dyn Greeter>()?,
            })
        }
    }

    struct Alpha {
        _beta: Shared<Beta>,
    }

    struct Beta {
        _alpha: Shared<Alpha>,
    }

    impl Construct for Alpha {
        fn construct(container: &Container) -> Result<Self, Error> {
            Ok(Self {
                _beta: container.resolve::<Beta>()?,
            })
        }
    }

    impl Construct for Beta {
        fn construct(container: &Container) -> Result<Self, Error> {
            Ok(Self {
                _alpha: container.resolve::<Alpha>()?,
            })
        }
    }

    struct SelfReferential;

    impl Construct for SelfReferential {
        fn construct(container: &Container) -> Result<Self, Error> {
            container.resolve::<SelfReferential>()?;
            Ok(SelfReferential)
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk unavailable")]
    struct DiskUnavailable;

    struct Storage;

    impl Construct for Storage {
        fn construct(_container: &Container) -> Result<Self, Error> {
            Err(Error::construction_failure(
                std::any::type_name::<Self>(),
                DiskUnavailable,
            ))
        }
    }

    #[test]
    fn duplicate_registration_fails_and_keeps_first() {
        let container = Container::new();
        container.register_as::<dyn Greeter, English>(|g| g).unwrap();

        let err = container
            .register_as::<dyn Greeter, French>(|g| g)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateRegistration);

        let greeter = container.resolve::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn resolve_unregistered_fails() {
        let container = Container::new();
        let err = container.resolve::<dyn Greeter>().err().unwrap();
        assert_eq!(err.kind, ErrorKind::UnregisteredCapability);
        assert!(err.message.contains("Greeter"));
    }

    #[test]
    fn producer_resolves_to_a_singleton() {
        let container = Container::new();
        container.register_type::<English>().unwrap();

        let first = container.resolve::<English>().unwrap();
        let second = container.resolve::<English>().unwrap();
        assert!(Shared::ptr_eq(&first, &second));
    }

    #[test]
    fn instance_registration_preserves_identity() {
        let built = Store::new(0u32);
        let counter = Shared::new(built);
        let container = Container::new();
        container.register_instance(counter.clone()).unwrap();

        let resolved = container.resolve::<Store<u32>>().unwrap();
        assert!(Shared::ptr_eq(&counter, &resolved));

        *write(&resolved) += 1;
        assert_eq!(*read(&counter), 1);
    }

    #[test]
    fn producer_runs_once_for_cached_values() {
        let calls = Shared::new(Store::new(0u32));
        let counted = calls.clone();

        let container = Container::new();
        container
            .register_producer::<English, _>(move |_| {
                *write(&counted) += 1;
                Ok(Shared::new(English))
            })
            .unwrap();

        assert_eq!(*read(&calls), 0);
        container.resolve::<English>().unwrap();
        container.resolve::<English>().unwrap();
        assert_eq!(*read(&calls), 1);
    }

    #[test]
    fn fixed_instance_never_runs_a_producer() {
        let calls = Shared::new(Store::new(0u32));
        let counted = calls.clone();
        let fixed: Shared<dyn Greeter> = Shared::new(French);

        let container = Container::new();
        container
            .register_producer::<English, _>(move |_| {
                *write(&counted) += 1;
                Ok(Shared::new(English))
            })
            .unwrap();
        container.register_instance(fixed.clone()).unwrap();

        let first = container.resolve::<dyn Greeter>().unwrap();
        let second = container.resolve::<dyn Greeter>().unwrap();

        assert_eq!(*read(&calls), 0);
        assert!(Shared::ptr_eq(&first, &fixed));
        assert!(Shared::ptr_eq(&second, &fixed));
    }

    #[test]
    fn global_installation_flag_survives_clear() {
        let container = Container::new();
        container.register_value(English).unwrap();
        assert!(!container.is_globally_installed());

        container.mark_globally_installed();
        container.clear();

        assert!(container.is_globally_installed());
        assert!(container.registry().is_empty());
    }

    #[cfg(feature = "thread-safe")]
    #[test]
    fn concurrent_first_resolution_builds_once() {
        use std::sync::Barrier;
        use std::sync::atomic::AtomicUsize;
        use std::thread;
        use std::time::Duration;

        let builds = Shared::new(AtomicUsize::new(0));
        let counted = builds.clone();

        let container = Shared::new(Container::new());
        container
            .register_producer::<English, _>(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(Shared::new(English))
            })
            .unwrap();

        let barrier = Shared::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let container = container.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    container.resolve::<English>().unwrap()
                })
            })
            .collect();

        let resolved: Vec<Shared<English>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for greeter in &resolved[1..] {
            assert!(Shared::ptr_eq(&resolved[0], greeter));
        }
    }

    #[test]
    fn constructor_dependencies_are_resolved_recursively() {
        let container = Container::new();
        container.register_as::<dyn Greeter, French>(|g| g).unwrap();
        container.register_type::<Reception>().unwrap();

        let reception = container.resolve::<Reception>().unwrap();
        let greeter = container.resolve::<dyn Greeter>().unwrap();
        assert_eq!(reception.greeter.greet(), "bonjour");
        assert!(Shared::ptr_eq(&reception.greeter, &greeter));
    }

    #[test]
    fn missing_constructor_dependency_propagates() {
        let container = Container::new();
        container.register_type::<Reception>().unwrap();

        let err = container.resolve::<Reception>().err().unwrap();
        assert_eq!(err.kind, ErrorKind::UnregisteredCapability);
        assert_eq!(err.capability, Some(std::any::type_name::<dyn Greeter>()));
        assert!(container.registry().cached(&Capability::of::<Reception>()).is_none());
    }

    #[test]
    fn two_step_cycle_is_detected() {
        let container = Container::new();
        container.register_type::<Alpha>().unwrap();
        container.register_type::<Beta>().unwrap();

        let err = container.resolve::<Alpha>().err().unwrap();
        assert_eq!(err.kind, ErrorKind::CyclicDependency);
        assert!(err.message.contains("Alpha"));
        assert!(err.message.contains("Beta"));

        // The stack unwinds fully, so the next attempt fails the same way.
        assert_eq!(ResolveGuard::depth(container.id()), 0);
        let again = container.resolve::<Beta>().err().unwrap();
        assert_eq!(again.kind, ErrorKind::CyclicDependency);
    }

    #[test]
    fn self_dependency_is_detected() {
        let container = Container::new();
        container.register_type::<SelfReferential>().unwrap();

        let err = container.resolve::<SelfReferential>().err().unwrap();
        assert_eq!(err.kind, ErrorKind::CyclicDependency);
    }

    #[test]
    fn construction_failure_carries_cause() {
        use std::error::Error as _;

        let container = Container::new();
        container.register_type::<Storage>().unwrap();

        let err = container.resolve::<Storage>().err().unwrap();
        assert_eq!(err.kind, ErrorKind::ConstructionFailure);
        assert_eq!(err.source().unwrap().to_string(), "disk unavailable");
    }

    #[test]
    fn clear_drops_cached_instances() {
        let container = Container::new();
        container.register_type::<English>().unwrap();
        let before = container.resolve::<English>().unwrap();

        container.clear();
        assert!(!container.is_registered::<English>());
        assert!(container.resolve::<English>().is_err());

        container
            .register_producer::<English, _>(|_| Ok(Shared::new(English)))
            .unwrap();
        let after = container.resolve::<English>().unwrap();
        assert!(!Shared::ptr_eq(&before, &after));
    }

    #[test]
    fn default_producer_path() {
        let container = Container::new();
        container.register_default::<Vec<String>>().unwrap();

        let list = container.resolve::<Vec<String>>().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn optional_resolve_swallows_errors() {
        let container = Container::new();
        assert!(container.optional_resolve::<English>().is_none());

        container.register_value(English).unwrap();
        assert!(container.optional_resolve::<English>().is_some());
    }

    #[test]
    fn containers_are_isolated() {
        let first = Container::new();
        let second = Container::new();
        first.register_value(English).unwrap();

        assert!(first.resolve::<English>().is_ok());
        assert!(second.resolve::<English>().is_err());
        assert_ne!(first.id(), second.id());
    }
}
