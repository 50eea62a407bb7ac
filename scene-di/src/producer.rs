//! Producers: registered recipes for building a capability on demand.
//!
//! A [`Producer`] wraps a factory closure that receives the [`Container`] so
//! it can resolve its own dependencies. The factory output is type-erased into
//! an [`AnyShared`] holding an [`Instance<C>`], which lets the registry store
//! producers for sized and unsized capabilities side by side.
//!
//! # Feature Flags
//!
//! - **With `thread-safe`**: factories and produced values must be `Send + Sync`
//! - **Without `thread-safe`**: single-threaded factories and values are allowed
//!
//! # Examples
//!
//! ```
//! use scene_di::{Container, Producer, Shared};
//!
//! let producer = Producer::from_fn::<u32, _>(|_container| Ok(Shared::new(42)));
//! assert!(producer.implementation().contains("u32"));
//!
//! let container = Container::new();
//! let value = producer.produce(&container).unwrap();
//! assert_eq!(*value.downcast_ref::<scene_di::Instance<u32>>().unwrap().value(), 42);
//! ```

use std::fmt;

use crate::construct::Construct;
use crate::container::Container;
use crate::error::Error;
use crate::instance::Instance;
use crate::runtime::{AnyShared, Service, Shared};

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "thread-safe")]
type Factory = Box<dyn Fn(&Container) -> Result<AnyShared, Error> + Send + Sync + 'static>;
#[cfg(not(feature = "thread-safe"))]
type Factory = Box<dyn Fn(&Container) -> Result<AnyShared, Error> + 'static>;

/// A factory for one capability, tagged with the type it builds.
pub struct Producer {
    implementation: &'static str,
    factory: Factory,
}

impl Producer {
    /// Producer backed by an arbitrary factory returning `Shared<C>`.
    pub fn from_fn<C, F>(factory: F) -> Self
    where
        C: ?Sized + Service,
        F: Fn(&Container) -> Result<Shared<C>, Error> + Service,
    {
        Self {
            implementation: std::any::type_name::<C>(),
            factory: Box::new(move |container: &Container| {
                let value = factory(container)?;
                Ok(Instance::new(value).erase())
            }),
        }
    }

    /// Producer running `T::construct`, the constructor-injection path.
    pub fn construct<T>() -> Self
    where
        T: Construct + Service,
    {
        Self::construct_as::<T, T>(|value| value)
    }

    /// Producer running `T::construct` and publishing the result as capability `C`.
    ///
    /// `upcast` is normally the identity closure `|value| value`, which lets the
    /// compiler coerce `Shared<T>` into `Shared<dyn Trait>`.
    pub fn construct_as<C, T>(upcast: fn(Shared<T>) -> Shared<C>) -> Self
    where
        C: ?Sized + Service,
        T: Construct + Service,
    {
        Self {
            implementation: std::any::type_name::<T>(),
            factory: Box::new(move |container: &Container| {
                #[cfg(feature = "tracing")]
                debug!(
                    implementation = std::any::type_name::<T>(),
                    "Running constructor injection"
                );

                let value = T::construct(container)?;
                Ok(Instance::new(upcast(Shared::new(value))).erase())
            }),
        }
    }

    /// Producer for types without declared dependencies, built through [`Default`].
    pub fn default_of<T>() -> Self
    where
        T: Default + Service,
    {
        Self {
            implementation: std::any::type_name::<T>(),
            factory: Box::new(|_container: &Container| {
                Ok(Instance::new(Shared::new(T::default())).erase())
            }),
        }
    }

    /// Type name of what this producer builds.
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn produce(&self, container: &Container) -> Result<AnyShared, Error> {
        (self.factory)(container)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}
