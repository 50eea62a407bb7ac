//! Dependency declarations for constructors and injection methods.
//!
//! There is no runtime reflection to discover an "injectable constructor", so a
//! type opts into constructor injection by implementing [`Construct`]. Its
//! body resolves whatever it needs from the container, usually in one call to
//! [`Container::resolve_all`] with a [`Dependencies`] tuple:
//!
//! ```
//! use scene_di::{Construct, Container, Error, Shared};
//!
//! struct Database;
//! struct Cache;
//!
//! struct UserService {
//!     db: Shared<Database>,
//!     cache: Option<Shared<Cache>>,
//! }
//!
//! impl Construct for UserService {
//!     fn construct(container: &Container) -> Result<Self, Error> {
//!         let (db, cache) = container.resolve_all::<(Shared<Database>, Option<Shared<Cache>>)>()?;
//!         Ok(Self { db, cache })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_value(Database).unwrap();
//! container.register_type::<UserService>().unwrap();
//!
//! let users = container.resolve::<UserService>().unwrap();
//! assert!(users.cache.is_none());
//! ```

use crate::container::Container;
use crate::error::Error;
use crate::runtime::{Service, Shared};

/// A type the container can build by resolving its own dependencies.
pub trait Construct: Sized {
    fn construct(container: &Container) -> Result<Self, Error>;
}

/// A set of capabilities resolved together.
///
/// Implemented for `Shared<C>` (required), `Option<Shared<C>>` (optional:
/// `None` when `C` is not registered) and tuples of up to eight of those.
pub trait Dependencies: Sized {
    fn resolve_from(container: &Container) -> Result<Self, Error>;
}

impl<C: ?Sized + Service> Dependencies for Shared<C> {
    fn resolve_from(container: &Container) -> Result<Self, Error> {
        container.resolve::<C>()
    }
}

impl<C: ?Sized + Service> Dependencies for Option<Shared<C>> {
    fn resolve_from(container: &Container) -> Result<Self, Error> {
        if !container.is_registered::<C>() {
            return Ok(None);
        }
        container.resolve::<C>().map(Some)
    }
}

impl Dependencies for () {
    fn resolve_from(_container: &Container) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! impl_dependencies_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Dependencies),+> Dependencies for ($($name,)+) {
            fn resolve_from(container: &Container) -> Result<Self, Error> {
                Ok(($($name::resolve_from(container)?,)+))
            }
        }
    };
}

impl_dependencies_for_tuple!(A);
impl_dependencies_for_tuple!(A, B);
impl_dependencies_for_tuple!(A, B, C);
impl_dependencies_for_tuple!(A, B, C, D);
impl_dependencies_for_tuple!(A, B, C, D, E);
impl_dependencies_for_tuple!(A, B, C, D, E, F);
impl_dependencies_for_tuple!(A, B, C, D, E, F, G);
impl_dependencies_for_tuple!(A, B, C, D, E, F, G, H);
