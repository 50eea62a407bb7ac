//! Runtime type definitions for shared ownership and interior mutability.
//!
//! This module provides conditional type aliases based on the `thread-safe` feature flag:
//!
//! - When `thread-safe` is enabled: `Arc` and `RwLock`, and every service must be `Send + Sync`
//! - When `thread-safe` is disabled: `Rc` and `RefCell`
//!
//! The rest of the crate is written once against these aliases and the [`read`] / [`write`]
//! helpers, so no impl block has to be duplicated per feature.
//!
//! # Examples
//!
//! ```
//! use scene_di::runtime::{read, write, Shared, Store};
//!
//! let store = Store::new(42);
//! *write(&store) += 1;
//! assert_eq!(*read(&store), 43);
//!
//! let shared = Shared::new(store);
//! assert_eq!(*read(shared.as_ref()), 43);
//! ```

use std::any::Any;

#[cfg(feature = "thread-safe")]
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(not(feature = "thread-safe"))]
use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// Smart pointer for shared ownership.
///
/// [`Arc<T>`] with the `thread-safe` feature, [`Rc<T>`] otherwise.
#[cfg(feature = "thread-safe")]
pub type Shared<T> = Arc<T>;
#[cfg(not(feature = "thread-safe"))]
pub type Shared<T> = Rc<T>;

/// Interior mutability cell.
///
/// [`RwLock<T>`] with the `thread-safe` feature, [`RefCell<T>`] otherwise.
#[cfg(feature = "thread-safe")]
pub type Store<T> = RwLock<T>;
#[cfg(not(feature = "thread-safe"))]
pub type Store<T> = RefCell<T>;

#[cfg(feature = "thread-safe")]
pub type ReadGuard<'a, T> = RwLockReadGuard<'a, T>;
#[cfg(not(feature = "thread-safe"))]
pub type ReadGuard<'a, T> = Ref<'a, T>;

#[cfg(feature = "thread-safe")]
pub type WriteGuard<'a, T> = RwLockWriteGuard<'a, T>;
#[cfg(not(feature = "thread-safe"))]
pub type WriteGuard<'a, T> = RefMut<'a, T>;

/// Type-erased shared value as kept in the registry and the singleton cache.
#[cfg(feature = "thread-safe")]
pub type AnyShared = Shared<dyn Any + Send + Sync>;
#[cfg(not(feature = "thread-safe"))]
pub type AnyShared = Shared<dyn Any>;

/// Bound required from everything the container stores.
///
/// `Send + Sync + 'static` with the `thread-safe` feature, `'static` otherwise.
/// Implemented automatically; it only exists so generic code names one bound.
#[cfg(feature = "thread-safe")]
pub trait Service: Send + Sync + 'static {}
#[cfg(feature = "thread-safe")]
impl<T: ?Sized + Send + Sync + 'static> Service for T {}

#[cfg(not(feature = "thread-safe"))]
pub trait Service: 'static {}
#[cfg(not(feature = "thread-safe"))]
impl<T: ?Sized + 'static> Service for T {}

/// Shared read access to a [`Store`].
///
/// A poisoned lock is recovered: the container never leaves its maps half-written.
#[cfg(feature = "thread-safe")]
pub fn read<T>(store: &Store<T>) -> ReadGuard<'_, T> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}
#[cfg(not(feature = "thread-safe"))]
pub fn read<T>(store: &Store<T>) -> ReadGuard<'_, T> {
    store.borrow()
}

/// Exclusive write access to a [`Store`].
#[cfg(feature = "thread-safe")]
pub fn write<T>(store: &Store<T>) -> WriteGuard<'_, T> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}
#[cfg(not(feature = "thread-safe"))]
pub fn write<T>(store: &Store<T>) -> WriteGuard<'_, T> {
    store.borrow_mut()
}
