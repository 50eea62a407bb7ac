//! Thread-local resolution stack for cyclic dependency detection.
//!
//! [`ResolveGuard`] records every capability currently being produced on this
//! thread, together with the identity of the container producing it. Re-entering
//! a capability that is already on the stack for the same container fails with
//! [`ErrorKind::CyclicDependency`](crate::ErrorKind::CyclicDependency) and the
//! full chain, instead of recursing until the stack overflows.
//!
//! # Example
//! ```
//! use scene_di::{Capability, ErrorKind, ResolveGuard};
//!
//! struct A;
//! struct B;
//!
//! let _a = ResolveGuard::push(1, Capability::of::<A>()).unwrap();
//! let _b = ResolveGuard::push(1, Capability::of::<B>()).unwrap();
//! let err = ResolveGuard::push(1, Capability::of::<A>()).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::CyclicDependency);
//!
//! // Another container may resolve A while this one is busy with it.
//! let _other = ResolveGuard::push(2, Capability::of::<A>()).unwrap();
//! ```

use std::cell::RefCell;

use crate::capability::Capability;
use crate::error::Error;

thread_local! {
    static RESOLVE_STACK: RefCell<Vec<(u64, Capability)>> = const { RefCell::new(Vec::new()) };
}

/// Pops its capability from the thread-local stack on drop.
#[derive(Debug)]
pub struct ResolveGuard {
    container: u64,
    capability: Capability,
}

impl ResolveGuard {
    /// Pushes `capability` for `container` onto the stack.
    ///
    /// Returns `Err(Error::cyclic_dependency(..))` if it is already being resolved there.
    pub fn push(container: u64, capability: Capability) -> Result<Self, Error> {
        RESOLVE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.contains(&(container, capability)) {
                let chain: Vec<&'static str> = stack
                    .iter()
                    .filter(|(owner, _)| *owner == container)
                    .map(|(_, entry)| entry.name())
                    .chain(std::iter::once(capability.name()))
                    .collect();
                return Err(Error::cyclic_dependency(&chain));
            }

            stack.push((container, capability));
            Ok(Self {
                container,
                capability,
            })
        })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Depth of the stack for `container` on this thread.
    pub fn depth(container: u64) -> usize {
        RESOLVE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .filter(|(owner, _)| *owner == container)
                .count()
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack
                .iter()
                .rposition(|entry| *entry == (self.container, self.capability))
            {
                stack.remove(position);
            }
        });
    }
}
