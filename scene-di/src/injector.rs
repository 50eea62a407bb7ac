//! Member injection into objects the container does not own.
//!
//! A target declares its injectable members by implementing [`Inject`]. The
//! container walks them through an [`InjectionContext`]:
//!
//! - [`field`](InjectionContext::field) fills an `Option<Shared<C>>` slot
//! - [`method`](InjectionContext::method) calls a closure with a resolved
//!   [`Dependencies`] set, only if every parameter resolved
//!
//! Members are processed in declaration order. A member that cannot be
//! resolved is recorded as an [`InjectionFailure`] and the remaining members
//! still run, so one broken dependency never blocks the rest of the target,
//! and one broken target never blocks the rest of a batch.
//!
//! # Examples
//!
//! ```
//! use scene_di::{Container, Inject, InjectionContext, Shared};
//!
//! struct Score(u32);
//! struct Audio;
//!
//! #[derive(Default)]
//! struct Hud {
//!     score: Option<Shared<Score>>,
//!     audio: Option<Shared<Audio>>,
//! }
//!
//! impl Inject for Hud {
//!     fn inject(&mut self, ctx: &mut InjectionContext<'_>) {
//!         ctx.field("score", &mut self.score);
//!         ctx.field("audio", &mut self.audio);
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_value(Score(10)).unwrap();
//!
//! let mut hud = Hud::default();
//! let report = container.inject_into(&mut hud);
//!
//! assert_eq!(report.injected, 1);
//! assert_eq!(report.failures.len(), 1);
//! assert_eq!(hud.score.unwrap().0, 10);
//! ```

use std::borrow::Cow;

use crate::construct::Dependencies;
use crate::container::Container;
use crate::error::Error;
use crate::runtime::{Service, Shared};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// An object whose members are filled by the container.
pub trait Inject {
    /// Declares every injectable member, in order, on `ctx`.
    fn inject(&mut self, ctx: &mut InjectionContext<'_>);

    /// Identity used in reports and logs.
    fn target_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// One declared member that could not be satisfied.
#[derive(Clone, Debug)]
pub struct InjectionFailure {
    pub target: String,
    pub member: &'static str,
    /// `ErrorKind::InjectionFailure`, with the resolution error as its source.
    pub error: Error,
}

impl InjectionFailure {
    /// The capability that failed to resolve.
    pub fn capability(&self) -> Option<&'static str> {
        self.error.capability
    }
}

/// Outcome of injecting one target.
#[derive(Clone, Debug, Default)]
pub struct InjectionReport {
    pub target: String,
    /// Number of members satisfied.
    pub injected: usize,
    pub failures: Vec<InjectionFailure>,
}

impl InjectionReport {
    /// Whether at least one member was satisfied.
    pub fn is_injected(&self) -> bool {
        self.injected > 0
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of injecting a batch of targets.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<InjectionReport>,
}

impl BatchReport {
    pub fn targets(&self) -> usize {
        self.reports.len()
    }

    /// Targets with at least one satisfied member.
    pub fn injected_targets(&self) -> usize {
        self.reports.iter().filter(|r| r.is_injected()).count()
    }

    pub fn injected_members(&self) -> usize {
        self.reports.iter().map(|r| r.injected).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InjectionFailure> {
        self.reports.iter().flat_map(|r| r.failures.iter())
    }

    pub fn failed_targets(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_clean()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(InjectionReport::is_clean)
    }

    pub fn push(&mut self, report: InjectionReport) {
        self.reports.push(report);
    }

    pub fn extend(&mut self, other: BatchReport) {
        self.reports.extend(other.reports);
    }
}

/// Handed to [`Inject::inject`]; resolves members and records the outcome.
pub struct InjectionContext<'c> {
    container: &'c Container,
    target: String,
    injected: usize,
    failures: Vec<InjectionFailure>,
}

impl<'c> InjectionContext<'c> {
    fn new(container: &'c Container, target: String) -> Self {
        Self {
            container,
            target,
            injected: 0,
            failures: Vec::new(),
        }
    }

    pub fn container(&self) -> &'c Container {
        self.container
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Resolves `C` into `slot`. Returns whether the member was satisfied.
    ///
    /// On failure `slot` is left untouched.
    pub fn field<C>(&mut self, member: &'static str, slot: &mut Option<Shared<C>>) -> bool
    where
        C: ?Sized + Service,
    {
        match self.container.resolve::<C>() {
            Ok(value) => {
                *slot = Some(value);
                self.satisfied(member);
                true
            }
            Err(error) => {
                self.fail(member, error);
                false
            }
        }
    }

    /// Resolves every parameter of `D`, then calls `apply` with them.
    ///
    /// `apply` is not called if any parameter fails.
    pub fn method<D, F>(&mut self, member: &'static str, apply: F) -> bool
    where
        D: Dependencies,
        F: FnOnce(D),
    {
        match D::resolve_from(self.container) {
            Ok(dependencies) => {
                apply(dependencies);
                self.satisfied(member);
                true
            }
            Err(error) => {
                self.fail(member, error);
                false
            }
        }
    }

    #[allow(unused_variables)]
    fn satisfied(&mut self, member: &'static str) {
        #[cfg(feature = "tracing")]
        debug!(target_object = %self.target, member, "Injected member");

        self.injected += 1;
    }

    fn fail(&mut self, member: &'static str, cause: Error) {
        let error = Error::injection_failure(&self.target, member, cause);

        #[cfg(feature = "tracing")]
        warn!(
            target_object = %self.target,
            member,
            capability = error.capability.unwrap_or("<unknown>"),
            "{}",
            error.message
        );

        self.failures.push(InjectionFailure {
            target: self.target.clone(),
            member,
            error,
        });
    }

    fn finish(self) -> InjectionReport {
        InjectionReport {
            target: self.target,
            injected: self.injected,
            failures: self.failures,
        }
    }
}

impl Container {
    /// Injects every member `target` declares.
    ///
    /// Never fails as a whole: unresolved members are listed in the report.
    pub fn inject_into(&self, target: &mut dyn Inject) -> InjectionReport {
        let name = target.target_name().into_owned();
        let mut ctx = InjectionContext::new(self, name);
        target.inject(&mut ctx);
        ctx.finish()
    }

    /// Injects each target in turn; a failing target does not stop the batch.
    pub fn inject_all<'t, I>(&self, targets: I) -> BatchReport
    where
        I: IntoIterator<Item = &'t mut dyn Inject>,
    {
        let mut batch = BatchReport::default();
        for target in targets {
            batch.push(self.inject_into(target));
        }

        #[cfg(feature = "tracing")]
        info!(
            targets = batch.targets(),
            injected = batch.injected_targets(),
            failed = batch.failed_targets(),
            "Batch injection finished"
        );

        batch
    }
}
