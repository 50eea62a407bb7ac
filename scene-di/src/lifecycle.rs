//! Host lifecycle adapter.
//!
//! This module connects the container to whatever drives the application's
//! object lifecycle (a game loop, a UI shell, a test). The host describes the
//! objects of a scope through the [`Scope`] trait and forwards its lifecycle
//! moments to a [`Lifecycle`]:
//!
//! 1. **Awake**: [`Lifecycle::awake`] runs the [`Installer`] (imports first) and,
//!    if configured, injects the scope that already exists
//! 2. **Start**: [`Lifecycle::start`] injects again when `auto_inject_on_start` is set
//! 3. **Scope entered**: [`Lifecycle::scope_entered`] injects a freshly loaded scope
//! 4. **Manual**: [`Lifecycle::inject_now`] and [`Lifecycle::clear`]
//!
//! Every injection pass is reported to callbacks registered with
//! [`Lifecycle::on_scope_entered`].
//!
//! A minimal object model, [`Scene`] / [`Node`] / [`Component`], is included
//! for hosts that do not bring their own.
//!
//! # Examples
//!
//! ```
//! use scene_di::{
//!     Container, Error, Inject, InjectionContext, Installer, InstallerOptions, Lifecycle, Node,
//!     Scene, Shared,
//! };
//!
//! struct Score(u32);
//!
//! #[derive(Default)]
//! struct ScoreLabel {
//!     score: Option<Shared<Score>>,
//! }
//!
//! impl Inject for ScoreLabel {
//!     fn inject(&mut self, ctx: &mut InjectionContext<'_>) {
//!         ctx.field("score", &mut self.score);
//!     }
//! }
//!
//! struct GameInstaller;
//!
//! impl Installer for GameInstaller {
//!     fn install(&self, container: &Container) -> Result<(), Error> {
//!         container.register_value(Score(42))
//!     }
//! }
//!
//! let mut scene = Scene::new("main").with_root(Node::new("hud").with_component(ScoreLabel::default()));
//!
//! let mut lifecycle = Lifecycle::new(GameInstaller, InstallerOptions::default());
//! let report = lifecycle.awake(&mut scene).unwrap().unwrap();
//! assert_eq!(report.injected_targets(), 1);
//!
//! let label = scene.find("hud").unwrap().component::<ScoreLabel>().unwrap();
//! assert_eq!(label.score.as_ref().unwrap().0, 42);
//! ```

use std::any::Any;
use std::fmt;

use crate::config::{InstallMode, InstallerOptions};
use crate::container::Container;
use crate::error::Error;
use crate::injector::{BatchReport, Inject};
use crate::runtime::Shared;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info};

/// A set of injection targets the host can enumerate.
pub trait Scope {
    fn name(&self) -> &str;

    /// Calls `visit` once per target, in a stable order.
    fn visit_targets(&mut self, visit: &mut dyn FnMut(&mut dyn Inject));
}

impl Container {
    /// Injects every target of `scope`, isolating failures per target.
    pub fn inject_scope(&self, scope: &mut dyn Scope) -> BatchReport {
        let mut batch = BatchReport::default();
        scope.visit_targets(&mut |target: &mut dyn Inject| batch.push(self.inject_into(target)));

        #[cfg(feature = "tracing")]
        info!(
            scope = scope.name(),
            targets = batch.targets(),
            injected = batch.injected_targets(),
            failed = batch.failed_targets(),
            "Injected scope"
        );

        batch
    }
}

/// An injectable object living on a [`Node`].
///
/// Implemented automatically for every `Inject + Any` type.
pub trait Component: Inject + Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_inject_mut(&mut self) -> &mut dyn Inject;
}

impl<T: Inject + Any> Component for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_inject_mut(&mut self) -> &mut dyn Inject {
        self
    }
}

/// A named object holding components and child nodes.
///
/// As a [`Scope`], a node yields its own components, then its children's,
/// depth-first.
pub struct Node {
    name: String,
    components: Vec<Box<dyn Component>>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_component<T: Component>(mut self, component: T) -> Self {
        self.add_component(component);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_component<T: Component>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn component<T: Any>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|component| component.as_any().downcast_ref::<T>())
    }

    pub fn component_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
    }

    /// All components of type `T` in this node and its descendants.
    pub fn components_in_children<T: Any>(&self) -> Vec<&T> {
        let mut found: Vec<&T> = self
            .components
            .iter()
            .filter_map(|component| component.as_any().downcast_ref::<T>())
            .collect();
        for child in &self.children {
            found.extend(child.components_in_children::<T>());
        }
        found
    }

    /// Finds a descendant by `/`-separated path relative to this node.
    pub fn find(&self, path: &str) -> Option<&Node> {
        let (head, rest) = split_path(path);
        let child = self.children.iter().find(|child| child.name == head)?;
        match rest {
            Some(rest) => child.find(rest),
            None => Some(child),
        }
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Node> {
        let (head, rest) = split_path(path);
        let child = self.children.iter_mut().find(|child| child.name == head)?;
        match rest {
            Some(rest) => child.find_mut(rest),
            None => Some(child),
        }
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

impl Scope for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit_targets(&mut self, visit: &mut dyn FnMut(&mut dyn Inject)) {
        for component in &mut self.components {
            visit(component.as_inject_mut());
        }
        for child in &mut self.children {
            child.visit_targets(visit);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("components", &self.components.len())
            .field("children", &self.children)
            .finish()
    }
}

/// A named collection of root nodes.
#[derive(Debug)]
pub struct Scene {
    name: String,
    roots: Vec<Node>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roots: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: Node) -> Self {
        self.roots.push(root);
        self
    }

    pub fn add_root(&mut self, root: Node) {
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Finds a node by `/`-separated path starting at a root's name.
    pub fn find(&self, path: &str) -> Option<&Node> {
        let (head, rest) = split_path(path);
        let root = self.roots.iter().find(|root| root.name == head)?;
        match rest {
            Some(rest) => root.find(rest),
            None => Some(root),
        }
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Node> {
        let (head, rest) = split_path(path);
        let root = self.roots.iter_mut().find(|root| root.name == head)?;
        match rest {
            Some(rest) => root.find_mut(rest),
            None => Some(root),
        }
    }
}

impl Scope for Scene {
    fn name(&self) -> &str {
        &self.name
    }

    fn visit_targets(&mut self, visit: &mut dyn FnMut(&mut dyn Inject)) {
        for root in &mut self.roots {
            root.visit_targets(visit);
        }
    }
}

/// Registers an application's dependencies.
///
/// An installer that owns state the rest of the scene should see registers a
/// handle to it as an instance. The host keeps its own clone, so both sides
/// share one value:
///
/// ```
/// use scene_di::{Container, Error, Installer, Shared};
///
/// struct Settings {
///     volume: u8,
/// }
///
/// struct AudioInstaller {
///     settings: Shared<Settings>,
/// }
///
/// impl Installer for AudioInstaller {
///     fn install(&self, container: &Container) -> Result<(), Error> {
///         container.register_instance(self.settings.clone())
///     }
/// }
///
/// let settings = Shared::new(Settings { volume: 7 });
/// let container = Container::new();
/// AudioInstaller { settings: settings.clone() }.install(&container).unwrap();
///
/// let resolved = container.resolve::<Settings>().unwrap();
/// assert!(Shared::ptr_eq(&resolved, &settings));
/// assert_eq!(resolved.volume, 7);
/// ```
pub trait Installer {
    /// Installers run before this one, depth-first.
    fn imports(&self) -> Vec<Box<dyn Installer>> {
        vec![]
    }

    fn install(&self, container: &Container) -> Result<(), Error>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The lifecycle moment that caused an injection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Awake,
    Start,
    ScopeEntered,
    Manual,
}

/// Passed to [`Lifecycle::on_scope_entered`] callbacks after each injection pass.
#[derive(Debug)]
pub struct ScopeEvent<'a> {
    pub trigger: Trigger,
    pub scope: &'a str,
    pub report: &'a BatchReport,
}

type Listener = Box<dyn FnMut(&ScopeEvent<'_>)>;

enum State {
    Pending(Box<dyn Installer>),
    Installed,
    /// Another global installer already set up the shared container.
    Skipped,
}

/// Drives an [`Installer`] and scope injection from host lifecycle callbacks.
pub struct Lifecycle {
    container: Shared<Container>,
    installer_name: &'static str,
    state: State,
    options: InstallerOptions,
    listeners: Vec<Listener>,
}

impl Lifecycle {
    /// Creates a lifecycle with its own fresh container.
    pub fn new(installer: impl Installer + 'static, options: InstallerOptions) -> Self {
        let container = Shared::new(Container::with_options(options.container.clone()));
        Self::with_container(container, installer, options)
    }

    /// Creates a lifecycle installing into an existing, possibly shared, container.
    pub fn with_container(
        container: Shared<Container>,
        installer: impl Installer + 'static,
        options: InstallerOptions,
    ) -> Self {
        Self {
            container,
            installer_name: installer.name(),
            state: State::Pending(Box::new(installer)),
            options,
            listeners: Vec::new(),
        }
    }

    pub fn container(&self) -> Shared<Container> {
        self.container.clone()
    }

    pub fn options(&self) -> &InstallerOptions {
        &self.options
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.state, State::Installed)
    }

    /// Whether `awake` found the container already set up by another global installer.
    pub fn is_skipped(&self) -> bool {
        matches!(self.state, State::Skipped)
    }

    /// Registers a callback run after every injection pass.
    pub fn on_scope_entered<F>(&mut self, callback: F)
    where
        F: FnMut(&ScopeEvent<'_>) + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    /// Installs dependencies, then injects `scope` if `inject_existing_scope` is set.
    ///
    /// Returns `Ok(None)` when nothing was injected, including when a global
    /// installation already happened on the shared container.
    ///
    /// If the installer fails, every registration it made is rolled back and
    /// the lifecycle stays pending, so `awake` can be called again.
    ///
    /// # Errors
    ///
    /// - `AlreadyInstalled` when called a second time
    /// - any registration error raised by the installer
    pub fn awake(&mut self, scope: &mut dyn Scope) -> Result<Option<BatchReport>, Error> {
        let installer = match std::mem::replace(&mut self.state, State::Installed) {
            State::Pending(installer) => installer,
            previous => {
                self.state = previous;
                return Err(Error::already_installed(self.installer_name));
            }
        };

        match self.options.mode {
            InstallMode::Global => {
                if self.container.is_globally_installed() {
                    #[cfg(feature = "tracing")]
                    info!(
                        installer = self.installer_name,
                        "Container already installed globally; skipping"
                    );

                    self.state = State::Skipped;
                    return Ok(None);
                }
            }
            InstallMode::Local => self.container.clear(),
        }

        #[cfg(feature = "tracing")]
        info!(
            installer = self.installer_name,
            mode = ?self.options.mode,
            "Installing dependencies"
        );

        let checkpoint = self.container.registry().checkpoint();
        if let Err(failure) = self.load(installer.as_ref()) {
            #[cfg(feature = "tracing")]
            error!(
                installer = self.installer_name,
                kind = ?failure.kind,
                "Installation failed; rolling back: {}",
                failure.message
            );

            self.container.registry().rollback(checkpoint);
            self.state = State::Pending(installer);
            return Err(failure);
        }

        if self.options.mode == InstallMode::Global {
            self.container.mark_globally_installed();
        }

        if !self.options.inject_existing_scope {
            return Ok(None);
        }

        Ok(Some(self.inject(scope, Trigger::Awake)))
    }

    fn load(&self, installer: &dyn Installer) -> Result<(), Error> {
        let imports = installer.imports();

        #[cfg(feature = "tracing")]
        if !imports.is_empty() {
            debug!(
                installer = installer.name(),
                imports = imports.len(),
                "Loading imported installers first"
            );
        }

        for import in imports {
            self.load(import.as_ref())?;
        }

        installer.install(&self.container)
    }

    /// Injects `scope` when installed and `auto_inject_on_start` is set.
    pub fn start(&mut self, scope: &mut dyn Scope) -> Option<BatchReport> {
        if !self.is_installed() || !self.options.auto_inject_on_start {
            return None;
        }
        Some(self.inject(scope, Trigger::Start))
    }

    /// Scope-load hook: injects the newly entered `scope`.
    pub fn scope_entered(&mut self, scope: &mut dyn Scope) -> BatchReport {
        self.inject(scope, Trigger::ScopeEntered)
    }

    /// Manual trigger: injects `scope` now.
    pub fn inject_now(&mut self, scope: &mut dyn Scope) -> BatchReport {
        self.inject(scope, Trigger::Manual)
    }

    /// Manual reset of the container. The installer does not run again.
    pub fn clear(&self) {
        self.container.clear();
    }

    fn inject(&mut self, scope: &mut dyn Scope, trigger: Trigger) -> BatchReport {
        #[cfg(feature = "tracing")]
        debug!(scope = scope.name(), ?trigger, "Injection pass");

        let report = self.container.inject_scope(scope);

        let event = ScopeEvent {
            trigger,
            scope: scope.name(),
            report: &report,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }

        report
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("installer", &self.installer_name)
            .field("installed", &self.is_installed())
            .field("options", &self.options)
            .field("listeners", &self.listeners.len())
            .field("container", &self.container.id())
            .finish()
    }
}

/// Injects a single subtree from its own awake callback.
#[derive(Debug, Clone)]
pub struct ComponentInjector {
    container: Shared<Container>,
    inject_on_awake: bool,
}

impl ComponentInjector {
    pub fn new(container: Shared<Container>) -> Self {
        Self {
            container,
            inject_on_awake: true,
        }
    }

    pub fn inject_on_awake(mut self, enabled: bool) -> Self {
        self.inject_on_awake = enabled;
        self
    }

    pub fn awake(&self, subtree: &mut dyn Scope) -> Option<BatchReport> {
        if !self.inject_on_awake {
            return None;
        }
        Some(self.inject(subtree))
    }

    pub fn inject(&self, subtree: &mut dyn Scope) -> BatchReport {
        self.container.inject_scope(subtree)
    }
}
