//! Container and installer settings.

/// What the registry does when a capability is registered a second time.
///
/// The first registration is kept either way; it is never overwritten.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail the second registration with `DuplicateRegistration`.
    #[default]
    Reject,
    /// Log the second registration and report success without applying it.
    Ignore,
}

#[derive(Clone, Debug, Default)]
pub struct ContainerOptions {
    pub duplicate_policy: DuplicatePolicy,
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// How an installer relates to the container it installs into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InstallMode {
    /// Installs once per container; later global installers on the same container are skipped.
    #[default]
    Global,
    /// Clears the container before installing, for self-contained sub-scenes.
    Local,
}

/// Settings of a [`Lifecycle`](crate::lifecycle::Lifecycle).
#[derive(Clone, Debug)]
pub struct InstallerOptions {
    pub mode: InstallMode,
    /// Inject the scope handed to `awake` right after installing.
    pub inject_existing_scope: bool,
    /// Inject the scope handed to `start`.
    pub auto_inject_on_start: bool,
    pub container: ContainerOptions,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            mode: InstallMode::Global,
            inject_existing_scope: true,
            auto_inject_on_start: true,
            container: ContainerOptions::default(),
        }
    }
}

impl InstallerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn inject_existing_scope(mut self, enabled: bool) -> Self {
        self.inject_existing_scope = enabled;
        self
    }

    pub fn auto_inject_on_start(mut self, enabled: bool) -> Self {
        self.auto_inject_on_start = enabled;
        self
    }

    pub fn container(mut self, options: ContainerOptions) -> Self {
        self.container = options;
        self
    }
}
