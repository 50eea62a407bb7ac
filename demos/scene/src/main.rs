use scene_di::{
    Construct, Container, Error, Inject, InjectionContext, Installer, InstallerOptions, Lifecycle,
    Node, Scene, Shared,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct Welcome;

impl Greeter for Welcome {
    fn greet(&self, name: &str) -> String {
        format!("Welcome, {}!", name)
    }
}

impl Construct for Welcome {
    fn construct(_container: &Container) -> Result<Self, Error> {
        Ok(Welcome)
    }
}

struct Inventory {
    slots: usize,
}

#[derive(Default)]
struct PlayerHud {
    greeter: Option<Shared<dyn Greeter>>,
    inventory: Option<Shared<Inventory>>,
}

impl Inject for PlayerHud {
    fn inject(&mut self, ctx: &mut InjectionContext<'_>) {
        ctx.field("greeter", &mut self.greeter);
        ctx.field("inventory", &mut self.inventory);
    }
}

struct Leaderboard;

#[derive(Default)]
struct ScorePanel {
    leaderboard: Option<Shared<Leaderboard>>,
}

impl Inject for ScorePanel {
    fn inject(&mut self, ctx: &mut InjectionContext<'_>) {
        ctx.field("leaderboard", &mut self.leaderboard);
    }
}

struct GameInstaller;

impl Installer for GameInstaller {
    fn install(&self, container: &Container) -> Result<(), Error> {
        container.register_as::<dyn Greeter, Welcome>(|greeter| greeter)?;
        container.register_value(Inventory { slots: 12 })
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut scene = Scene::new("town")
        .with_root(Node::new("hud").with_component(PlayerHud::default()))
        // Leaderboard is never registered: this panel is reported and skipped.
        .with_root(Node::new("scores").with_component(ScorePanel::default()));

    let mut lifecycle = Lifecycle::new(GameInstaller, InstallerOptions::default());
    lifecycle.on_scope_entered(|event| {
        info!(
            trigger = ?event.trigger,
            scope = event.scope,
            injected = event.report.injected_targets(),
            failed = event.report.failed_targets(),
            "Scope injected"
        );
    });

    lifecycle.awake(&mut scene)?;

    if let Some(hud) = scene.find("hud").and_then(|node| node.component::<PlayerHud>()) {
        if let (Some(greeter), Some(inventory)) = (&hud.greeter, &hud.inventory) {
            info!("{} ({} slots)", greeter.greet("traveller"), inventory.slots);
        }
    }

    let mut dungeon = Scene::new("dungeon")
        .with_root(Node::new("hud").with_component(PlayerHud::default()));
    let report = lifecycle.scope_entered(&mut dungeon);
    info!(targets = report.targets(), "Entered dungeon");

    Ok(())
}
