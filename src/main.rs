use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use keyhop::common::config::Config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "keyhop", version, about = "Keyboard-driven window switcher")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse and validate the configuration, then exit.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    if let Some(Command::CheckConfig) = cli.command {
        println!("configuration ok");
        return Ok(());
    }

    run(config)
}

#[cfg(target_os = "macos")]
fn run(config: Config) -> anyhow::Result<()> {
    use keyhop::input::KeyEventHandler;
    use keyhop::sys::event_tap::EventTap;
    use keyhop::sys::overlay_panel::OverlayPanels;
    use keyhop::sys::window_server::WindowServer;
    use objc2::MainThreadMarker;
    use objc2_core_foundation::CFRunLoop;
    use tracing::info;

    let mtm = MainThreadMarker::new()
        .context("keyhop must start on the main thread")?;

    let handler = KeyEventHandler::new(
        &config,
        WindowServer::new(),
        OverlayPanels::new(config.overlay.clone(), mtm),
    );
    let _tap = EventTap::install(handler).context("installing the keyboard event tap")?;

    info!("keyhop is listening for the hotkey");
    CFRunLoop::run();
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("keyhop drives the macOS window server; this platform is unsupported")
}
