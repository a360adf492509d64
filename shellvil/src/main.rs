use clap::Parser;
use tracing::{info, warn};
use xdg_shell_v6::reexports::{calloop::EventLoop, wayland_server::Display};

mod handlers;
mod state;

pub use state::Shellvil;

/// Headless compositor exposing `zxdg_shell_v6` and logging every shell event
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Name of the listening socket, picked automatically when unset
    #[arg(short, long)]
    socket: Option<String>,
    /// Maximum number of live shell surfaces per client
    #[arg(long)]
    max_surfaces: Option<usize>,
    /// Do not propose the activated state to new toplevels
    #[arg(long, default_value_t = false)]
    no_activate: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().init();
    }

    let mut event_loop: EventLoop<Shellvil> = EventLoop::try_new()?;

    let display: Display<Shellvil> = Display::new()?;
    let mut state = Shellvil::new(&mut event_loop, display, &args)?;

    info!(socket = ?state.socket_name, "Shellvil is running");

    event_loop.run(None, &mut state, |state| {
        if let Err(err) = state.display_handle.flush_clients() {
            warn!(?err, "Failed to flush clients");
        }
    })?;

    Ok(())
}
