use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod components;
mod config;
mod diagnostics;
mod error;
mod event;
mod handler;
mod model;
mod scene;
mod theme;
mod tree;
mod tui;
mod ui;

use app::App;
use config::{AppConfig, GeneralConfig, ThemeConfig};
use error::Result;
use event::{Event, EventHandler};
use tui::Tui;

/// Terminal inspector for UI scene snapshots.
#[derive(Parser, Debug)]
#[command(name = "vistree", version, about)]
struct Cli {
    /// Scene snapshot file (JSON) to inspect.
    scene: PathBuf,

    /// Explicit config file path.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write diagnostic logs to this file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Color scheme: dark, light, custom.
    #[arg(long, value_name = "SCHEME")]
    theme: Option<String>,

    /// Disable diagnostic providers and binding instrumentation.
    #[arg(long)]
    no_diagnostics: bool,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                log_file: self
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                diagnostics: self.no_diagnostics.then_some(false),
            },
            theme: ThemeConfig {
                scheme: self.theme.clone(),
                custom: None,
            },
            ..Default::default()
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let Some(path) = config.log_file() else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    init_logging(&config)?;

    let contexts = scene::load(&cli.scene)?;
    let theme_colors = theme::resolve_theme(&config.theme);
    let mut app = App::new(contexts, &config)?;

    tui::install_panic_hook();
    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(16));

    while !app.should_quit {
        tui.terminal_mut()
            .draw(|frame| ui::render(&mut app, &theme_colors, frame))?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick | Event::Resize(..) => {}
        }

        // drain deferred model work before the next frame
        app.pump();
    }

    app.shutdown();
    tui.restore()?;
    Ok(())
}
