use std::sync::Arc;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotpilot::{cli, config, error, logging, types::PkceToken};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Write debug details to the log file
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with the Spotify API
    Auth(AuthOptions),

    /// Keep the queue topped up while music plays
    Autopilot(AutopilotOptions),

    /// Inspect or refill the playback queue
    Queue(QueueOptions),

    /// Show the current track
    Now,

    /// List available playback devices
    Devices,

    /// Pause playback
    Pause,

    /// Resume playback
    Resume,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Previous,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Client id of your Spotify application, saved for later runs
    #[clap(long)]
    pub client_id: Option<String>,

    /// Client secret of your Spotify application, saved for later runs
    #[clap(long)]
    pub client_secret: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AutopilotOptions {
    /// Refill when fewer than this many tracks are queued
    #[clap(long, default_value_t = 3)]
    pub threshold: usize,

    /// Mood preset (chill, flow, hype, focus, party, upbeat, melancholy, ambient, workout, sleep)
    #[clap(long, default_value = "flow")]
    pub mood: String,

    /// Seconds between player polls
    #[clap(long, default_value_t = 3)]
    pub interval: u64,

    /// Minutes after which a queued track may be suggested again
    #[clap(long)]
    pub dedup_window: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct QueueOptions {
    #[command(subcommand)]
    pub command: QueueSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueueSubcommand {
    /// Show upcoming tracks
    Show,

    /// Add tracks until the queue holds `--target` entries
    Fill(QueueFillOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct QueueFillOpts {
    #[clap(long, default_value_t = 5)]
    pub target: usize,

    #[clap(long, default_value = "flow")]
    pub mood: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    let settings = config::Settings::from_env();

    if let Err(e) = logging::setup(&settings.config_dir, cli.verbose) {
        // diagnostics are optional, the commands still work without them
        eprintln!("{}", e);
    }

    match cli.command {
        Command::Auth(opt) => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(
                &settings,
                opt.client_id,
                opt.client_secret,
                Arc::clone(&oauth_result),
            )
            .await;
        }
        Command::Autopilot(opt) => {
            cli::autopilot(
                &settings,
                opt.threshold,
                &opt.mood,
                opt.interval,
                opt.dedup_window,
            )
            .await
        }
        Command::Queue(opt) => match opt.command {
            QueueSubcommand::Show => cli::show_queue(&settings).await,
            QueueSubcommand::Fill(f) => cli::fill_queue(&settings, f.target, &f.mood).await,
        },
        Command::Now => cli::now_playing(&settings).await,
        Command::Devices => cli::devices(&settings).await,
        Command::Pause => cli::pause(&settings).await,
        Command::Resume => cli::resume(&settings).await,
        Command::Next => cli::next(&settings).await,
        Command::Previous => cli::previous(&settings).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
