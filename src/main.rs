use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use mapboard::cli::{Command as LineCommand, HELP, parse_command};
use mapboard::color::ColorRegistry;
use mapboard::config::{BoardConfig, ConfigError, RelayConfig};
use mapboard::cursor::TracingMarkerLayer;
use mapboard::model::Participant;
use mapboard::net::run_session;
use mapboard::route::{DirectionsClient, RouteError, RouteGateway};
use mapboard::session::BoardSession;
use mapboard::signal::{BoardEvent, Intent, SignalBus};

const INTENT_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("route client: {0}")]
    Route(#[from] RouteError),
    #[error("relay server: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "mapboard", about = "Shared map board: presence relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the realtime relay server.
    Serve(ServeArgs),
    /// Join a board and drive it from stdin line commands.
    Join(JoinArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "PORT")]
    port: Option<u16>,
    #[arg(long, env = "RELAY_CLIENT_BUFFER")]
    client_buffer: Option<usize>,
}

#[derive(Args, Debug)]
struct JoinArgs {
    #[arg(long, env = "MAPBOARD_URL")]
    url: Option<String>,
    #[arg(long, env = "MAPBOARD_BOARD_ID")]
    board: Option<String>,
    #[arg(long, env = "MAPBOARD_INITIALS")]
    initials: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Command::Serve(args) => run_serve(args).await,
        Command::Join(args) => run_join(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<(), AppError> {
    let mut config = RelayConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(buffer) = args.client_buffer {
        config.client_buffer = buffer.max(1);
    }
    mapboard::relay::serve(config).await?;
    Ok(())
}

async fn run_join(args: JoinArgs) -> Result<(), AppError> {
    let mut config = BoardConfig::from_env()?;
    if let Some(url) = args.url {
        config.url = url;
    }
    if let Some(board) = args.board {
        config.board_id = board;
    }
    if let Some(initials) = args.initials {
        config.initials = initials;
    }
    config.validate()?;

    if config.route.token.is_none() {
        warn!("MAPBOX_TOKEN not set; route lookups will fail");
    }
    let gateway: Arc<dyn RouteGateway> = Arc::new(DirectionsClient::new(&config.route)?);

    let bus = SignalBus::default();
    let logger = tokio::spawn(log_events(bus.subscribe()));

    let mut session = BoardSession::new(TracingMarkerLayer, ColorRegistry::new(&config.palette), bus);
    let local = Participant::new(Uuid::new_v4().to_string(), config.initials.clone());
    info!(board_id = %config.board_id, participant = %local.id, url = %config.url, "joining board");
    session.connect(config.board_id.clone(), local);

    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(INTENT_BUFFER);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    spawn_stdin_reader(intent_tx);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            return;
        }
        if shutdown_tx.send(()).is_err() {
            debug!("ctrl-c after session already ended");
        }
    });

    let session = run_session(session, &config.url, gateway, intent_rx, shutdown_rx, config.reconnect).await;
    info!(pins = session.store().len(), route = session.store().route().is_some(), "session ended");

    drop(session);
    if let Err(e) = logger.await {
        warn!(error = %e, "event logger task failed");
    }
    Ok(())
}

/// Read line commands on a plain thread; a blocking stdin read cannot be
/// cancelled, and runtime shutdown must not wait on it. EOF or `quit` drops
/// the sender, which ends the session.
fn spawn_stdin_reader(intents: mpsc::Sender<Intent>) {
    std::thread::spawn(move || {
        println!("{HELP}");
        for line in std::io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(LineCommand::Help)) => println!("{HELP}"),
                Ok(Some(LineCommand::Quit)) => break,
                Ok(Some(LineCommand::Intent(intent))) => {
                    if intents.blocking_send(intent).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        debug!("stdin reader finished");
    });
}

async fn log_events(mut events: broadcast::Receiver<BoardEvent>) {
    loop {
        match events.recv().await {
            Ok(BoardEvent::ServerError { code, message }) => warn!(%code, %message, "relay error"),
            Ok(BoardEvent::JumpTo { session_id, position: Some([lng, lat]) }) => {
                info!(%session_id, lng, lat, "participant cursor");
            }
            Ok(BoardEvent::JumpTo { session_id, position: None }) => info!(%session_id, "no cursor seen for participant"),
            Ok(event) => info!(?event, "board event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}
