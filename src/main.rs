use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tokio::sync::mpsc;

use cordsync::application::services::EmbedLoader;
use cordsync::application::{
    LoginRequest, LoginUseCase, ResolveTokenUseCase, Scope, Session, SessionDeps, TokenSource,
    UiLoop,
};
use cordsync::domain::entities::{EmbedKind, EmbedPlacement, MediaEmbed};
use cordsync::domain::ports::{
    EmbedPlayer, GatewayPort, KeyValueStore, NotificationPort, Progress, TokenStoragePort,
};
use cordsync::infrastructure::replay::replay_token;
use cordsync::infrastructure::{
    AppConfig, BlobCache, CliArgs, Command, DesktopNotifier, FuzzySearcher, KeyringTokenStorage,
    MediaFetcher, ReplayGateway, StateStore, StorageManager,
};
use cordsync::presentation::{LogNotifier, LogPlayer, LogSink, render_summary};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn session_deps(config: &AppConfig, store: Rc<dyn KeyValueStore>, notifier: Rc<LogNotifier>) -> SessionDeps {
    let mut deps = SessionDeps::new(store, notifier, Arc::new(FuzzySearcher::new()));
    deps.notification_settings = config.notification_settings();
    deps.switcher_limits = config.switcher_limits();
    deps.reconnect_grace = config.reconnect_grace();
    deps
}

/// Plays a recorded event stream through a full session and prints the
/// resulting sidebar.
async fn run_replay(
    config: &AppConfig,
    file: PathBuf,
    switch: Option<String>,
    pace: Duration,
    desktop: bool,
) -> Result<()> {
    let mut ui = UiLoop::new();
    let (click_tx, mut clicks) = mpsc::unbounded_channel();
    let notifier = Rc::new(if desktop {
        let port: Rc<dyn NotificationPort> = Rc::new(DesktopNotifier::new(Some(click_tx)));
        LogNotifier::forwarding(port)
    } else {
        drop(click_tx);
        LogNotifier::new()
    });
    let store: Rc<dyn KeyValueStore> = Rc::new(StateStore::in_memory());
    let (session, mut commands) =
        Session::new(ui.handle(), session_deps(config, store, Rc::clone(&notifier)));
    let sink = LogSink::attach(&session, session.scope());

    let mut gateway = ReplayGateway::new(&file, pace);
    session.begin_connecting();
    let mut events = gateway
        .connect(&replay_token())
        .await
        .wrap_err_with(|| format!("Failed to replay {}", file.display()))?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => session.ingest(event),
                None => break,
            },
            Some(command) = commands.recv() => gateway.send(command).await,
            Some(action) = clicks.recv() => session.open_notification(action),
            _ = ui.turn() => {}
        }
    }
    while let Ok(command) = commands.try_recv() {
        gateway.send(command).await;
    }
    ui.drain();

    if let Some(query) = switch {
        let results = session.quick_switch(&query);
        for result in results.channels.iter().chain(&results.guilds) {
            println!("{:>6}  {}", result.score, result.item.label);
        }
        if let Some(best) = results.first() {
            session.open_search_result(best.item.target);
        }
    }

    print!("{}", render_summary(&session));
    println!(
        "events: {}  notifications: {}",
        sink.events_seen(),
        notifier.shown().len()
    );

    sink.detach();
    session.shutdown();
    gateway.disconnect();
    Ok(())
}

/// Downloads one embed through the media cache and reports where it landed.
async fn run_fetch(config: &AppConfig, url: String, kind: EmbedKind) -> Result<()> {
    let Some(root) = config.effective_cache_dir() else {
        bail!("No cache directory available. Pass --cache-dir.");
    };
    let fetcher = MediaFetcher::new(BlobCache::new(root), config.progress_interval())?;

    let mut ui = UiLoop::new();
    let scope = Scope::visible();
    let loader = EmbedLoader::new(Arc::new(fetcher), ui.handle());
    let player = LogPlayer::new();
    let surface: Rc<dyn EmbedPlayer> = player.clone();
    let placement = EmbedPlacement {
        can_hide: false,
        primary: true,
    };

    let mut load = loader.load(&scope, &MediaEmbed::new(kind, url), placement, &surface);
    while load.task.is_pending() {
        tokio::select! {
            _ = ui.turn() => {}
            Ok(()) = load.progress.changed() => {
                match *load.progress.borrow_and_update() {
                    Progress::Fraction(f) => info!(percent = f * 100.0, "downloading"),
                    Progress::Pulse(bytes) => info!(bytes, "downloading"),
                    Progress::Pending | Progress::Done => {}
                }
            }
        }
    }
    scope.cancel();

    match (player.source(), player.failure()) {
        (Some(path), _) => {
            println!("{path}");
            Ok(())
        }
        (None, Some(style)) => bail!("Fetch failed ({style:?}); see the log for details."),
        (None, None) => bail!("Fetch produced no result."),
    }
}

/// Resolves the account token the way a live session would start.
async fn run_login(config: &AppConfig, cli_token: Option<String>) -> Result<()> {
    let storage: Arc<dyn TokenStoragePort> = Arc::new(KeyringTokenStorage::new());
    let resolved = ResolveTokenUseCase::new(Arc::clone(&storage))
        .execute(cli_token)
        .await?;

    let Some(resolved) = resolved else {
        bail!("No token available. Pass --token or set CORDSYNC_TOKEN.");
    };

    let mut request = LoginRequest::new(resolved.token.expose().to_string(), resolved.source);
    if !config.remember_token {
        request = request.without_remember();
    }
    let response = LoginUseCase::new(storage).execute(request).await?;
    info!(
        source = %response.source,
        remembered = response.remembered,
        token = %response.token.masked(),
        "token resolved"
    );

    if response.source == TokenSource::CommandLine && config.remember_token && !response.remembered {
        warn!("Token could not be saved; it will be needed again next time");
    }

    println!(
        "Token from {} ({}). No live transport is bundled; use `cordsync replay <file>`.",
        response.source.description(),
        response.token.masked()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage
        .load_config(args.config.as_deref())
        .wrap_err("Failed to load configuration")?;
    config.merge_with_args(&args);

    init_logging(&config)?;
    info!(version = cordsync::VERSION, "Starting {}", cordsync::NAME);

    match args.command {
        Some(Command::Replay {
            file,
            switch,
            pace_ms,
            desktop,
        }) => {
            run_replay(&config, file, switch, Duration::from_millis(pace_ms), desktop).await
        }
        Some(Command::Fetch { url, kind }) => run_fetch(&config, url, kind.into()).await,
        None => run_login(&config, args.token).await,
    }
}
