mod api;
mod app;
mod cli;
mod config;
mod detail;
mod input;
mod layout;
mod model;
mod navigation;
mod operations;
mod router;
mod screens;
mod search;
mod store;
mod ui;

use anyhow::{Context, Result};
use api::RunloopGateway;
use app::{App, AppCommand, AppEvent, AppSettings, DEFAULT_MAX_PAGE_SIZE, DEFAULT_POLL_MS, DetailWiring};
use clap::Parser;
use cli::CliArgs;
use config::ClientConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use detail::{DetailUpdate, Fetcher};
use futures::{FutureExt, StreamExt};
use layout::{CrosstermSize, viewport};
use model::{ResourceKind, ResourceRecord};
use navigation::{Route, RouteParams, Screen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::any::Any;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const DEFAULT_REFRESH_MS: u64 = 5_000;
const MIN_REFRESH_MS: u64 = 1_000;
const MIN_POLL_MS: u64 = 500;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = ClientConfig::load()?;
    let gateway = RunloopGateway::new(&config.base_url, config.require_api_key()?)?;
    info!(
        "using {} (config: {})",
        gateway.base_url(),
        config.source.as_deref().unwrap_or("none")
    );

    let refresh_ms = args
        .refresh_ms
        .or(config.refresh_ms)
        .unwrap_or(DEFAULT_REFRESH_MS)
        .max(MIN_REFRESH_MS);
    let poll_ms = args
        .poll_ms
        .or(config.poll_ms)
        .unwrap_or(DEFAULT_POLL_MS)
        .max(MIN_POLL_MS);
    let settings = AppSettings {
        poll_interval: Duration::from_millis(poll_ms),
        max_page_size: config.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut app = App::new(
        settings,
        detail_wiring(&gateway, events_tx.clone()),
        viewport(&CrosstermSize),
    );
    let route = initial_route(&args);

    run(&mut app, &gateway, route, events_tx, events_rx, refresh_ms).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    panic::set_hook(Box::new(|info| error!("panic: {info}")));
    Ok(())
}

fn initial_route(args: &CliArgs) -> Route {
    let screen = args
        .screen
        .as_deref()
        .map(Screen::parse)
        .unwrap_or(Screen::Menu);
    let params = match &args.id {
        Some(id) => RouteParams::id(id.clone()),
        None => RouteParams::new(),
    };
    Route::new(screen, params)
}

fn detail_wiring(gateway: &RunloopGateway, events: UnboundedSender<AppEvent>) -> DetailWiring {
    let gateway = gateway.clone();
    DetailWiring {
        fetcher_for: Arc::new(move |kind: ResourceKind| {
            let gateway = gateway.clone();
            let fetcher: Fetcher<ResourceRecord> = Arc::new(move |id: String| {
                let gateway = gateway.clone();
                async move { gateway.retrieve(kind, &id).await }.boxed()
            });
            fetcher
        }),
        sink: Arc::new(move |update: DetailUpdate<ResourceRecord>| {
            let _ = events.send(AppEvent::Detail(update));
        }),
    }
}

async fn run(
    app: &mut App,
    gateway: &RunloopGateway,
    route: Route,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    refresh_ms: u64,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(
        &mut terminal,
        app,
        gateway,
        route,
        &events_tx,
        events_rx,
        refresh_ms,
    )
    .await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &RunloopGateway,
    route: Route,
    events_tx: &UnboundedSender<AppEvent>,
    mut events_rx: UnboundedReceiver<AppEvent>,
    refresh_ms: u64,
) -> Result<()> {
    let command = guarded(app, |app| app.start(route));
    dispatch(command, gateway, events_tx);

    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        draw(terminal, app)?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = guarded(app, |app| app.apply_action(action));
                            dispatch(command, gateway, events_tx);
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        let command = guarded(app, |app| app.set_viewport(width, height));
                        dispatch(command, gateway, events_tx);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let command = guarded(app, App::on_tick);
                dispatch(command, gateway, events_tx);
            }
            Some(event) = events_rx.recv() => {
                let command = guarded(app, |app| app.apply_event(event));
                dispatch(command, gateway, events_tx);
            }
        }
    }

    Ok(())
}

/// Draws a frame; a panic while rendering switches the app to its error screen.
fn draw(terminal: &mut TuiTerminal, app: &mut App) -> Result<()> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        terminal.draw(|frame| ui::render(frame, app)).map(|_| ())
    }));
    match outcome {
        Ok(result) => result.context("failed to render terminal frame"),
        Err(payload) => {
            app.set_fatal(panic_message(payload.as_ref()));
            terminal
                .draw(|frame| ui::render(frame, app))
                .context("failed to render error screen")?;
            Ok(())
        }
    }
}

fn guarded(app: &mut App, step: impl FnOnce(&mut App) -> AppCommand) -> AppCommand {
    match panic::catch_unwind(AssertUnwindSafe(|| step(app))) {
        Ok(command) => command,
        Err(payload) => {
            app.set_fatal(panic_message(payload.as_ref()));
            AppCommand::None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn dispatch(command: AppCommand, gateway: &RunloopGateway, events: &UnboundedSender<AppEvent>) {
    let gateway = gateway.clone();
    let events = events.clone();
    match command {
        AppCommand::None => {}
        AppCommand::FetchList {
            kind,
            instance,
            ticket,
            page,
            query,
        } => {
            tokio::spawn(async move {
                let result = gateway
                    .list(kind, &query)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = events.send(AppEvent::ListLoaded {
                    kind,
                    instance,
                    ticket,
                    page,
                    result,
                });
            });
        }
        AppCommand::FetchRecord { kind, instance, id } => {
            tokio::spawn(async move {
                let result = gateway
                    .retrieve(kind, &id)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = events.send(AppEvent::RecordLoaded { instance, result });
            });
        }
        AppCommand::RunOperation {
            kind,
            instance,
            id,
            operation,
            extra,
        } => {
            info!("{operation} {} {id}", kind.singular());
            tokio::spawn(async move {
                let result = gateway
                    .perform(kind, &id, &operation, extra.as_deref())
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = events.send(AppEvent::OperationFinished {
                    kind,
                    instance,
                    result,
                });
            });
        }
        AppCommand::Create {
            kind,
            instance,
            fields,
        } => {
            info!("create {}", kind.singular());
            tokio::spawn(async move {
                let result = gateway
                    .create(kind, &fields)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = events.send(AppEvent::Created {
                    kind,
                    instance,
                    result,
                });
            });
        }
        AppCommand::LoadLogs { kind, instance, id } => {
            tokio::spawn(async move {
                let result = gateway
                    .logs(kind, &id)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = events.send(AppEvent::LogsLoaded { instance, result });
            });
        }
    }
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{compact_error, initial_route, panic_message};
    use crate::cli::CliArgs;
    use crate::model::ResourceKind;
    use crate::navigation::Screen;
    use anyhow::Context;
    use clap::Parser;

    #[test]
    fn deep_link_builds_route_with_id() {
        let args = CliArgs::parse_from(["rlt", "--screen", "devbox-detail", "--id", "dbx_1"]);
        let route = initial_route(&args);
        assert_eq!(route.screen, Screen::Detail(ResourceKind::Devboxes));
        assert_eq!(route.params.get("id"), Some("dbx_1"));
    }

    #[test]
    fn no_screen_starts_at_menu() {
        let args = CliArgs::parse_from(["rlt"]);
        assert_eq!(initial_route(&args).screen, Screen::Menu);
    }

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = Err::<(), _>(anyhow::anyhow!("root"))
            .context("middle")
            .context("outer")
            .context("top")
            .expect_err("error");
        assert_eq!(
            compact_error(&error),
            "top\ncaused by: outer\ncaused by: middle"
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = std::panic::catch_unwind(|| panic!("bad index {}", 3)).expect_err("panic");
        assert_eq!(panic_message(payload.as_ref()), "bad index 3");
        let payload = std::panic::catch_unwind(|| panic!("static")).expect_err("panic");
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
