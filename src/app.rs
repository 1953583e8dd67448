use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::detail::{DetailUpdate, Fetcher, UpdateSink};
use crate::input::{Action, InputMode};
use crate::layout::{LayoutBudget, LayoutBudgeter, LayoutRequest, ScreenType};
use crate::model::{ListPage, ListQuery, LogLine, ResourceKind, ResourceRecord};
use crate::navigation::{NavigationState, Route, Screen};
use crate::router::{Mounted, Router};
use crate::screens::{Intent, ListScreen, ScreenState, fetch_page};
use crate::store::{FetchTicket, ResourceStore, Stores};

pub const DEFAULT_POLL_MS: u64 = 2_000;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AppSettings {
    pub poll_interval: Duration,
    pub max_page_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone)]
pub struct DetailWiring {
    pub fetcher_for: Arc<dyn Fn(ResourceKind) -> Fetcher<ResourceRecord> + Send + Sync>,
    pub sink: UpdateSink<ResourceRecord>,
}

pub struct MountContext<'a> {
    pub settings: &'a AppSettings,
    pub wiring: &'a DetailWiring,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    FetchList {
        kind: ResourceKind,
        instance: u64,
        ticket: FetchTicket,
        page: usize,
        query: ListQuery,
    },
    FetchRecord {
        kind: ResourceKind,
        instance: u64,
        id: String,
    },
    RunOperation {
        kind: ResourceKind,
        instance: u64,
        id: String,
        operation: String,
        extra: Option<String>,
    },
    Create {
        kind: ResourceKind,
        instance: u64,
        fields: Vec<(String, String)>,
    },
    LoadLogs {
        kind: ResourceKind,
        instance: u64,
        id: String,
    },
}

#[derive(Debug)]
pub enum AppEvent {
    ListLoaded {
        kind: ResourceKind,
        instance: u64,
        ticket: FetchTicket,
        page: usize,
        result: Result<ListPage, String>,
    },
    Detail(DetailUpdate<ResourceRecord>),
    RecordLoaded {
        instance: u64,
        result: Result<ResourceRecord, String>,
    },
    OperationFinished {
        kind: ResourceKind,
        instance: u64,
        result: Result<String, String>,
    },
    Created {
        kind: ResourceKind,
        instance: u64,
        result: Result<ResourceRecord, String>,
    },
    LogsLoaded {
        instance: u64,
        result: Result<Vec<LogLine>, String>,
    },
}

pub struct App {
    running: bool,
    nav: NavigationState,
    router: Router,
    stores: Stores,
    layout: LayoutBudgeter,
    settings: AppSettings,
    wiring: DetailWiring,
    viewport: (u16, u16),
    status: String,
    show_help: bool,
    fatal: Option<String>,
}

impl App {
    pub fn new(settings: AppSettings, wiring: DetailWiring, viewport: (u16, u16)) -> Self {
        Self {
            running: true,
            nav: NavigationState::initial(),
            router: Router::default(),
            stores: Stores::default(),
            layout: LayoutBudgeter::default(),
            settings,
            wiring,
            viewport,
            status: "Ready".to_string(),
            show_help: false,
            fatal: None,
        }
    }

    pub fn start(&mut self, route: Route) -> AppCommand {
        let next = NavigationState::initial().navigate(route.screen, route.params);
        self.transition(next)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn can_go_back(&self) -> bool {
        self.nav.can_go_back()
    }

    pub fn mounted(&self) -> Option<&Mounted> {
        self.router.mounted()
    }

    pub fn store(&self, kind: ResourceKind) -> &ResourceStore<ResourceRecord> {
        self.stores.get(kind)
    }

    pub fn mode(&self) -> InputMode {
        if self.fatal.is_some() {
            return InputMode::Normal;
        }
        self.router
            .mounted()
            .map(|mounted| mounted.screen.mode())
            .unwrap_or(InputMode::Normal)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn set_fatal(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("fatal screen error: {message}");
        self.fatal = Some(message);
        self.show_help = false;
    }

    pub fn layout_budget(&mut self, request: LayoutRequest) -> LayoutBudget {
        self.layout.budget(request)
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        let trail = self.nav.breadcrumbs();
        let mut labels = Vec::with_capacity(trail.len() + 1);
        if trail.first().is_some_and(|route| route.screen != Screen::Menu) {
            labels.push("Home".to_string());
        }
        labels.extend(trail.iter().map(route_label));
        labels
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.fatal.is_some() {
            if action == Action::Quit {
                self.running = false;
            }
            return AppCommand::None;
        }

        if self.show_help && action != Action::ToggleHelp {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Home => {
                let next = self.nav.reset();
                self.transition(next)
            }
            action => {
                let Some(mounted) = self.router.mounted_mut() else {
                    return AppCommand::None;
                };
                let store = match &mounted.screen {
                    ScreenState::List(list) => Some(self.stores.get_mut(list.kind)),
                    _ => None,
                };
                let intent = mounted.screen.handle(&action, mounted.instance, store);
                self.apply_intent(intent)
            }
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::ListLoaded {
                kind,
                instance,
                ticket,
                page,
                result,
            } => {
                let store = self.stores.get_mut(kind);
                if !self.router.is_current(instance) || !store.is_latest(ticket) {
                    debug!("dropping stale {} page {page}", kind.title());
                    return AppCommand::None;
                }
                if let Err(error) = &result {
                    self.status = normalize_status_text(format!(
                        "{} refresh failed: {}",
                        kind.title(),
                        summarize_error_line(error)
                    ));
                }
                ListScreen::apply_loaded(store, page, result);
                AppCommand::None
            }
            AppEvent::Detail(update) => {
                if let Some(Mounted {
                    screen: ScreenState::Detail(detail),
                    ..
                }) = self.router.mounted_mut()
                    && detail.detail.apply(update)
                    && let Some(error) = detail.detail.error()
                {
                    self.status = normalize_status_text(format!(
                        "Failed to load {}: {}",
                        detail.id,
                        summarize_error_line(error)
                    ));
                }
                AppCommand::None
            }
            AppEvent::RecordLoaded { instance, result } => {
                if self.router.is_current(instance)
                    && let Some(Mounted {
                        screen: ScreenState::Actions(actions),
                        ..
                    }) = self.router.mounted_mut()
                {
                    actions.apply_record(result);
                }
                AppCommand::None
            }
            AppEvent::OperationFinished {
                kind,
                instance,
                result,
            } => {
                if result.is_ok() {
                    self.stores.get_mut(kind).clear_cache();
                }
                self.status = match &result {
                    Ok(message) => normalize_status_text(message.clone()),
                    Err(error) => normalize_status_text(format!(
                        "Operation failed: {}",
                        summarize_error_line(error)
                    )),
                };
                if self.router.is_current(instance)
                    && let Some(Mounted {
                        screen: ScreenState::Actions(actions),
                        ..
                    }) = self.router.mounted_mut()
                {
                    actions.ops.finish(result);
                }
                AppCommand::None
            }
            AppEvent::Created {
                kind,
                instance,
                result,
            } => {
                if result.is_ok() {
                    self.stores.get_mut(kind).clear_cache();
                    self.set_status(format!("Created {}", kind.singular()));
                }
                if !self.router.is_current(instance) {
                    return AppCommand::None;
                }
                let Some(Mounted {
                    screen: ScreenState::Create(create),
                    ..
                }) = self.router.mounted_mut()
                else {
                    return AppCommand::None;
                };
                let intent = create.apply_created(result);
                self.apply_intent(intent)
            }
            AppEvent::LogsLoaded { instance, result } => {
                if self.router.is_current(instance)
                    && let Some(Mounted {
                        screen: ScreenState::Logs(logs),
                        ..
                    }) = self.router.mounted_mut()
                {
                    logs.apply_loaded(result);
                }
                AppCommand::None
            }
        }
    }

    pub fn on_tick(&mut self) -> AppCommand {
        if self.mode() != InputMode::Normal {
            return AppCommand::None;
        }
        let Some(Mounted {
            instance,
            screen: ScreenState::List(list),
            ..
        }) = self.router.mounted()
        else {
            return AppCommand::None;
        };
        let (instance, kind) = (*instance, list.kind);
        let store = self.stores.get_mut(kind);
        if store.loading() {
            return AppCommand::None;
        }
        let page = store.current_page();
        fetch_page(kind, instance, store, page)
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) -> AppCommand {
        self.viewport = (width, height);
        let page_size = self.list_page_size();
        let Some(Mounted {
            instance,
            screen: ScreenState::List(list),
            ..
        }) = self.router.mounted()
        else {
            return AppCommand::None;
        };
        let (instance, kind) = (*instance, list.kind);
        let store = self.stores.get_mut(kind);
        if store.page_size() == page_size {
            return AppCommand::None;
        }
        debug!("{} page size {} -> {page_size}", kind.title(), store.page_size());
        store.clear_cache();
        store.set_current_page(0);
        store.set_selected_index(0);
        store.set_page_size(page_size);
        fetch_page(kind, instance, store, 0)
    }

    fn list_page_size(&mut self) -> usize {
        let (width, height) = self.viewport;
        let budget = self.layout.budget(LayoutRequest {
            has_search: true,
            has_stats: true,
            ..LayoutRequest::new(ScreenType::List, width, height)
        });
        usize::from(budget.content_lines).clamp(1, self.settings.max_page_size.max(1))
    }

    fn apply_intent(&mut self, intent: Intent) -> AppCommand {
        match intent {
            Intent::None => AppCommand::None,
            Intent::Command(command) => command,
            Intent::Status(status) => {
                self.set_status(status);
                AppCommand::None
            }
            Intent::Push(screen, params) => {
                let next = self.nav.push(screen, params);
                self.transition(next)
            }
            Intent::Navigate(screen, params) => {
                let next = self.nav.navigate(screen, params);
                self.transition(next)
            }
            Intent::Replace(screen, params) => {
                let next = self.nav.replace(screen, params);
                self.transition(next)
            }
            Intent::Back => {
                let next = self.nav.go_back();
                self.transition(next)
            }
        }
    }

    fn transition(&mut self, next: NavigationState) -> AppCommand {
        self.nav = next;
        loop {
            let page_size = self.list_page_size();
            let ctx = MountContext {
                settings: &self.settings,
                wiring: &self.wiring,
                page_size,
            };
            match self
                .router
                .mount(self.nav.current_route(), &mut self.stores, &ctx)
            {
                Ok(command) => return command,
                Err(missing) => {
                    self.status = format!(
                        "Cannot open {}: missing {}",
                        missing.screen,
                        missing.missing.join(", ")
                    );
                    self.nav = self.nav.go_back();
                }
            }
        }
    }
}

fn route_label(route: &Route) -> String {
    let id = route.params.get("id");
    match &route.screen {
        Screen::Menu => "Home".to_string(),
        Screen::List(kind) => kind.title().to_string(),
        Screen::Detail(kind) => id.unwrap_or(kind.singular()).to_string(),
        Screen::Actions(_) => "Actions".to_string(),
        Screen::Create(kind) => format!("New {}", kind.singular()),
        Screen::Logs(_) => "Logs".to_string(),
        Screen::Other(name) => name.clone(),
    }
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
