use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::app::{AppCommand, MountContext};
use crate::detail::{DetailOptions, DetailPoll, PollPredicate};
use crate::input::{Action, InputMode};
use crate::model::{ListPage, ListQuery, LogLine, ResourceKind, ResourceRecord};
use crate::navigation::{RouteParams, Screen};
use crate::operations::{ListOperations, OperationSpec, available_operations, find_operation};
use crate::search::{Escape, ListSearch, SearchEffect};
use crate::store::ResourceStore;

type RecordStore = ResourceStore<ResourceRecord>;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    None,
    Push(Screen, RouteParams),
    Navigate(Screen, RouteParams),
    Replace(Screen, RouteParams),
    Back,
    Command(AppCommand),
    Status(String),
}

pub enum ScreenState {
    Menu(MenuScreen),
    List(ListScreen),
    Detail(DetailScreen),
    Actions(ActionsScreen),
    Create(CreateScreen),
    Logs(LogsScreen),
    Unknown(String),
}

impl ScreenState {
    pub fn mode(&self) -> InputMode {
        match self {
            Self::List(list) if list.search.search_mode() => InputMode::Search,
            Self::Actions(actions) if actions.prompt.is_some() => InputMode::Prompt,
            Self::Create(_) => InputMode::Form,
            _ => InputMode::Normal,
        }
    }

    pub fn handle(&mut self, action: &Action, instance: u64, store: Option<&mut RecordStore>) -> Intent {
        match (self, store) {
            (Self::Menu(menu), _) => menu.handle(action),
            (Self::List(list), Some(store)) => list.handle(action, instance, store),
            (Self::Detail(detail), _) => detail.handle(action),
            (Self::Actions(actions), _) => actions.handle(action, instance),
            (Self::Create(create), _) => create.handle(action, instance),
            (Self::Logs(logs), _) => logs.handle(action, instance),
            (Self::Unknown(_), _) | (Self::List(_), None) => match action {
                Action::Back | Action::Select => Intent::Back,
                _ => Intent::None,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuScreen {
    pub selected: usize,
}

impl MenuScreen {
    pub fn entries() -> &'static [ResourceKind] {
        &ResourceKind::ALL
    }

    fn handle(&mut self, action: &Action) -> Intent {
        let count = Self::entries().len();
        match action {
            Action::Down => self.selected = (self.selected + 1).min(count - 1),
            Action::Up => self.selected = self.selected.saturating_sub(1),
            Action::Top => self.selected = 0,
            Action::Bottom => self.selected = count - 1,
            Action::Select => {
                if let Some(kind) = Self::entries().get(self.selected) {
                    return Intent::Navigate(Screen::List(*kind), RouteParams::new());
                }
            }
            _ => {}
        }
        Intent::None
    }
}

pub struct ListScreen {
    pub kind: ResourceKind,
    pub search: ListSearch,
}

impl ListScreen {
    pub fn mount(
        kind: ResourceKind,
        instance: u64,
        store: &mut RecordStore,
        page_size: usize,
    ) -> (Self, AppCommand) {
        if store.page_size() != page_size {
            store.clear_cache();
            store.set_current_page(0);
            store.set_page_size(page_size);
        }
        let screen = Self {
            kind,
            search: ListSearch::with_submitted(store.search_query()),
        };
        let page = store.current_page();
        let command = fetch_page(kind, instance, store, page);
        (screen, command)
    }

    fn handle(&mut self, action: &Action, instance: u64, store: &mut RecordStore) -> Intent {
        if self.search.search_mode() {
            match action {
                Action::InputChar(c) => self.search.push_char(*c),
                Action::Backspace => self.search.backspace(),
                Action::Submit => {
                    let effect = self.search.submit_search();
                    return self.apply_search_effect(effect, instance, store);
                }
                Action::Cancel => self.search.cancel_search(),
                _ => {}
            }
            return Intent::None;
        }

        let len = store.items().len();
        match action {
            Action::Down => {
                let next = (store.selected_index() + 1).min(len.saturating_sub(1) as isize);
                store.set_selected_index(next.max(0));
            }
            Action::Up => store.set_selected_index((store.selected_index() - 1).max(0)),
            Action::Top => store.set_selected_index(0),
            Action::Bottom => store.set_selected_index(len.saturating_sub(1) as isize),
            Action::NextPage => return self.next_page(instance, store),
            Action::PrevPage => return self.prev_page(instance, store),
            Action::Refresh => {
                let page = store.current_page();
                return Intent::Command(fetch_page(self.kind, instance, store, page));
            }
            Action::StartSearch => self.search.enter_search_mode(),
            Action::Back => {
                return match self.search.handle_escape() {
                    Escape::Consumed(effect) => self.apply_search_effect(effect, instance, store),
                    Escape::Unhandled => Intent::Back,
                };
            }
            Action::Select => return self.push_selected(store, Screen::Detail(self.kind)),
            Action::OpenActions => return self.push_selected(store, Screen::Actions(self.kind)),
            Action::OpenLogs if self.kind.supports_logs() => {
                return self.push_selected(store, Screen::Logs(self.kind));
            }
            Action::Create if self.kind.supports_create() => {
                return Intent::Push(Screen::Create(self.kind), RouteParams::new());
            }
            _ => {}
        }
        Intent::None
    }

    fn push_selected(&self, store: &RecordStore, screen: Screen) -> Intent {
        match store.selected() {
            Some(record) => Intent::Push(screen, RouteParams::id(record.id.clone())),
            None => Intent::Status(format!("No {} selected", self.kind.singular())),
        }
    }

    fn apply_search_effect(
        &mut self,
        effect: SearchEffect,
        instance: u64,
        store: &mut RecordStore,
    ) -> Intent {
        let query = match effect {
            SearchEffect::None => return Intent::None,
            SearchEffect::Submit(query) => query,
            SearchEffect::Clear => String::new(),
        };
        debug!("{} search set to {query:?}", self.kind.title());
        store.set_search_query(query);
        store.clear_cache();
        store.set_current_page(0);
        store.set_selected_index(0);
        Intent::Command(fetch_page(self.kind, instance, store, 0))
    }

    fn next_page(&mut self, instance: u64, store: &mut RecordStore) -> Intent {
        if !store.has_more() {
            return Intent::Status("Already on the last page".to_string());
        }
        let target = store.current_page() + 1;
        if let Some(cached) = store.cached_page(target).map(<[ResourceRecord]>::to_vec) {
            show_cached_page(store, target, cached);
            return Intent::None;
        }
        Intent::Command(fetch_page(self.kind, instance, store, target))
    }

    fn prev_page(&mut self, instance: u64, store: &mut RecordStore) -> Intent {
        let Some(target) = store.current_page().checked_sub(1) else {
            return Intent::Status("Already on the first page".to_string());
        };
        if let Some(cached) = store.cached_page(target).map(<[ResourceRecord]>::to_vec) {
            show_cached_page(store, target, cached);
            return Intent::None;
        }
        Intent::Command(fetch_page(self.kind, instance, store, target))
    }

    pub fn apply_loaded(
        store: &mut RecordStore,
        page: usize,
        result: Result<ListPage, String>,
    ) {
        store.set_loading(false);
        store.set_initial_loading(false);
        match result {
            Ok(list) => {
                let count = list.items.len();
                let page_size = store.page_size().max(1);
                let has_more = list.has_more.unwrap_or(count >= page_size);
                let total = list
                    .total_count
                    .unwrap_or(page * page_size + count + usize::from(has_more));
                let last_id = list
                    .items
                    .last()
                    .map(|record| record.id.clone())
                    .unwrap_or_default();
                store.cache_page_data(page, &list.items, last_id);
                store.cache_has_more(page, has_more);
                store.set_items(list.items);
                store.set_current_page(page);
                store.set_has_more(has_more);
                store.set_total_count(total);
                store.set_error(None);
                let max_index = count.saturating_sub(1) as isize;
                store.set_selected_index(store.selected_index().clamp(0, max_index));
            }
            Err(error) => store.set_error(Some(error)),
        }
    }
}

fn show_cached_page(store: &mut RecordStore, page: usize, items: Vec<ResourceRecord>) {
    let page_size = store.page_size().max(1);
    let has_more = store
        .cached_has_more(page)
        .unwrap_or_else(|| items.len() >= page_size || store.cached_page(page + 1).is_some());
    store.set_items(items);
    store.set_current_page(page);
    store.set_has_more(has_more);
    store.set_selected_index(0);
}

pub fn fetch_page(
    kind: ResourceKind,
    instance: u64,
    store: &mut RecordStore,
    page: usize,
) -> AppCommand {
    let (page, starting_after) = match page.checked_sub(1) {
        None => (0, None),
        Some(previous) => match store
            .cached_last_id(previous)
            .filter(|cursor| !cursor.is_empty())
        {
            Some(cursor) => (page, Some(cursor.to_string())),
            None => (0, None),
        },
    };
    let search = Some(store.search_query().to_string()).filter(|query| !query.is_empty());
    let ticket = store.begin_fetch();
    AppCommand::FetchList {
        kind,
        instance,
        ticket,
        page,
        query: ListQuery {
            limit: store.page_size(),
            starting_after,
            search,
        },
    }
}

pub struct DetailScreen {
    pub kind: ResourceKind,
    pub id: String,
    pub detail: DetailPoll<ResourceRecord>,
    pub action_index: usize,
    pub scroll: u16,
    pub paused: bool,
    poll_interval: Duration,
}

impl DetailScreen {
    pub fn mount(
        kind: ResourceKind,
        id: &str,
        store: &RecordStore,
        ctx: &MountContext<'_>,
    ) -> Self {
        let initial_data = store.items().iter().find(|record| record.id == id).cloned();
        let should_poll: PollPredicate<ResourceRecord> =
            Arc::new(move |record: &ResourceRecord| record.is_transitional(kind));
        let mut detail = DetailPoll::new(
            (ctx.wiring.fetcher_for)(kind),
            ctx.wiring.sink.clone(),
            DetailOptions {
                initial_data,
                poll_interval: Some(ctx.settings.poll_interval),
                should_poll: Some(should_poll),
            },
        );
        detail.set_id(Some(id.to_string()));
        Self {
            kind,
            id: id.to_string(),
            detail,
            action_index: 0,
            scroll: 0,
            paused: false,
            poll_interval: ctx.settings.poll_interval,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.detail
            .data()
            .and_then(|record| record.status.as_deref())
    }

    pub fn operations(&self) -> Vec<OperationSpec> {
        available_operations(self.kind, self.status())
    }

    fn actions_params(&self, operation: Option<&str>) -> RouteParams {
        let mut params = RouteParams::id(self.id.clone());
        if let Some(status) = self.status() {
            params = params.with("status", status);
        }
        if let Some(operation) = operation {
            params = params.with("operation", operation);
        }
        params
    }

    fn handle(&mut self, action: &Action) -> Intent {
        let operations = self.operations();
        match action {
            Action::Down => {
                self.action_index = (self.action_index + 1).min(operations.len().saturating_sub(1))
            }
            Action::Up => self.action_index = self.action_index.saturating_sub(1),
            Action::NextPage => self.scroll = self.scroll.saturating_add(5),
            Action::PrevPage => self.scroll = self.scroll.saturating_sub(5),
            Action::Refresh => self.detail.refresh(),
            Action::TogglePolling => {
                self.paused = !self.paused;
                let interval = (!self.paused).then_some(self.poll_interval);
                self.detail.set_poll_interval(interval);
                let state = if self.paused { "paused" } else { "resumed" };
                return Intent::Status(format!("Polling {state} for {}", self.id));
            }
            Action::Select => {
                if let Some(spec) = operations.get(self.action_index) {
                    return Intent::Push(
                        Screen::Actions(self.kind),
                        self.actions_params(Some(spec.key)),
                    );
                }
            }
            Action::OpenActions => {
                return Intent::Push(Screen::Actions(self.kind), self.actions_params(None));
            }
            Action::OpenLogs if self.kind.supports_logs() => {
                return Intent::Push(Screen::Logs(self.kind), RouteParams::id(self.id.clone()));
            }
            Action::Back => return Intent::Back,
            _ => {}
        }
        Intent::None
    }
}

pub struct ActionsScreen {
    pub kind: ResourceKind,
    pub item: ResourceRecord,
    pub operations: Vec<OperationSpec>,
    pub selected: usize,
    pub refreshing: bool,
    pub notice: Option<String>,
    pub prompt: Option<String>,
    pub pending_confirm: Option<(OperationSpec, Option<String>)>,
    pub ops: ListOperations<ResourceRecord>,
    wanted: Option<String>,
}

impl ActionsScreen {
    /// The record is re-read by id on mount; until it arrives, operations
    /// follow the list entry or the status handed over by the detail screen.
    pub fn mount(
        kind: ResourceKind,
        params: &RouteParams,
        store: &RecordStore,
        instance: u64,
    ) -> (Self, AppCommand) {
        let id = params.get("id").unwrap_or_default();
        let mut item = store
            .items()
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .unwrap_or_else(|| ResourceRecord {
                id: id.to_string(),
                name: None,
                status: None,
                create_time_ms: None,
                raw: json!({ "id": id }),
            });
        if let Some(status) = params.get("status") {
            item.status = Some(status.to_string());
        }

        let mut screen = Self {
            kind,
            item,
            operations: Vec::new(),
            selected: 0,
            refreshing: true,
            notice: None,
            prompt: None,
            pending_confirm: None,
            ops: ListOperations::new(),
            wanted: params.get("operation").map(str::to_string),
        };
        screen.refresh_operations();
        let command = AppCommand::FetchRecord {
            kind,
            instance,
            id: id.to_string(),
        };
        (screen, command)
    }

    pub fn apply_record(&mut self, result: Result<ResourceRecord, String>) {
        self.refreshing = false;
        match result {
            Ok(record) => {
                self.item = record;
                self.refresh_operations();
            }
            Err(error) => {
                self.notice = Some(format!("Could not refresh {}: {error}", self.item.id));
            }
        }
    }

    fn refresh_operations(&mut self) {
        let current = self.wanted.clone().or_else(|| {
            self.operations
                .get(self.selected)
                .map(|spec| spec.key.to_string())
        });
        self.operations = available_operations(self.kind, self.item.status.as_deref());
        self.notice = None;

        let Some(key) = current else {
            self.selected = self.selected.min(self.operations.len().saturating_sub(1));
            return;
        };
        match self.operations.iter().position(|spec| spec.key == key) {
            Some(index) => self.selected = index,
            None => {
                self.selected = 0;
                if let Some(spec) = find_operation(self.kind, &key) {
                    self.notice = Some(format!(
                        "{} is not available while {} is {}",
                        spec.label,
                        self.item.display_name(),
                        self.item.status.as_deref().unwrap_or("unknown")
                    ));
                }
            }
        }
    }

    fn handle(&mut self, action: &Action, instance: u64) -> Intent {
        if let Some(prompt) = self.prompt.as_mut() {
            match action {
                Action::InputChar(c) => prompt.push(*c),
                Action::Backspace => {
                    prompt.pop();
                }
                Action::Cancel => self.prompt = None,
                Action::Submit => {
                    let extra = self.prompt.take().unwrap_or_default();
                    if let Some(spec) = self.operations.get(self.selected).copied() {
                        return self.run(spec, Some(extra), instance);
                    }
                }
                _ => {}
            }
            return Intent::None;
        }

        if let Some((spec, extra)) = self.pending_confirm.clone() {
            return match action {
                Action::ConfirmYes => {
                    self.pending_confirm = None;
                    self.execute(spec, extra, instance)
                }
                Action::ConfirmNo | Action::Back => {
                    self.pending_confirm = None;
                    Intent::Status(format!("{} cancelled", spec.label))
                }
                _ => Intent::None,
            };
        }

        match action {
            Action::Down => {
                self.wanted = None;
                self.selected = (self.selected + 1).min(self.operations.len().saturating_sub(1))
            }
            Action::Up => {
                self.wanted = None;
                self.selected = self.selected.saturating_sub(1)
            }
            Action::Select => {
                if self.ops.is_loading() {
                    return Intent::Status("An operation is already running".to_string());
                }
                let Some(spec) = self.operations.get(self.selected).copied() else {
                    return Intent::Status(format!(
                        "No operations available for this {}",
                        self.kind.singular()
                    ));
                };
                if spec.prompt.is_some() {
                    self.prompt = Some(String::new());
                    return Intent::None;
                }
                return self.run(spec, None, instance);
            }
            Action::Back => {
                if self.ops.result().is_some() || self.ops.error().is_some() {
                    self.ops.clear_result();
                    return Intent::None;
                }
                return Intent::Back;
            }
            _ => {}
        }
        Intent::None
    }

    fn run(&mut self, spec: OperationSpec, extra: Option<String>, instance: u64) -> Intent {
        if spec.destructive {
            self.pending_confirm = Some((spec, extra));
            return Intent::Status(format!(
                "{} {} {}? (y/n)",
                spec.label,
                self.kind.singular(),
                self.item.display_name()
            ));
        }
        self.execute(spec, extra, instance)
    }

    fn execute(&mut self, spec: OperationSpec, extra: Option<String>, instance: u64) -> Intent {
        let item = self.item.clone();
        let id = item.id.clone();
        self.ops.begin(item, spec.key);
        Intent::Command(AppCommand::RunOperation {
            kind: self.kind,
            instance,
            id,
            operation: spec.key.to_string(),
            extra,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

pub struct CreateScreen {
    pub kind: ResourceKind,
    pub fields: Vec<FormField>,
    pub focused: usize,
    pub submitting: bool,
    pub error: Option<String>,
}

impl CreateScreen {
    pub fn mount(kind: ResourceKind) -> Self {
        let specs: &[(&'static str, &'static str)] = match kind {
            ResourceKind::Devboxes => &[
                ("name", "Name"),
                ("blueprint_id", "Blueprint ID"),
                ("entrypoint", "Entrypoint"),
            ],
            ResourceKind::Blueprints => &[
                ("name", "Name"),
                ("dockerfile", "Dockerfile"),
                ("system_setup_commands", "Setup commands (; separated)"),
                ("resource_size_request", "Resources (SMALL, MEDIUM, LARGE...)"),
                ("architecture", "Architecture (x86_64, arm64)"),
                ("available_ports", "Ports (, separated)"),
            ],
            _ => &[],
        };
        Self {
            kind,
            fields: specs
                .iter()
                .map(|&(key, label)| FormField {
                    key,
                    label,
                    value: String::new(),
                })
                .collect(),
            focused: 0,
            submitting: false,
            error: None,
        }
    }

    fn handle(&mut self, action: &Action, instance: u64) -> Intent {
        let last = self.fields.len().saturating_sub(1);
        match action {
            Action::InputChar(c) => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.value.push(*c);
                }
            }
            Action::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.value.pop();
                }
            }
            Action::NextField => self.focused = (self.focused + 1).min(last),
            Action::PrevField => self.focused = self.focused.saturating_sub(1),
            Action::Cancel | Action::Back => return Intent::Back,
            Action::Submit => {
                if self.submitting {
                    return Intent::Status("Already submitting".to_string());
                }
                self.submitting = true;
                self.error = None;
                return Intent::Command(AppCommand::Create {
                    kind: self.kind,
                    instance,
                    fields: self
                        .fields
                        .iter()
                        .map(|field| (field.key.to_string(), field.value.clone()))
                        .collect(),
                });
            }
            _ => {}
        }
        Intent::None
    }

    pub fn apply_created(&mut self, result: Result<ResourceRecord, String>) -> Intent {
        self.submitting = false;
        match result {
            Ok(record) => Intent::Replace(Screen::Detail(self.kind), RouteParams::id(record.id)),
            Err(error) => {
                self.error = Some(error);
                Intent::None
            }
        }
    }
}

pub struct LogsScreen {
    pub kind: ResourceKind,
    pub id: String,
    pub lines: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub scroll: u16,
}

impl LogsScreen {
    pub fn mount(kind: ResourceKind, id: &str, instance: u64) -> (Self, AppCommand) {
        let screen = Self {
            kind,
            id: id.to_string(),
            lines: Vec::new(),
            loading: true,
            error: None,
            scroll: 0,
        };
        let command = AppCommand::LoadLogs {
            kind,
            instance,
            id: id.to_string(),
        };
        (screen, command)
    }

    fn handle(&mut self, action: &Action, instance: u64) -> Intent {
        let max_scroll = u16::try_from(self.lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
        match action {
            Action::Down => self.scroll = self.scroll.saturating_add(1).min(max_scroll),
            Action::Up => self.scroll = self.scroll.saturating_sub(1),
            Action::NextPage => self.scroll = self.scroll.saturating_add(10).min(max_scroll),
            Action::PrevPage => self.scroll = self.scroll.saturating_sub(10),
            Action::Top => self.scroll = 0,
            Action::Bottom => self.scroll = max_scroll,
            Action::Refresh => {
                self.loading = true;
                return Intent::Command(AppCommand::LoadLogs {
                    kind: self.kind,
                    instance,
                    id: self.id.clone(),
                });
            }
            Action::Back => return Intent::Back,
            _ => {}
        }
        Intent::None
    }

    pub fn apply_loaded(&mut self, result: Result<Vec<LogLine>, String>) {
        self.loading = false;
        match result {
            Ok(lines) => {
                self.lines = lines.iter().map(LogLine::render).collect();
                self.error = None;
                self.scroll = u16::try_from(self.lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
            }
            Err(error) => self.error = Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionsScreen, Intent, ListScreen, fetch_page};
    use crate::app::AppCommand;
    use crate::input::Action;
    use crate::model::{ListPage, ResourceKind, ResourceRecord};
    use crate::navigation::{RouteParams, Screen};
    use crate::store::ResourceStore;
    use serde_json::json;

    fn records(prefix: &str, range: std::ops::RangeInclusive<usize>) -> Vec<ResourceRecord> {
        range
            .map(|n| {
                ResourceRecord::from_value(json!({ "id": format!("{prefix}_{n}"), "status": "running" }))
                    .expect("record")
            })
            .collect()
    }

    fn loaded(items: Vec<ResourceRecord>, has_more: bool) -> Result<ListPage, String> {
        Ok(ListPage {
            items,
            total_count: None,
            has_more: Some(has_more),
        })
    }

    fn query_of(command: &AppCommand) -> (usize, Option<String>) {
        match command {
            AppCommand::FetchList { page, query, .. } => (*page, query.starting_after.clone()),
            other => panic!("expected list fetch, got {other:?}"),
        }
    }

    #[test]
    fn list_pages_forward_with_cursor_and_back_from_cache() {
        let mut store = ResourceStore::new();
        let (mut screen, command) = ListScreen::mount(ResourceKind::Devboxes, 1, &mut store, 10);
        assert_eq!(query_of(&command), (0, None));
        ListScreen::apply_loaded(&mut store, 0, loaded(records("item", 1..=10), true));
        assert!(!store.initial_loading());

        let Intent::Command(next) = screen.handle(&Action::NextPage, 1, &mut store) else {
            panic!("expected fetch for page 1");
        };
        assert_eq!(query_of(&next), (1, Some("item_10".to_string())));
        ListScreen::apply_loaded(&mut store, 1, loaded(records("item", 11..=15), false));
        assert_eq!(store.current_page(), 1);
        assert!(!store.has_more());

        assert_eq!(screen.handle(&Action::PrevPage, 1, &mut store), Intent::None);
        assert_eq!(store.current_page(), 0);
        assert_eq!(store.items()[0].id, "item_1");
        assert!(store.has_more());

        assert_eq!(screen.handle(&Action::NextPage, 1, &mut store), Intent::None);
        assert_eq!(store.items().len(), 5);
    }

    #[test]
    fn revisiting_a_full_last_page_keeps_server_has_more() {
        let mut store = ResourceStore::new();
        let (mut screen, _) = ListScreen::mount(ResourceKind::Devboxes, 1, &mut store, 10);
        ListScreen::apply_loaded(&mut store, 0, loaded(records("item", 1..=10), true));
        screen.handle(&Action::NextPage, 1, &mut store);
        ListScreen::apply_loaded(&mut store, 1, loaded(records("item", 11..=20), false));
        assert!(!store.has_more());

        assert_eq!(screen.handle(&Action::PrevPage, 1, &mut store), Intent::None);
        assert!(store.has_more());
        assert_eq!(screen.handle(&Action::NextPage, 1, &mut store), Intent::None);
        assert_eq!(store.current_page(), 1);
        assert!(!store.has_more());

        assert!(matches!(
            screen.handle(&Action::NextPage, 1, &mut store),
            Intent::Status(_)
        ));
        assert_eq!(store.current_page(), 1);
    }

    #[test]
    fn submitted_search_resets_to_first_page() {
        let mut store = ResourceStore::new();
        let (mut screen, _) = ListScreen::mount(ResourceKind::Blueprints, 1, &mut store, 10);
        ListScreen::apply_loaded(&mut store, 0, loaded(records("bp", 1..=10), true));
        store.set_current_page(3);

        screen.handle(&Action::StartSearch, 1, &mut store);
        for c in "base".chars() {
            screen.handle(&Action::InputChar(c), 1, &mut store);
        }
        let Intent::Command(AppCommand::FetchList { page, query, .. }) =
            screen.handle(&Action::Submit, 1, &mut store)
        else {
            panic!("expected search fetch");
        };
        assert_eq!(page, 0);
        assert_eq!(query.search.as_deref(), Some("base"));
        assert_eq!(store.search_query(), "base");
        assert_eq!(store.cached_pages(), 0);

        let Intent::Command(AppCommand::FetchList { query, .. }) =
            screen.handle(&Action::Back, 1, &mut store)
        else {
            panic!("expected clearing fetch");
        };
        assert!(query.search.is_none());
        assert_eq!(screen.handle(&Action::Back, 1, &mut store), Intent::Back);
    }

    #[test]
    fn unknown_cursor_falls_back_to_first_page() {
        let mut store: ResourceStore<ResourceRecord> = ResourceStore::new();
        store.set_page_size(10);
        let command = fetch_page(ResourceKind::Snapshots, 1, &mut store, 4);
        assert_eq!(query_of(&command), (0, None));
    }

    #[test]
    fn fetch_errors_keep_items_and_clear_loading() {
        let mut store = ResourceStore::new();
        let (_, _) = ListScreen::mount(ResourceKind::Objects, 1, &mut store, 10);
        ListScreen::apply_loaded(&mut store, 0, loaded(records("obj", 1..=2), false));
        store.begin_fetch();
        ListScreen::apply_loaded(&mut store, 0, Err("timeout".to_string()));
        assert_eq!(store.error(), Some("timeout"));
        assert!(!store.loading());
        assert_eq!(store.items().len(), 2);
    }

    #[test]
    fn enter_on_list_pushes_detail_for_selection() {
        let mut store = ResourceStore::new();
        let (mut screen, _) = ListScreen::mount(ResourceKind::Devboxes, 1, &mut store, 10);
        ListScreen::apply_loaded(&mut store, 0, loaded(records("dbx", 1..=3), false));
        screen.handle(&Action::Down, 1, &mut store);
        screen.handle(&Action::Down, 1, &mut store);
        screen.handle(&Action::Down, 1, &mut store);
        assert_eq!(
            screen.handle(&Action::Select, 1, &mut store),
            Intent::Push(
                Screen::Detail(ResourceKind::Devboxes),
                RouteParams::id("dbx_3")
            )
        );
    }

    #[test]
    fn destructive_operation_waits_for_confirmation() {
        let mut store = ResourceStore::new();
        store.set_items(records("dbx", 1..=1));
        let (mut screen, _) = ActionsScreen::mount(
            ResourceKind::Devboxes,
            &RouteParams::id("dbx_1").with("operation", "shutdown"),
            &store,
            9,
        );
        assert_eq!(screen.operations[screen.selected].key, "shutdown");

        assert!(matches!(
            screen.handle(&Action::Select, 9),
            Intent::Status(_)
        ));
        assert!(!screen.ops.is_loading());

        let Intent::Command(AppCommand::RunOperation {
            id,
            operation,
            instance,
            ..
        }) = screen.handle(&Action::ConfirmYes, 9)
        else {
            panic!("expected operation");
        };
        assert_eq!((id.as_str(), operation.as_str(), instance), ("dbx_1", "shutdown", 9));
        assert!(screen.ops.is_loading());
        assert_eq!(screen.ops.executing_operation(), Some("shutdown"));
    }

    #[test]
    fn exec_prompts_for_command() {
        let mut store = ResourceStore::new();
        store.set_items(records("dbx", 1..=1));
        let (mut screen, _) = ActionsScreen::mount(
            ResourceKind::Devboxes,
            &RouteParams::id("dbx_1").with("operation", "exec"),
            &store,
            1,
        );
        screen.handle(&Action::Select, 1);
        assert_eq!(screen.prompt.as_deref(), Some(""));
        for c in "ls".chars() {
            screen.handle(&Action::InputChar(c), 1);
        }
        let Intent::Command(AppCommand::RunOperation { extra, .. }) =
            screen.handle(&Action::Submit, 1)
        else {
            panic!("expected exec");
        };
        assert_eq!(extra.as_deref(), Some("ls"));
        assert!(screen.prompt.is_none());
    }

    #[test]
    fn actions_without_list_entry_fetch_record_by_id() {
        let store = ResourceStore::new();
        let (mut screen, command) = ActionsScreen::mount(
            ResourceKind::Devboxes,
            &RouteParams::id("dbx_9").with("operation", "resume"),
            &store,
            4,
        );
        assert_eq!(
            command,
            AppCommand::FetchRecord {
                kind: ResourceKind::Devboxes,
                instance: 4,
                id: "dbx_9".to_string(),
            }
        );
        assert!(screen.operations.is_empty());
        assert!(screen.refreshing);

        let suspended =
            ResourceRecord::from_value(json!({ "id": "dbx_9", "status": "suspended" }))
                .expect("record");
        screen.apply_record(Ok(suspended));
        assert!(!screen.refreshing);
        assert_eq!(screen.operations[screen.selected].key, "resume");
        assert!(screen.notice.is_none());
    }

    #[test]
    fn handed_over_status_beats_stale_list_entry() {
        let mut store = ResourceStore::new();
        store.set_items(records("dbx", 1..=1));
        let (screen, _) = ActionsScreen::mount(
            ResourceKind::Devboxes,
            &RouteParams::id("dbx_1")
                .with("status", "suspended")
                .with("operation", "resume"),
            &store,
            1,
        );
        assert_eq!(screen.item.status.as_deref(), Some("suspended"));
        assert_eq!(screen.operations[screen.selected].key, "resume");
    }

    #[test]
    fn unavailable_operation_is_reported() {
        let mut store = ResourceStore::new();
        store.set_items(records("dbx", 1..=1));
        let (mut screen, _) = ActionsScreen::mount(
            ResourceKind::Devboxes,
            &RouteParams::id("dbx_1").with("operation", "resume"),
            &store,
            1,
        );
        assert_eq!(screen.selected, 0);
        assert!(screen.notice.as_deref().is_some_and(|notice| notice.contains("Resume")));

        screen.apply_record(Err("timeout".to_string()));
        assert!(screen.notice.as_deref().is_some_and(|notice| notice.contains("timeout")));
        assert!(!screen.operations.is_empty());
    }
}
