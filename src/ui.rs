use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::App;
use crate::input::InputMode;
use crate::layout::{BreadcrumbMode, LayoutBudget, LayoutRequest, NavTipsMode, ScreenType};
use crate::model::ResourceRecord;
use crate::screens::{
    ActionsScreen, CreateScreen, DetailScreen, ListScreen, LogsScreen, MenuScreen, ScreenState,
};
use crate::store::ResourceStore;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);

const HIGHLIGHT_SYMBOL: &str = "󰜴 ";

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

    if let Some(message) = app.fatal() {
        render_fatal(frame, area, message);
        return;
    }

    let request = layout_request(app, area);
    let budget = app.layout_budget(request);
    let header_height = if budget.minimal_chrome { 0 } else { 1 };
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    if header_height > 0 {
        render_breadcrumbs(frame, root[0], app, budget.breadcrumb_mode);
    }
    render_body(frame, root[1], app, &budget);
    render_status(frame, root[2], app);
    render_nav_tips(frame, root[3], app, budget.nav_tips_mode);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn layout_request(app: &App, area: Rect) -> LayoutRequest {
    let base = |screen| LayoutRequest::new(screen, area.width, area.height);
    let Some(mounted) = app.mounted() else {
        return base(ScreenType::Minimal);
    };
    match &mounted.screen {
        ScreenState::Menu(_) => base(ScreenType::Menu),
        ScreenState::List(_) => LayoutRequest {
            has_search: true,
            has_stats: true,
            ..base(ScreenType::List)
        },
        ScreenState::Detail(detail) => LayoutRequest {
            operation_count: detail.operations().len(),
            ..base(ScreenType::Detail)
        },
        ScreenState::Actions(actions) if actions.prompt.is_some() => base(ScreenType::Prompt),
        ScreenState::Actions(actions) => LayoutRequest {
            operation_count: actions.operations.len(),
            ..base(ScreenType::Detail)
        },
        ScreenState::Create(_) => base(ScreenType::Form),
        ScreenState::Logs(_) => base(ScreenType::Logs),
        ScreenState::Unknown(_) => base(ScreenType::Minimal),
    }
}

fn render_breadcrumbs(frame: &mut Frame, area: Rect, app: &App, mode: BreadcrumbMode) {
    let labels = app.breadcrumbs();
    let shown = match mode {
        BreadcrumbMode::Full => labels,
        BreadcrumbMode::Compact if labels.len() > 2 => {
            let mut tail = vec!["…".to_string()];
            tail.extend(labels[labels.len() - 2..].iter().cloned());
            tail
        }
        BreadcrumbMode::Compact => labels,
        BreadcrumbMode::Minimal => labels.last().cloned().into_iter().collect(),
    };

    let mut spans = vec![Span::styled(
        " rlt ",
        Style::default()
            .fg(Color::White)
            .bg(PL_A)
            .add_modifier(Modifier::BOLD),
    )];
    let last = shown.len().saturating_sub(1);
    for (index, label) in shown.iter().enumerate() {
        spans.push(Span::styled(" › ", Style::default().fg(MUTED)));
        let style = if index == last {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(compact_text(label, 28), style));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App, budget: &LayoutBudget) {
    let Some(mounted) = app.mounted() else {
        return;
    };
    match &mounted.screen {
        ScreenState::Menu(menu) => render_menu(frame, area, menu),
        ScreenState::List(list) => render_list(frame, area, list, app.store(list.kind)),
        ScreenState::Detail(detail) => render_detail(frame, area, detail, budget),
        ScreenState::Actions(actions) => render_actions(frame, area, actions),
        ScreenState::Create(create) => render_create(frame, area, create),
        ScreenState::Logs(logs) => render_logs(frame, area, logs),
        ScreenState::Unknown(name) => render_unknown(frame, area, name),
    }
}

fn panel_block(title: impl Into<String>, border: Color) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn render_menu(frame: &mut Frame, area: Rect, menu: &MenuScreen) {
    let lines = MenuScreen::entries()
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            if index == menu.selected {
                Line::from(Span::styled(
                    format!("{HIGHLIGHT_SYMBOL}{}", kind.title()),
                    Style::default()
                        .fg(ACCENT)
                        .bg(SELECTED_BG)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(
                    format!("  {}", kind.title()),
                    Style::default().fg(Color::White),
                ))
            }
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(lines).block(panel_block("Resources", ACCENT)),
        area,
    );
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    list: &ListScreen,
    store: &ResourceStore<ResourceRecord>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    let search_line = if list.search.search_mode() {
        Line::from(vec![
            Span::styled("/", Style::default().fg(ACCENT)),
            Span::styled(
                format!("{}▏", list.search.search_query()),
                Style::default().fg(Color::White),
            ),
        ])
    } else if list.search.has_submitted() {
        Line::from(vec![
            Span::styled("search: ", Style::default().fg(MUTED)),
            Span::styled(
                list.search.submitted_query().to_string(),
                Style::default().fg(WARN),
            ),
            Span::styled("  (esc clears)", Style::default().fg(MUTED)),
        ])
    } else {
        Line::from(Span::styled("/ to search", Style::default().fg(MUTED)))
    };
    frame.render_widget(Paragraph::new(search_line), chunks[0]);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            page_stats(store),
            Style::default().fg(MUTED),
        ))),
        chunks[1],
    );

    let title = format!("{} ({})", list.kind.title(), store.total_count());
    if let Some(error) = store.error()
        && store.items().is_empty()
    {
        let panel = Paragraph::new(Text::from(error.to_string()))
            .wrap(Wrap { trim: false })
            .block(panel_block(format!("{} Error", list.kind.title()), ERROR))
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, chunks[2]);
        return;
    }
    if store.initial_loading() && store.items().is_empty() {
        let panel = Paragraph::new(format!("Loading {}…", list.kind.title().to_lowercase()))
            .block(panel_block(title, MUTED))
            .style(Style::default().fg(MUTED));
        frame.render_widget(panel, chunks[2]);
        return;
    }

    let headers = list.kind.list_headers();
    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));
    let rows = store.items().iter().map(|record| {
        Row::new(
            record
                .columns(list.kind)
                .into_iter()
                .map(|column| Cell::from(column).style(Style::default().fg(Color::White))),
        )
    });

    let table = Table::new(rows, column_constraints(headers.len()))
        .header(header_row)
        .block(panel_block(title, ACCENT))
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(HIGHLIGHT_SYMBOL);

    let mut state = TableState::default();
    state.select(
        usize::try_from(store.selected_index())
            .ok()
            .filter(|index| *index < store.items().len()),
    );
    frame.render_stateful_widget(table, chunks[2], &mut state);
}

fn page_stats(store: &ResourceStore<ResourceRecord>) -> String {
    let count = store.items().len();
    let start = store.current_page() * store.page_size().max(1);
    let range = if count == 0 {
        "no items".to_string()
    } else {
        format!("{}-{} of {}", start + 1, start + count, store.total_count())
    };
    let mut stats = format!("Page {}  {range}", store.current_page() + 1);
    if store.has_more() {
        stats.push_str("  more →");
    }
    if store.cached_pages() > 1 {
        stats.push_str(&format!("  {} pages cached", store.cached_pages()));
    }
    if store.loading() {
        stats.push_str("  refreshing…");
    }
    stats
}

fn render_detail(frame: &mut Frame, area: Rect, detail: &DetailScreen, budget: &LayoutBudget) {
    let operations = detail.operations();
    let visible = budget
        .max_visible_actions
        .unwrap_or(operations.len())
        .min(operations.len());
    let actions_height = if visible == 0 { 0 } else { visible as u16 + 2 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(actions_height)])
        .split(area);

    let mut title = format!("{} {}", detail.kind.singular(), detail.id);
    if let Some(status) = detail
        .detail
        .data()
        .and_then(|record| record.status.as_deref())
    {
        title.push_str(&format!("  [{status}]"));
    }
    if detail.detail.loading() {
        title.push_str("  loading…");
    } else if detail.detail.polling() {
        title.push_str("  polling");
    } else if detail.paused {
        title.push_str("  polling paused");
    }

    let (text, border) = match (detail.detail.data(), detail.detail.error()) {
        (Some(record), _) => (highlight_json_text(&record.detail_text()), ACCENT),
        (None, Some(error)) => (
            Text::from(Span::styled(error.to_string(), Style::default().fg(ERROR))),
            ERROR,
        ),
        (None, None) => (
            Text::from(Span::styled("Loading…", Style::default().fg(MUTED))),
            MUTED,
        ),
    };
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((detail.scroll, 0))
            .block(panel_block(title, border)),
        chunks[0],
    );

    if visible == 0 {
        return;
    }
    let offset = detail
        .action_index
        .saturating_sub(visible.saturating_sub(1))
        .min(operations.len() - visible);
    let lines = operations
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(index, spec)| operation_line(spec.label, spec.destructive, index == detail.action_index))
        .collect::<Vec<_>>();
    let title = if visible < operations.len() {
        format!("Actions ({}/{})", visible, operations.len())
    } else {
        "Actions".to_string()
    };
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, MUTED)), chunks[1]);
}

fn operation_line(label: &str, destructive: bool, selected: bool) -> Line<'static> {
    let fg = if destructive { ERROR } else { Color::White };
    if selected {
        Line::from(Span::styled(
            format!("{HIGHLIGHT_SYMBOL}{label}"),
            Style::default()
                .fg(fg)
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(format!("  {label}"), Style::default().fg(fg)))
    }
}

fn render_actions(frame: &mut Frame, area: Rect, actions: &ActionsScreen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(actions.operations.len().max(1) as u16 + 2),
            Constraint::Min(1),
        ])
        .split(area);

    let title = format!(
        "Actions  {} {}",
        actions.kind.singular(),
        compact_text(actions.item.display_name(), 40)
    );
    let lines = if actions.operations.is_empty() {
        let message = if actions.refreshing {
            "Loading operations…"
        } else {
            "No operations available in this state"
        };
        vec![Line::from(Span::styled(message, Style::default().fg(MUTED)))]
    } else {
        actions
            .operations
            .iter()
            .enumerate()
            .map(|(index, spec)| operation_line(spec.label, spec.destructive, index == actions.selected))
            .collect()
    };
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, ACCENT)), chunks[0]);

    let mut output = Vec::new();
    if let Some(notice) = &actions.notice {
        output.push(Line::from(Span::styled(notice.clone(), Style::default().fg(WARN))));
    }
    if let Some(prompt) = &actions.prompt {
        let label = actions
            .operations
            .get(actions.selected)
            .and_then(|spec| spec.prompt)
            .unwrap_or("input");
        output.push(Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(ACCENT)),
            Span::styled(format!("{prompt}▏"), Style::default().fg(Color::White)),
        ]));
    }
    if let Some((spec, _)) = &actions.pending_confirm {
        output.push(Line::from(Span::styled(
            format!("{} {}? press y to confirm, n to cancel", spec.label, actions.item.display_name()),
            Style::default().fg(WARN).add_modifier(Modifier::BOLD),
        )));
    }
    if actions.ops.is_loading() {
        output.push(Line::from(Span::styled(
            format!(
                "Running {} on {}…",
                actions.ops.executing_operation().unwrap_or("operation"),
                actions
                    .ops
                    .selected_item()
                    .map_or(actions.item.display_name(), ResourceRecord::display_name)
            ),
            Style::default().fg(MUTED),
        )));
    }
    if let Some(result) = actions.ops.result() {
        output.extend(
            result
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(ACCENT)))),
        );
    }
    if let Some(error) = actions.ops.error() {
        output.extend(
            error
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(ERROR)))),
        );
    }
    frame.render_widget(
        Paragraph::new(output)
            .wrap(Wrap { trim: false })
            .block(panel_block("Output", MUTED)),
        chunks[1],
    );
}

fn render_create(frame: &mut Frame, area: Rect, create: &CreateScreen) {
    let mut lines = Vec::new();
    for (index, field) in create.fields.iter().enumerate() {
        let focused = index == create.focused;
        let label_style = if focused {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        let cursor = if focused { "▏" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<32}", field.label), label_style),
            Span::styled(
                format!("{}{cursor}", field.value),
                Style::default().fg(Color::White),
            ),
        ]));
    }
    lines.push(Line::from(""));
    if create.submitting {
        lines.push(Line::from(Span::styled(
            format!("Creating {}…", create.kind.singular()),
            Style::default().fg(MUTED),
        )));
    }
    if let Some(error) = &create.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(ERROR),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block(format!("New {}", create.kind.singular()), ACCENT)),
        area,
    );
}

fn render_logs(frame: &mut Frame, area: Rect, logs: &LogsScreen) {
    let mut title = format!("Logs {} ({} lines)", logs.id, logs.lines.len());
    if logs.loading {
        title.push_str("  loading…");
    }
    let (text, border) = match &logs.error {
        Some(error) => (
            Text::from(Span::styled(error.clone(), Style::default().fg(ERROR))),
            ERROR,
        ),
        None if logs.lines.is_empty() && !logs.loading => (
            Text::from(Span::styled("No log lines", Style::default().fg(MUTED))),
            MUTED,
        ),
        None => (Text::from(logs.lines.join("\n")), ACCENT),
    };
    let visible = area.height.saturating_sub(2);
    let scroll = logs.scroll.saturating_sub(visible.saturating_sub(1));
    frame.render_widget(
        Paragraph::new(text)
            .scroll((scroll, 0))
            .block(panel_block(title, border))
            .style(Style::default().fg(Color::White)),
        area,
    );
}

fn render_unknown(frame: &mut Frame, area: Rect, name: &str) {
    let panel = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Unknown screen: {name}"),
            Style::default().fg(WARN).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("esc to go back", Style::default().fg(MUTED))),
    ])
    .alignment(Alignment::Center)
    .block(panel_block("Not found", WARN));
    frame.render_widget(panel, area);
}

fn render_fatal(frame: &mut Frame, area: Rect, message: &str) {
    let area = centered_rect(70, 50, area);
    frame.render_widget(Clear, area);
    let mut lines = vec![
        Line::from(Span::styled(
            "The screen crashed and cannot continue.",
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(
        message
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::White)))),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "press q to quit",
        Style::default().fg(MUTED),
    )));
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block("Error", ERROR)),
        area,
    );
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let (mode_label, mode_bg) = match app.mode() {
        InputMode::Normal => (" 󰘳 nrm ", PL_A),
        InputMode::Search => (" 󰍉 srch ", WARN),
        InputMode::Prompt => (" 󰘦 arg ", WARN),
        InputMode::Form => (" 󰏫 form ", WARN),
    };
    let mode_fg = if mode_bg == WARN {
        Color::Black
    } else {
        Color::White
    };
    let status = app.status();
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, mode_label, mode_fg, mode_bg, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(
            " {} {} ",
            footer_status_icon(status),
            compact_text(status, area.width.saturating_sub(14).max(24) as usize)
        ),
        Color::White,
        PL_B,
        BG,
    );
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_nav_tips(frame: &mut Frame, area: Rect, app: &App, mode: NavTipsMode) {
    let tips = nav_tips(app);
    let text = tips
        .iter()
        .map(|(key, label)| match mode {
            NavTipsMode::Full => format!("{key} {label}"),
            NavTipsMode::Compact => format!("{key} {}", compact_text(label, 6)),
            NavTipsMode::KeysOnly => key.to_string(),
        })
        .collect::<Vec<_>>()
        .join("  ");
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(text, Style::default().fg(MUTED))))
            .style(Style::default().bg(BG)),
        area,
    );
}

fn nav_tips(app: &App) -> Vec<(&'static str, &'static str)> {
    match app.mode() {
        InputMode::Search => return vec![("enter", "search"), ("esc", "cancel")],
        InputMode::Prompt => return vec![("enter", "run"), ("esc", "cancel")],
        InputMode::Form => {
            return vec![("tab", "next field"), ("enter", "create"), ("esc", "cancel")];
        }
        InputMode::Normal => {}
    }
    let Some(mounted) = app.mounted() else {
        return vec![("q", "quit")];
    };
    let mut tips = match &mounted.screen {
        ScreenState::Menu(_) => vec![("↑↓", "move"), ("enter", "open")],
        ScreenState::List(list) => {
            let mut tips = vec![
                ("↑↓", "move"),
                ("←→", "page"),
                ("enter", "detail"),
                ("a", "actions"),
                ("/", "search"),
                ("r", "refresh"),
            ];
            if list.kind.supports_create() {
                tips.push(("c", "create"));
            }
            if list.kind.supports_logs() {
                tips.push(("l", "logs"));
            }
            tips
        }
        ScreenState::Detail(detail) => {
            let mut tips = vec![
                ("↑↓", "action"),
                ("enter", "run"),
                ("←→", "scroll"),
                ("r", "refresh"),
                ("p", if detail.paused { "resume polling" } else { "pause polling" }),
            ];
            if detail.kind.supports_logs() {
                tips.push(("l", "logs"));
            }
            tips
        }
        ScreenState::Actions(actions) if actions.pending_confirm.is_some() => {
            vec![("y", "confirm"), ("n", "cancel")]
        }
        ScreenState::Actions(_) => vec![("↑↓", "move"), ("enter", "run")],
        ScreenState::Logs(_) => vec![("↑↓", "scroll"), ("g/G", "top/end"), ("r", "reload")],
        ScreenState::Create(_) | ScreenState::Unknown(_) => Vec::new(),
    };
    if app.can_go_back() {
        tips.push(("esc", "back"));
    } else if !matches!(mounted.screen, ScreenState::Menu(_)) {
        tips.push(("esc", "menu"));
    }
    tips.extend([("H", "home"), ("?", "help"), ("q", "quit")]);
    tips
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "rlt help  screen:{}",
            app.navigation().current_screen
        )),
        Line::from(""),
    ];
    for (key, label) in nav_tips(app) {
        lines.push(Line::from(vec![
            Span::styled(format!("{key:<8}"), Style::default().fg(ACCENT)),
            Span::raw(label),
        ]));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help", ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "error",
        "timed out",
        "unauthorized",
        "forbidden",
        "not found",
        "missing",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn highlight_json_text(pretty: &str) -> Text<'static> {
    Text::from(pretty.lines().map(highlight_json_line).collect::<Vec<_>>())
}

fn highlight_json_line(line: &str) -> Line<'static> {
    let chars = line.chars().collect::<Vec<_>>();
    let mut index = 0usize;
    let mut spans = Vec::new();

    while index < chars.len() {
        let ch = chars[index];
        if ch.is_ascii_whitespace() {
            spans.push(Span::raw(ch.to_string()));
            index += 1;
            continue;
        }

        if matches!(ch, '{' | '}' | '[' | ']' | ':' | ',') {
            spans.push(Span::styled(ch.to_string(), Style::default().fg(MUTED)));
            index += 1;
            continue;
        }

        if ch == '"' {
            let (token, next_index) = read_json_string(&chars, index);
            let is_key = chars[next_index..]
                .iter()
                .find(|c| !c.is_ascii_whitespace())
                .is_some_and(|c| *c == ':');
            let color = if is_key {
                Color::Rgb(103, 232, 249)
            } else {
                Color::Rgb(125, 211, 252)
            };
            spans.push(Span::styled(token, Style::default().fg(color)));
            index = next_index;
            continue;
        }

        let start = index;
        while index < chars.len() && !matches!(chars[index], ',' | ']' | '}') {
            index += 1;
        }
        let token = chars[start..index].iter().collect::<String>();
        let color = match token.trim() {
            "true" | "false" | "null" => WARN,
            _ => Color::Rgb(251, 146, 60),
        };
        spans.push(Span::styled(token, Style::default().fg(color)));
    }

    Line::from(spans)
}

fn read_json_string(chars: &[char], start: usize) -> (String, usize) {
    let mut escaped = false;
    let mut token = String::from('"');
    for (offset, ch) in chars[start + 1..].iter().enumerate() {
        token.push(*ch);
        if escaped {
            escaped = false;
        } else if *ch == '\\' {
            escaped = true;
        } else if *ch == '"' {
            return (token, start + offset + 2);
        }
    }
    (token, chars.len())
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}
