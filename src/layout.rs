pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

const BREADCRUMB_LINES: u16 = 1;

const LIST_CHROME: u16 = 6;
const DETAIL_CHROME: u16 = 5;
const FORM_CHROME: u16 = 6;
const MENU_CHROME: u16 = 5;
const LOGS_CHROME: u16 = 4;
const PROMPT_CHROME: u16 = 6;
const MINIMAL_CHROME: u16 = 2;

const SEARCH_LINES: u16 = 1;
const STATS_LINES: u16 = 1;
const ACTIONS_TITLE_LINES: u16 = 1;

const VERY_SHORT_HEIGHT: u16 = 12;
const BREADCRUMB_FULL_HEIGHT: u16 = 30;
const BREADCRUMB_COMPACT_HEIGHT: u16 = 20;
const BREADCRUMB_FULL_WIDTH: u16 = 60;
const BREADCRUMB_COMPACT_WIDTH: u16 = 40;
const NAV_TIPS_FULL_HEIGHT: u16 = 24;
const NAV_TIPS_COMPACT_HEIGHT: u16 = 16;

/// Heights at or above which the detail action list is capped; below the last
/// entry the smallest cap applies.
const ACTION_CAPS: [(u16, Option<usize>); 3] = [(40, None), (30, Some(4)), (20, Some(3))];
const SMALLEST_ACTION_CAP: usize = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScreenType {
    List,
    Detail,
    Form,
    Menu,
    Logs,
    Prompt,
    Minimal,
}

impl ScreenType {
    fn chrome_lines(self) -> u16 {
        match self {
            Self::List => LIST_CHROME,
            Self::Detail => DETAIL_CHROME,
            Self::Form => FORM_CHROME,
            Self::Menu => MENU_CHROME,
            Self::Logs => LOGS_CHROME,
            Self::Prompt => PROMPT_CHROME,
            Self::Minimal => MINIMAL_CHROME,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BreadcrumbMode {
    Full,
    Compact,
    Minimal,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NavTipsMode {
    Full,
    Compact,
    KeysOnly,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LayoutRequest {
    pub screen: ScreenType,
    pub width: u16,
    pub height: u16,
    pub has_search: bool,
    pub has_stats: bool,
    pub operation_count: usize,
    pub max_visible_actions: Option<usize>,
}

impl LayoutRequest {
    pub fn new(screen: ScreenType, width: u16, height: u16) -> Self {
        Self {
            screen,
            width,
            height,
            has_search: false,
            has_stats: false,
            operation_count: 0,
            max_visible_actions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LayoutBudget {
    pub content_lines: u16,
    pub chrome_lines: u16,
    pub breadcrumb_mode: BreadcrumbMode,
    pub nav_tips_mode: NavTipsMode,
    /// `None` means every action fits.
    pub max_visible_actions: Option<usize>,
    pub minimal_chrome: bool,
}

pub fn compute_layout(request: &LayoutRequest) -> LayoutBudget {
    let height = request.height;
    let minimal_chrome = height < VERY_SHORT_HEIGHT;

    let height_cap = ACTION_CAPS
        .iter()
        .find(|(min_height, _)| height >= *min_height)
        .map(|(_, cap)| *cap)
        .unwrap_or(Some(SMALLEST_ACTION_CAP));
    let max_visible_actions = match (height_cap, request.max_visible_actions) {
        (Some(cap), Some(limit)) => Some(cap.min(limit)),
        (cap, None) => cap,
        (None, limit) => limit,
    };

    let mut chrome = request.screen.chrome_lines();
    if request.has_search {
        chrome += SEARCH_LINES;
    }
    if request.has_stats {
        chrome += STATS_LINES;
    }
    if request.screen == ScreenType::Detail && request.operation_count > 0 {
        let rows = match max_visible_actions {
            // One extra row for the "+N more" hint.
            Some(cap) => request.operation_count.min(cap + 1),
            None => request.operation_count,
        };
        chrome += ACTIONS_TITLE_LINES + u16::try_from(rows).unwrap_or(u16::MAX);
    }
    if minimal_chrome {
        chrome = chrome.saturating_sub(BREADCRUMB_LINES);
    }
    let chrome = chrome.min(height.saturating_sub(1));

    LayoutBudget {
        content_lines: height.saturating_sub(chrome),
        chrome_lines: chrome,
        breadcrumb_mode: breadcrumb_mode(request.width, height),
        nav_tips_mode: nav_tips_mode(height),
        max_visible_actions,
        minimal_chrome,
    }
}

fn breadcrumb_mode(width: u16, height: u16) -> BreadcrumbMode {
    let by_height = if height >= BREADCRUMB_FULL_HEIGHT {
        BreadcrumbMode::Full
    } else if height >= BREADCRUMB_COMPACT_HEIGHT {
        BreadcrumbMode::Compact
    } else {
        BreadcrumbMode::Minimal
    };
    let by_width = if width >= BREADCRUMB_FULL_WIDTH {
        BreadcrumbMode::Full
    } else if width >= BREADCRUMB_COMPACT_WIDTH {
        BreadcrumbMode::Compact
    } else {
        BreadcrumbMode::Minimal
    };
    degrade(by_height, by_width)
}

fn degrade(a: BreadcrumbMode, b: BreadcrumbMode) -> BreadcrumbMode {
    let rank = |mode: BreadcrumbMode| match mode {
        BreadcrumbMode::Full => 0,
        BreadcrumbMode::Compact => 1,
        BreadcrumbMode::Minimal => 2,
    };
    if rank(a) >= rank(b) { a } else { b }
}

fn nav_tips_mode(height: u16) -> NavTipsMode {
    if height >= NAV_TIPS_FULL_HEIGHT {
        NavTipsMode::Full
    } else if height >= NAV_TIPS_COMPACT_HEIGHT {
        NavTipsMode::Compact
    } else {
        NavTipsMode::KeysOnly
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutBudgeter {
    last: Option<(LayoutRequest, LayoutBudget)>,
}

impl LayoutBudgeter {
    pub fn budget(&mut self, request: LayoutRequest) -> LayoutBudget {
        if let Some((last_request, last_budget)) = &self.last
            && *last_request == request
        {
            return *last_budget;
        }
        let budget = compute_layout(&request);
        self.last = Some((request, budget));
        budget
    }
}

pub trait TerminalSize {
    fn size(&self) -> Option<(u16, u16)>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermSize;

impl TerminalSize for CrosstermSize {
    fn size(&self) -> Option<(u16, u16)> {
        crossterm::terminal::size().ok()
    }
}

pub fn viewport(source: &dyn TerminalSize) -> (u16, u16) {
    let (width, height) = source.size().unwrap_or((0, 0));
    (
        if width == 0 { DEFAULT_WIDTH } else { width },
        if height == 0 { DEFAULT_HEIGHT } else { height },
    )
}
