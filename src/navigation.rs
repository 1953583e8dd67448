use crate::model::ResourceKind;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Screen {
    Menu,
    List(ResourceKind),
    Detail(ResourceKind),
    Actions(ResourceKind),
    Create(ResourceKind),
    Logs(ResourceKind),
    Other(String),
}

impl Screen {
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name == "menu" {
            return Self::Menu;
        }
        if let Some(kind) = ResourceKind::from_token(name) {
            return Self::List(kind);
        }
        let Some((prefix, stage)) = name.rsplit_once('-') else {
            return Self::Other(name.to_string());
        };
        let Some(kind) = ResourceKind::from_screen_prefix(prefix)
            .or_else(|| ResourceKind::from_token(prefix))
        else {
            return Self::Other(name.to_string());
        };
        match stage {
            "list" => Self::List(kind),
            "detail" => Self::Detail(kind),
            "actions" => Self::Actions(kind),
            "create" => Self::Create(kind),
            "logs" => Self::Logs(kind),
            _ => Self::Other(name.to_string()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Menu => "menu".to_string(),
            Self::List(kind) => format!("{}-list", kind.screen_prefix()),
            Self::Detail(kind) => format!("{}-detail", kind.screen_prefix()),
            Self::Actions(kind) => format!("{}-actions", kind.screen_prefix()),
            Self::Create(kind) => format!("{}-create", kind.screen_prefix()),
            Self::Logs(kind) => format!("{}-logs", kind.screen_prefix()),
            Self::Other(name) => name.clone(),
        }
    }

    pub fn resource_class(&self) -> Option<ResourceKind> {
        match self {
            Self::Menu => None,
            Self::List(kind)
            | Self::Detail(kind)
            | Self::Actions(kind)
            | Self::Create(kind)
            | Self::Logs(kind) => Some(*kind),
            Self::Other(name) => name
                .rsplit_once('-')
                .and_then(|(prefix, _)| {
                    ResourceKind::from_screen_prefix(prefix)
                        .or_else(|| ResourceKind::from_token(prefix))
                }),
        }
    }

    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Detail(_) | Self::Actions(_) | Self::Logs(_) => &["id"],
            _ => &[],
        }
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::new().with("id", id)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Route {
    pub screen: Screen,
    pub params: RouteParams,
}

impl Route {
    pub fn new(screen: Screen, params: RouteParams) -> Self {
        Self { screen, params }
    }

    pub fn initial() -> Self {
        Self::new(Screen::Menu, RouteParams::new())
    }

    pub fn missing_params(&self) -> Vec<&'static str> {
        self.screen
            .required_params()
            .iter()
            .copied()
            .filter(|key| self.params.get(key).is_none_or(|value| value.is_empty()))
            .collect()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NavigationState {
    pub current_screen: Screen,
    pub params: RouteParams,
    /// Previous routes, oldest first. Never contains the active route.
    pub history: Vec<Route>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::initial()
    }
}

impl NavigationState {
    pub fn initial() -> Self {
        let Route { screen, params } = Route::initial();
        Self {
            current_screen: screen,
            params,
            history: Vec::new(),
        }
    }

    pub fn current_route(&self) -> Route {
        Route::new(self.current_screen.clone(), self.params.clone())
    }

    pub fn navigate(&self, screen: Screen, params: RouteParams) -> Self {
        Self {
            current_screen: screen,
            params,
            history: Vec::new(),
        }
    }

    pub fn push(&self, screen: Screen, params: RouteParams) -> Self {
        let mut history = self.history.clone();
        history.push(self.current_route());
        Self {
            current_screen: screen,
            params,
            history,
        }
    }

    pub fn replace(&self, screen: Screen, params: RouteParams) -> Self {
        Self {
            current_screen: screen,
            params,
            history: self.history.clone(),
        }
    }

    pub fn go_back(&self) -> Self {
        let mut history = self.history.clone();
        match history.pop() {
            Some(previous) => Self {
                current_screen: previous.screen,
                params: previous.params,
                history,
            },
            None => Self::initial(),
        }
    }

    pub fn reset(&self) -> Self {
        Self::initial()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn breadcrumbs(&self) -> Vec<Route> {
        self.history
            .iter()
            .cloned()
            .chain(std::iter::once(self.current_route()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{NavigationState, Route, RouteParams, Screen};
    use crate::model::ResourceKind;

    fn sample_states() -> Vec<NavigationState> {
        let base = NavigationState::initial();
        let listed = base.push(Screen::List(ResourceKind::Devboxes), RouteParams::new());
        let detailed = listed.push(
            Screen::Detail(ResourceKind::Devboxes),
            RouteParams::id("dbx_1"),
        );
        let jumped = detailed.navigate(
            Screen::List(ResourceKind::Blueprints),
            RouteParams::new().with("focus", "search"),
        );
        vec![base, listed, detailed, jumped]
    }

    #[test]
    fn push_then_back_restores_previous_state() {
        let targets = [
            Screen::Menu,
            Screen::Detail(ResourceKind::Snapshots),
            Screen::Other("nowhere".to_string()),
        ];
        for state in sample_states() {
            for target in &targets {
                let pushed = state.push(target.clone(), RouteParams::id("x"));
                assert_eq!(pushed.go_back(), state);
            }
        }
    }

    #[test]
    fn reset_always_clears_history() {
        for state in sample_states() {
            let reset = state.reset();
            assert!(reset.history.is_empty());
            assert!(!reset.can_go_back());
            assert_eq!(reset.current_screen, Screen::Menu);
        }
    }

    #[test]
    fn history_never_holds_active_route() {
        let state = NavigationState::initial()
            .push(Screen::List(ResourceKind::Devboxes), RouteParams::new())
            .push(
                Screen::Detail(ResourceKind::Devboxes),
                RouteParams::id("dbx_1"),
            );
        assert_eq!(state.history.len(), 2);
        assert!(!state.history.contains(&state.current_route()));
    }

    #[test]
    fn navigate_clears_history_but_replace_keeps_it() {
        let state = NavigationState::initial()
            .push(Screen::List(ResourceKind::Devboxes), RouteParams::new());

        let navigated = state.navigate(Screen::List(ResourceKind::Objects), RouteParams::new());
        assert!(navigated.history.is_empty());

        let replaced = state.replace(
            Screen::Logs(ResourceKind::Devboxes),
            RouteParams::id("dbx_1"),
        );
        assert_eq!(replaced.history, state.history);
        assert_eq!(replaced.params.get("id"), Some("dbx_1"));
    }

    #[test]
    fn go_back_on_empty_history_returns_to_menu() {
        let state = NavigationState::initial()
            .navigate(Screen::Detail(ResourceKind::Devboxes), RouteParams::id("a"));
        let back = state.go_back();
        assert_eq!(back, NavigationState::initial());
        assert_eq!(back.params, RouteParams::new());
    }

    #[test]
    fn transitions_leave_input_untouched() {
        let state = NavigationState::initial()
            .push(Screen::List(ResourceKind::Devboxes), RouteParams::new());
        let snapshot = state.clone();
        let _ = state.push(Screen::Menu, RouteParams::new());
        let _ = state.go_back();
        let _ = state.reset();
        assert_eq!(state, snapshot);
    }

    #[test]
    fn screen_names_parse_back() {
        for kind in ResourceKind::ALL {
            for screen in [
                Screen::List(kind),
                Screen::Detail(kind),
                Screen::Actions(kind),
                Screen::Create(kind),
                Screen::Logs(kind),
            ] {
                assert_eq!(Screen::parse(&screen.name()), screen);
            }
        }
        assert_eq!(Screen::parse("menu"), Screen::Menu);
        assert_eq!(
            Screen::parse("devbox-teleport"),
            Screen::Other("devbox-teleport".to_string())
        );
        assert_eq!(
            Screen::parse("devbox-teleport").resource_class(),
            Some(ResourceKind::Devboxes)
        );
        assert_eq!(
            Screen::parse("network-policy-detail"),
            Screen::Detail(ResourceKind::NetworkPolicies)
        );
    }

    #[test]
    fn short_aliases_name_screens() {
        assert_eq!(Screen::parse("dbx"), Screen::List(ResourceKind::Devboxes));
        assert_eq!(Screen::parse("secrets"), Screen::List(ResourceKind::Secrets));
        assert_eq!(Screen::parse("bp-create"), Screen::Create(ResourceKind::Blueprints));
        assert_eq!(Screen::parse("np-detail"), Screen::Detail(ResourceKind::NetworkPolicies));
        assert_eq!(Screen::parse("dbx-teleport"), Screen::Other("dbx-teleport".to_string()));
    }

    #[test]
    fn breadcrumbs_end_with_the_active_route() {
        let state = NavigationState::initial()
            .push(Screen::List(ResourceKind::Devboxes), RouteParams::new())
            .push(Screen::Detail(ResourceKind::Devboxes), RouteParams::id("dbx_1"));
        let trail = state.breadcrumbs();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0], Route::initial());
        assert_eq!(trail.last(), Some(&state.current_route()));
    }

    #[test]
    fn detail_route_reports_missing_id() {
        let route = Route::new(Screen::Detail(ResourceKind::Devboxes), RouteParams::new());
        assert_eq!(route.missing_params(), vec!["id"]);
        let route = Route::new(
            Screen::Detail(ResourceKind::Devboxes),
            RouteParams::id("dbx_1"),
        );
        assert!(route.missing_params().is_empty());
    }
}
