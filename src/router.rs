use tracing::{debug, info};

use crate::app::{AppCommand, MountContext};
use crate::navigation::{Route, Screen};
use crate::screens::{
    ActionsScreen, CreateScreen, DetailScreen, ListScreen, LogsScreen, MenuScreen, ScreenState,
};
use crate::store::Stores;

pub struct Mounted {
    pub instance: u64,
    pub screen: ScreenState,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MissingParams {
    pub screen: Screen,
    pub missing: Vec<&'static str>,
}

#[derive(Default)]
pub struct Router {
    mounted: Option<Mounted>,
    previous_screen: Option<Screen>,
    next_instance: u64,
}

impl Router {
    pub fn mounted(&self) -> Option<&Mounted> {
        self.mounted.as_ref()
    }

    pub fn mounted_mut(&mut self) -> Option<&mut Mounted> {
        self.mounted.as_mut()
    }

    pub fn is_current(&self, instance: u64) -> bool {
        self.mounted
            .as_ref()
            .is_some_and(|mounted| mounted.instance == instance)
    }

    pub fn mount(
        &mut self,
        route: Route,
        stores: &mut Stores,
        ctx: &MountContext<'_>,
    ) -> Result<AppCommand, MissingParams> {
        drop(self.mounted.take());

        let missing = route.missing_params();
        if !missing.is_empty() {
            info!("{} is missing {:?}", route.screen, missing);
            return Err(MissingParams {
                screen: route.screen,
                missing,
            });
        }

        if let Some(previous) = self.previous_screen.replace(route.screen.clone())
            && let Some(from) = previous.resource_class()
            && route.screen.resource_class() != Some(from)
        {
            stores.clear_all(from);
        }

        self.next_instance += 1;
        let instance = self.next_instance;
        debug!("mounting {} as #{instance}", route.screen);
        let (screen, command) = mount_screen(&route, instance, stores, ctx);
        self.mounted = Some(Mounted { instance, screen });
        Ok(command)
    }
}

fn mount_screen(
    route: &Route,
    instance: u64,
    stores: &mut Stores,
    ctx: &MountContext<'_>,
) -> (ScreenState, AppCommand) {
    let id = route.params.get("id").unwrap_or_default();
    match &route.screen {
        Screen::Menu => (ScreenState::Menu(MenuScreen::default()), AppCommand::None),
        Screen::List(kind) => {
            let (screen, command) =
                ListScreen::mount(*kind, instance, stores.get_mut(*kind), ctx.page_size);
            (ScreenState::List(screen), command)
        }
        Screen::Detail(kind) => (
            ScreenState::Detail(DetailScreen::mount(*kind, id, stores.get(*kind), ctx)),
            AppCommand::None,
        ),
        Screen::Actions(kind) => {
            let (screen, command) =
                ActionsScreen::mount(*kind, &route.params, stores.get(*kind), instance);
            (ScreenState::Actions(screen), command)
        }
        Screen::Create(kind) if kind.supports_create() => {
            (ScreenState::Create(CreateScreen::mount(*kind)), AppCommand::None)
        }
        Screen::Logs(kind) if kind.supports_logs() => {
            let (screen, command) = LogsScreen::mount(*kind, id, instance);
            (ScreenState::Logs(screen), command)
        }
        other => (ScreenState::Unknown(other.name()), AppCommand::None),
    }
}
