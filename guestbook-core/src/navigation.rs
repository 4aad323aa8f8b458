//! Kiosk routes and post-navigation hooks.

use log::debug;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Landing,
    Intake,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Intake => "/input",
        }
    }

    /// Page tag used by the navigation view.
    pub fn tag(self) -> &'static str {
        match self {
            Route::Landing => "landing",
            Route::Intake => "intake",
        }
    }

    /// Route shown by a page tag or path. Anything unknown resolves to
    /// the landing page.
    pub fn from_tag(tag: &str) -> Route {
        match tag.trim_end_matches('/') {
            "intake" | "/input" => Route::Intake,
            _ => Route::Landing,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub type NavigationHook = Box<dyn FnMut(Route, Route)>;

/// Tracks the current route and runs hooks after every route change.
#[derive(Default)]
pub struct Navigator {
    current: Route,
    hooks: Vec<NavigationHook>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Hook receives `(from, to)`.
    pub fn on_navigate(&mut self, hook: NavigationHook) {
        self.hooks.push(hook);
    }

    /// Returns false when already on `to`; hooks only run on a change.
    pub fn navigate(&mut self, to: Route) -> bool {
        let from = self.current;
        if from == to {
            return false;
        }

        debug!("Navigating {} -> {}", from, to);
        self.current = to;
        for hook in self.hooks.iter_mut() {
            hook(from, to);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn unknown_tags_fall_back_to_landing() {
        for route in [Route::Landing, Route::Intake] {
            assert_eq!(Route::from_tag(route.tag()), route);
            assert_eq!(Route::from_tag(route.path()), route);
        }
        assert_eq!(Route::from_tag("/input/"), Route::Intake);
        assert_eq!(Route::from_tag("admin"), Route::Landing);
        assert_eq!(Route::from_tag(""), Route::Landing);
    }

    #[test]
    fn hooks_run_once_per_route_change() {
        let calls: Rc<RefCell<Vec<(Route, Route)>>> = Rc::default();
        let mut nav = Navigator::new();
        let log = calls.clone();
        nav.on_navigate(Box::new(move |from, to| log.borrow_mut().push((from, to))));

        assert!(nav.navigate(Route::Intake));
        assert!(!nav.navigate(Route::Intake));
        assert!(nav.navigate(Route::Landing));

        assert_eq!(nav.current(), Route::Landing);
        assert_eq!(
            *calls.borrow(),
            vec![(Route::Landing, Route::Intake), (Route::Intake, Route::Landing)]
        );
    }
}
