use tracing::debug;

use crate::navigation::phase::{Route, RouteParams};
use crate::navigation::resolver::NavigationSurface;

/// One mounted screen. A fresh `instance_id` means fresh screen-local state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenInstance {
    pub route: Route,
    pub params: RouteParams,
    pub instance_id: u64,
}

/// In-memory stack navigator.
///
/// A soft navigate to a route already on the stack pops back to that entry
/// and keeps its instance; otherwise it pushes. A reset replaces the whole
/// stack with a single new instance.
#[derive(Debug)]
pub struct ScreenStack {
    entries: Vec<ScreenInstance>,
    next_id: u64,
    ready: bool,
}

impl ScreenStack {
    pub fn new(initial: Route) -> Self {
        Self {
            entries: vec![ScreenInstance {
                route: initial,
                params: RouteParams::default(),
                instance_id: 0,
            }],
            next_id: 1,
            ready: true,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn current(&self) -> Option<&ScreenInstance> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.entries.iter().map(|e| e.route).collect()
    }

    fn mount(&mut self, route: Route, params: RouteParams) -> ScreenInstance {
        let instance = ScreenInstance {
            route,
            params,
            instance_id: self.next_id,
        };
        self.next_id += 1;
        instance
    }
}

impl Default for ScreenStack {
    fn default() -> Self {
        Self::new(Route::Default)
    }
}

impl NavigationSurface for ScreenStack {
    fn navigate_soft(&mut self, route: Route, params: RouteParams) {
        if let Some(pos) = self.entries.iter().rposition(|e| e.route == route) {
            self.entries.truncate(pos + 1);
            if let Some(entry) = self.entries.last_mut() {
                entry.params = params;
            }
            debug!(route = route.as_str(), depth = self.entries.len(), "popped back to screen");
        } else {
            let instance = self.mount(route, params);
            self.entries.push(instance);
            debug!(route = route.as_str(), depth = self.entries.len(), "pushed screen");
        }
    }

    fn reset_to(&mut self, route: Route, index: usize, params: RouteParams) {
        let instance = self.mount(route, params);
        self.entries = vec![instance];
        // Single-entry stack: any requested index clamps to 0.
        debug!(
            route = route.as_str(),
            requested_index = index,
            instance = instance.instance_id,
            "reset stack"
        );
    }

    fn current_route(&self) -> Option<Route> {
        self.entries.last().map(|e| e.route)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_navigate_pushes_then_pops_back() {
        let mut stack = ScreenStack::default();
        stack.navigate_soft(Route::Prepare, RouteParams::default());
        assert_eq!(stack.routes(), vec![Route::Default, Route::Prepare]);
        let default_id = stack.entries[0].instance_id;

        stack.navigate_soft(Route::Default, RouteParams::default());
        assert_eq!(stack.routes(), vec![Route::Default]);
        assert_eq!(stack.current().unwrap().instance_id, default_id);
    }

    #[test]
    fn test_reset_mounts_fresh_instance() {
        let mut stack = ScreenStack::default();
        stack.reset_to(Route::Question, 2, RouteParams::default());
        let first = stack.current().unwrap().instance_id;
        stack.reset_to(Route::Question, 2, RouteParams::default());
        let second = stack.current().unwrap().instance_id;
        assert_ne!(first, second);
        assert_eq!(stack.depth(), 1);
    }
}
