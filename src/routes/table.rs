// Thread-safe routing table

use chrono::Utc;
use parking_lot::RwLock;

use super::{aggregate, RouteEntry};

#[derive(Debug)]
struct TableState {
    routes: Vec<RouteEntry>,
    next_id: u64,
}

impl TableState {
    /// Aggregate, then keep the longest prefixes first
    fn reorganize(&mut self) {
        let absorbed = aggregate::aggregate(&mut self.routes);
        if absorbed > 0 {
            tracing::debug!("Aggregation absorbed {} route(s)", absorbed);
        }
        self.routes.sort_by(|a, b| b.prefix_len().cmp(&a.prefix_len()));
    }

    fn insert(&mut self, mut route: RouteEntry) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        route.id = id;
        route.normalize();
        route.last_update_time = Utc::now();

        tracing::debug!("Adding route {} (id {})", route, id);
        self.routes.push(route);
        self.reorganize();

        id
    }
}

/// Routing table shared between control-plane writers and lookup readers.
///
/// Entries and the id counter sit behind one reader/writer lock. Writers hold
/// it for the whole mutation including aggregation and sorting; readers only
/// hold it long enough to copy the entries out.
#[derive(Debug)]
pub struct RouteTable {
    state: RwLock<TableState>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable {
            state: RwLock::new(TableState {
                routes: Vec::with_capacity(8),
                next_id: 1,
            }),
        }
    }

    /// Insert a route and return the id it was given.
    ///
    /// The entry may be absorbed into an existing supernet straight away, in
    /// which case the returned id no longer names a stored entry.
    pub fn add_route(&self, route: RouteEntry) -> u64 {
        self.state.write().insert(route)
    }

    /// Insert several routes under a single lock acquisition
    pub fn add_routes<I>(&self, routes: I) -> Vec<u64>
    where
        I: IntoIterator<Item = RouteEntry>,
    {
        let mut state = self.state.write();
        routes.into_iter().map(|route| state.insert(route)).collect()
    }

    /// Replace the stored entry with the same id. Unknown ids are ignored.
    pub fn update_route(&self, mut route: RouteEntry) {
        let mut state = self.state.write();

        let Some(slot) = state.routes.iter_mut().find(|r| r.id == route.id) else {
            tracing::debug!("Update for unknown route id {} ignored", route.id);
            return;
        };

        route.normalize();
        route.last_update_time = Utc::now();
        tracing::debug!("Updating route {} (id {})", route, route.id);
        *slot = route;

        state.reorganize();
    }

    /// Remove the entry with this id. Unknown ids are ignored.
    pub fn delete_route(&self, id: u64) {
        let mut state = self.state.write();

        match state.routes.iter().position(|r| r.id == id) {
            Some(index) => {
                let route = state.routes.remove(index);
                tracing::debug!("Deleted route {} (id {})", route, id);
            }
            None => tracing::debug!("Delete for unknown route id {} ignored", id),
        }
    }

    /// Copy of a single entry
    pub fn get_route(&self, id: u64) -> Option<RouteEntry> {
        self.state.read().routes.iter().find(|r| r.id == id).cloned()
    }

    /// Copy of every entry, longest prefix first
    pub fn get_all_routes(&self) -> Vec<RouteEntry> {
        self.state.read().routes.clone()
    }

    /// Drop every entry. Ids keep counting from where they were.
    pub fn clear_all_routes(&self) {
        let mut state = self.state.write();
        let count = state.routes.len();
        state.routes = Vec::with_capacity(8);
        tracing::debug!("Cleared {} route(s)", count);
    }

    pub fn len(&self) -> usize {
        self.state.read().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::new()
    }
}
