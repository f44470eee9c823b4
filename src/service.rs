// Route service: lifecycle wrapper around a routing table

use parking_lot::RwLock;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::error::{RouterError, RouterResult};
use crate::module::Module;
use crate::routes::{RouteEntry, RouteMatcher, RouteTable};

/// Hosts one [`RouteTable`] between `init` and `shutdown` and forwards every
/// table operation to it.
#[derive(Debug, Default)]
pub struct RouteService {
    table: RwLock<Option<Arc<RouteTable>>>,
}

impl RouteService {
    pub fn new() -> Self {
        RouteService {
            table: RwLock::new(None),
        }
    }

    /// Handle to the live table
    pub fn table(&self) -> RouterResult<Arc<RouteTable>> {
        self.table
            .read()
            .clone()
            .ok_or(RouterError::ServiceNotInitialized)
    }

    pub fn is_running(&self) -> bool {
        self.table.read().is_some()
    }

    pub fn add_route(&self, route: RouteEntry) -> RouterResult<u64> {
        Ok(self.table()?.add_route(route))
    }

    pub fn add_routes(&self, routes: Vec<RouteEntry>) -> RouterResult<Vec<u64>> {
        Ok(self.table()?.add_routes(routes))
    }

    pub fn update_route(&self, route: RouteEntry) -> RouterResult<()> {
        self.table()?.update_route(route);
        Ok(())
    }

    pub fn delete_route(&self, id: u64) -> RouterResult<()> {
        self.table()?.delete_route(id);
        Ok(())
    }

    pub fn get_route(&self, id: u64) -> RouterResult<Option<RouteEntry>> {
        Ok(self.table()?.get_route(id))
    }

    pub fn get_all_routes(&self) -> RouterResult<Vec<RouteEntry>> {
        Ok(self.table()?.get_all_routes())
    }

    pub fn clear_all_routes(&self) -> RouterResult<()> {
        self.table()?.clear_all_routes();
        Ok(())
    }

    pub fn default_lookup(&self, dest: Ipv4Addr) -> RouterResult<RouteEntry> {
        self.table()?.default_lookup(dest)
    }

    pub fn custom_lookup<M: RouteMatcher + ?Sized>(
        &self,
        dest: Ipv4Addr,
        matcher: &M,
    ) -> RouterResult<Option<RouteEntry>> {
        Ok(self.table()?.custom_lookup(dest, matcher))
    }
}

impl Module for RouteService {
    fn name(&self) -> &str {
        "route-service"
    }

    fn init(&self) -> RouterResult<()> {
        *self.table.write() = Some(Arc::new(RouteTable::new()));
        Ok(())
    }

    fn shutdown(&self) {
        if let Some(table) = self.table.write().take() {
            tracing::debug!("Releasing route table with {} route(s)", table.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_require_init() {
        let service = RouteService::new();
        let route = RouteEntry::from_cidr("10.0.0.0/8", "10.255.0.1").unwrap();

        assert!(!service.is_running());
        assert!(matches!(
            service.add_route(route),
            Err(RouterError::ServiceNotInitialized)
        ));
        assert!(matches!(
            service.default_lookup(Ipv4Addr::new(10, 0, 0, 1)),
            Err(RouterError::ServiceNotInitialized)
        ));
    }

    #[test]
    fn test_delegates_to_table() {
        let service = RouteService::new();
        service.init().unwrap();

        let id = service
            .add_route(RouteEntry::from_cidr("0.0.0.0/0", "10.0.0.1").unwrap())
            .unwrap();
        service
            .add_route(RouteEntry::from_cidr("192.168.1.0/24", "10.0.0.2").unwrap())
            .unwrap();

        assert_eq!(service.get_all_routes().unwrap().len(), 2);
        assert!(service.get_route(id).unwrap().is_some());

        let hit = service.default_lookup(Ipv4Addr::new(192, 168, 1, 5)).unwrap();
        assert_eq!(hit.next_hop, Ipv4Addr::new(10, 0, 0, 2));

        let first = |routes: &[RouteEntry], _dest: Ipv4Addr| routes.first().cloned();
        let hit = service
            .custom_lookup(Ipv4Addr::new(8, 8, 8, 8), &first)
            .unwrap()
            .unwrap();
        assert_eq!(hit.prefix_len(), 24);

        service.delete_route(id).unwrap();
        assert!(service.default_lookup(Ipv4Addr::new(8, 8, 8, 8)).is_err());

        service.clear_all_routes().unwrap();
        assert!(service.get_all_routes().unwrap().is_empty());
    }

    #[test]
    fn test_shutdown_releases_table() {
        let service = RouteService::new();
        service.init().unwrap();
        let table = service.table().unwrap();
        service.shutdown();

        assert!(!service.is_running());
        assert!(service.table().is_err());
        // Handles taken before shutdown stay usable on their own
        assert!(table.is_empty());
    }

    #[test]
    fn test_init_installs_fresh_table() {
        let service = RouteService::new();
        service.init().unwrap();
        service
            .add_route(RouteEntry::from_cidr("10.0.0.0/8", "10.255.0.1").unwrap())
            .unwrap();

        service.init().unwrap();
        assert!(service.get_all_routes().unwrap().is_empty());
    }
}
