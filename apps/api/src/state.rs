use std::sync::Arc;

use flock_application::{
    AuthorizationGate, PermissionResolver, RoleAdminService, RoleStore, TableService,
    TagAdminService, TaggingService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_admin_service: RoleAdminService,
    pub tag_admin_service: TagAdminService,
    pub authorization_gate: AuthorizationGate,
    pub tables: Arc<dyn TableService>,
}

impl AppState {
    pub fn new(tables: Arc<dyn TableService>, retag_concurrency: usize) -> Self {
        let role_store = RoleStore::new(tables.clone());
        let resolver = PermissionResolver::new(tables.clone(), role_store.clone());
        let authorization_gate = AuthorizationGate::new(resolver.clone());
        let tagging = TaggingService::new(tables.clone(), retag_concurrency);

        Self {
            role_admin_service: RoleAdminService::new(
                authorization_gate.clone(),
                resolver,
                role_store,
            ),
            tag_admin_service: TagAdminService::new(
                authorization_gate.clone(),
                tables.clone(),
                tagging,
            ),
            authorization_gate,
            tables,
        }
    }
}
