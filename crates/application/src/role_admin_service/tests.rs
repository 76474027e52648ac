use std::collections::BTreeSet;
use std::sync::Arc;

use flock_core::AppError;
use flock_domain::{RoleId, RoleName, UserId};

use crate::test_support::{FakeTableService, actor, permission, role_row, user_row};
use crate::{AuthorizationGate, CreateRoleInput, PermissionResolver, RoleStore, Table};

use super::RoleAdminService;

fn service(tables: Arc<FakeTableService>) -> RoleAdminService {
    let store = RoleStore::new(tables.clone());
    let resolver = PermissionResolver::new(tables, store.clone());
    RoleAdminService::new(AuthorizationGate::new(resolver.clone()), resolver, store)
}

fn user_id(value: &str) -> UserId {
    match UserId::new(value) {
        Ok(id) => id,
        Err(error) => panic!("{error}"),
    }
}

async fn tables() -> Arc<FakeTableService> {
    let tables = FakeTableService::shared();
    tables
        .seed(
            Table::Roles,
            role_row(
                "r-security",
                "security",
                "roles:read,roles:create,roles:manage,users:read",
                false,
            ),
        )
        .await;
    tables
        .seed(
            Table::Roles,
            role_row("r-volunteer", "volunteer", "members:read", true),
        )
        .await;
    tables.seed(Table::Users, user_row("u-admin", "security")).await;
    tables.seed(Table::Users, user_row("u-kim", "volunteer")).await;
    tables
}

#[tokio::test]
async fn create_role_requires_roles_create() {
    let service = service(tables().await);
    let input = CreateRoleInput {
        name: RoleName::new("ushers").unwrap_or_else(|error| panic!("{error}")),
        permissions: BTreeSet::from([permission("events:checkin")]),
    };

    let denied = service.create_role(&actor("u-kim"), input.clone()).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let created = service.create_role(&actor("u-admin"), input).await;
    assert!(created.is_ok_and(|role| role.name.as_str() == "ushers"));
}

#[tokio::test]
async fn delete_requires_roles_delete() {
    let service = service(tables().await);
    let role_id = RoleId::new("r-volunteer").unwrap_or_else(|error| panic!("{error}"));

    let result = service.delete_role(&actor("u-admin"), &role_id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn assignment_records_the_acting_user() {
    let tables = tables().await;
    let service = service(tables.clone());
    let role_id = RoleId::new("r-volunteer").unwrap_or_else(|error| panic!("{error}"));

    let assignment = service
        .assign_role(&actor("u-admin"), &user_id("u-kim"), &role_id)
        .await;
    assert!(assignment.is_ok_and(|assignment| assignment.assigned_by == user_id("u-admin")));

    let listed = service.list_assignments(&actor("u-admin")).await;
    assert!(listed.is_ok_and(|listed| listed.len() == 1));
}

#[tokio::test]
async fn users_may_inspect_only_themselves_without_users_read() {
    let service = service(tables().await);

    let own = service
        .effective_permissions(&actor("u-kim"), &user_id("u-kim"))
        .await;
    assert!(own.is_ok_and(|own| own.contains(permission("members:read"))));

    let other = service
        .effective_permissions(&actor("u-kim"), &user_id("u-admin"))
        .await;
    assert!(matches!(other, Err(AppError::Forbidden(_))));

    let by_admin = service
        .effective_permissions(&actor("u-admin"), &user_id("u-kim"))
        .await;
    assert!(by_admin.is_ok());
}
