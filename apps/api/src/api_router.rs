use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{delete, get, patch, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/{role_id}",
            get(handlers::roles::get_role_handler)
                .patch(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/role-assignments",
            get(handlers::roles::list_role_assignments_handler),
        )
        .route(
            "/api/users/{user_id}/roles",
            post(handlers::roles::assign_role_handler),
        )
        .route(
            "/api/users/{user_id}/roles/{role_id}",
            delete(handlers::roles::revoke_role_handler),
        )
        .route(
            "/api/users/{user_id}/permissions",
            get(handlers::roles::user_permissions_handler),
        )
        .route(
            "/api/authorization/check",
            get(handlers::authorization::check_permission_handler),
        )
        .route(
            "/api/tags",
            get(handlers::tags::list_tags_handler).post(handlers::tags::create_tag_handler),
        )
        .route(
            "/api/tags/recompute",
            post(handlers::tags::recompute_tags_handler),
        )
        .route(
            "/api/tag-rules",
            get(handlers::tags::list_tag_rules_handler)
                .post(handlers::tags::create_tag_rule_handler),
        )
        .route(
            "/api/tag-rules/{rule_id}",
            patch(handlers::tags::update_tag_rule_handler),
        )
        .route(
            "/api/members/{member_id}/tags",
            post(handlers::members::apply_member_tag_handler),
        )
        .route(
            "/api/members/{member_id}/tags/recompute",
            post(handlers::members::recompute_member_tags_handler),
        )
        .route(
            "/api/members/{member_id}/tags/{tag_id}",
            delete(handlers::members::remove_member_tag_handler),
        )
        .route_layer(from_fn(middleware::require_actor));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
