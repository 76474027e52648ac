use axum::Json;
use axum::extract::{Extension, Path, State};
use flock_core::UserIdentity;
use flock_domain::{MemberId, TagId};

use crate::dto::{ApplyMemberTagRequest, MemberTagOutcomeResponse, MemberTagsResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn recompute_member_tags_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(member_id): Path<String>,
) -> ApiResult<Json<MemberTagOutcomeResponse>> {
    let outcome = state
        .tag_admin_service
        .recompute_member(&user, &MemberId::new(member_id)?)
        .await?;

    Ok(Json(MemberTagOutcomeResponse::from(outcome)))
}

pub async fn apply_member_tag_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(member_id): Path<String>,
    Json(payload): Json<ApplyMemberTagRequest>,
) -> ApiResult<Json<MemberTagsResponse>> {
    let member = state
        .tag_admin_service
        .apply_manual_tag(
            &user,
            &MemberId::new(member_id)?,
            &TagId::new(payload.tag_id)?,
        )
        .await?;

    Ok(Json(MemberTagsResponse::from(member)))
}

pub async fn remove_member_tag_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((member_id, tag_id)): Path<(String, String)>,
) -> ApiResult<Json<MemberTagsResponse>> {
    let member = state
        .tag_admin_service
        .remove_manual_tag(&user, &MemberId::new(member_id)?, &TagId::new(tag_id)?)
        .await?;

    Ok(Json(MemberTagsResponse::from(member)))
}
