use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use flock_application::{CreateTagInput, CreateTagRuleInput, TagRulePatch};
use flock_core::{AppResult, NonEmptyString, UserIdentity};
use flock_domain::{ConditionOperator, RuleStatus, TagCondition, TagId, TagRuleId};

use crate::dto::{
    CreateTagRequest, CreateTagRuleRequest, RecomputeSummaryResponse, RuleConditionRequest,
    TagResponse, TagRuleResponse, TagRuleWriteResponse, UpdateTagRuleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_tags_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<TagResponse>>> {
    let tags = state
        .tag_admin_service
        .list_tags(&user)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();

    Ok(Json(tags))
}

pub async fn create_tag_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<TagResponse>)> {
    let tag = state
        .tag_admin_service
        .create_tag(
            &user,
            CreateTagInput {
                name: NonEmptyString::new(payload.name.trim())?,
                category: payload.category,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

pub async fn list_tag_rules_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<TagRuleResponse>>> {
    let rules = state
        .tag_admin_service
        .list_rules(&user)
        .await?
        .into_iter()
        .map(TagRuleResponse::from)
        .collect();

    Ok(Json(rules))
}

pub async fn create_tag_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateTagRuleRequest>,
) -> ApiResult<(StatusCode, Json<TagRuleWriteResponse>)> {
    let input = CreateTagRuleInput {
        tag_id: TagId::new(payload.tag_id)?,
        condition: parse_condition(&payload.condition)?,
        priority: payload.priority,
        status: payload
            .status
            .as_deref()
            .map(parse_status)
            .transpose()?
            .unwrap_or(RuleStatus::Enabled),
    };

    let (rule, summary) = state.tag_admin_service.create_rule(&user, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(TagRuleWriteResponse {
            rule: TagRuleResponse::from(rule),
            recompute: summary.map(RecomputeSummaryResponse::from),
        }),
    ))
}

pub async fn update_tag_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(rule_id): Path<String>,
    Json(payload): Json<UpdateTagRuleRequest>,
) -> ApiResult<Json<TagRuleWriteResponse>> {
    let patch = TagRulePatch {
        condition: payload.condition.as_ref().map(parse_condition).transpose()?,
        priority: payload.priority,
        status: payload.status.as_deref().map(parse_status).transpose()?,
    };

    let (rule, summary) = state
        .tag_admin_service
        .update_rule(&user, &TagRuleId::new(rule_id)?, patch)
        .await?;

    Ok(Json(TagRuleWriteResponse {
        rule: TagRuleResponse::from(rule),
        recompute: summary.map(RecomputeSummaryResponse::from),
    }))
}

pub async fn recompute_tags_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<RecomputeSummaryResponse>> {
    let summary = state.tag_admin_service.recompute_all(&user).await?;

    Ok(Json(RecomputeSummaryResponse::from(summary)))
}

fn parse_condition(condition: &RuleConditionRequest) -> AppResult<TagCondition> {
    let operator = ConditionOperator::from_str(condition.operator.trim().to_lowercase().as_str())?;
    TagCondition::parse(condition.field.as_str(), operator, condition.value.as_str())
}

fn parse_status(value: &str) -> AppResult<RuleStatus> {
    RuleStatus::from_str(value.trim().to_lowercase().as_str())
}
