// src/api.rs
// 라우팅 + 입력 검증. 검증 에러만 400으로 돌려주고 나머지는 빈 시간표로 흡수됨.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiError, ValidationError};
use crate::lesson::{DaySchedule, WeekSchedule};
use crate::schedule::{DATE_FMT, ScheduleService};

// 정식 형식: БАСО-03-24
static GROUP_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[А-Я]{4}-\d{2}-\d{2}$").expect("strict group pattern"));
static GROUP_LOOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[А-ЯЁа-яёA-Za-z0-9-]+$").expect("loose group pattern"));

const MAX_DATE_DISTANCE_DAYS: i64 = 365 * 2;

#[derive(Clone)]
pub struct AppState {
    pub schedules: Arc<ScheduleService>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub group: String,
    pub date: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/schedule", get(get_schedule))
        .route("/schedule/week", get(get_week))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Query(q): Query<ScheduleQuery>,
) -> Result<Json<DaySchedule>, ApiError> {
    validate_group(&q.group)?;
    let date = resolve_date(q.date.as_deref(), Local::now().naive_local())?;

    let schedule = state.schedules.day(&q.group, date).await;
    Ok(Json(DaySchedule {
        group: q.group,
        date: date.format(DATE_FMT).to_string(),
        schedule,
    }))
}

pub async fn get_week(
    State(state): State<AppState>,
    Query(q): Query<ScheduleQuery>,
) -> Result<Json<WeekSchedule>, ApiError> {
    validate_group(&q.group)?;
    let date = resolve_date(q.date.as_deref(), Local::now().naive_local())?;

    Ok(Json(state.schedules.week(&q.group, date).await))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 정식 형식이거나, 3~15자의 문자/숫자/하이픈
pub fn validate_group(group: &str) -> Result<(), ValidationError> {
    if GROUP_STRICT.is_match(group) {
        return Ok(());
    }
    let len = group.chars().count();
    if (3..=15).contains(&len) && GROUP_LOOSE.is_match(group) {
        Ok(())
    } else {
        Err(ValidationError::BadGroup)
    }
}

/// 날짜 파라미터 → 날짜. 없거나 빈 문자열이면 오늘. 공백은 잘못된 형식.
pub fn resolve_date(raw: Option<&str>, now: NaiveDateTime) -> Result<NaiveDate, ValidationError> {
    match raw {
        None | Some("") => Ok(now.date()),
        Some(s) => validate_date(s, now),
    }
}

/// `YYYY-MM-DD`, 현재로부터 ±2년 이내
pub fn validate_date(raw: &str, now: NaiveDateTime) -> Result<NaiveDate, ValidationError> {
    let date = NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|_| ValidationError::BadDate)?;
    let at = date.and_time(NaiveTime::MIN);
    let span = chrono::Duration::days(MAX_DATE_DISTANCE_DAYS);
    if at < now - span || at > now + span {
        return Err(ValidationError::DateOutOfRange);
    }
    Ok(date)
}
