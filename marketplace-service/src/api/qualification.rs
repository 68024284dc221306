use std::collections::{HashMap, HashSet};

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{grade, TestOutcome, MAX_ATTEMPTS, MIN_QUESTIONS, TIME_LIMIT_MINUTES};

use crate::auth::ProviderUser;
use crate::error::ApiError;
use crate::models::{NewTestAttempt, Provider, TestAttempt, TestQuestion};
use crate::schema::{providers, test_attempts, test_questions};
use crate::state::{AppState, DbConn};

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub prompt: String,
    pub options: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub category: String,
    pub time_limit_minutes: i64,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub selected_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AnswerSubmission>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub outcome: TestOutcome,
}

async fn provider_for_user(conn: &mut DbConn<'_>, user_id: Uuid) -> Result<Provider, ApiError> {
    providers::table
        .filter(providers::user_id.eq(user_id))
        .first::<Provider>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("provider profile not found".to_string()))
}

pub async fn start_attempt(
    State(state): State<AppState>,
    ProviderUser(auth): ProviderUser,
    Path(category): Path<String>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    let mut conn = state.conn().await?;
    let provider = provider_for_user(&mut conn, auth.id).await?;

    let attempts_so_far = test_attempts::table
        .filter(test_attempts::provider_id.eq(provider.id))
        .filter(test_attempts::category.eq(&category))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;
    if attempts_so_far >= MAX_ATTEMPTS {
        return Err(ApiError::BadRequest(format!(
            "maximum of {} attempts reached for category {:?}",
            MAX_ATTEMPTS, category
        )));
    }

    let mut questions = test_questions::table
        .filter(test_questions::category.eq(&category))
        .filter(test_questions::active.eq(true))
        .load::<TestQuestion>(&mut conn)
        .await?;
    if questions.len() < MIN_QUESTIONS {
        return Err(ApiError::BadRequest(format!(
            "no qualification test available for category {:?}",
            category
        )));
    }

    {
        let mut rng = rand::thread_rng();
        questions.shuffle(&mut rng);
    }
    questions.truncate(MIN_QUESTIONS);

    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let new_attempt = NewTestAttempt {
        id: Uuid::new_v4(),
        provider_id: provider.id,
        category: category.clone(),
        question_ids: serde_json::to_value(&question_ids)?,
        total: questions.len() as i32,
        started_at: Utc::now(),
    };
    diesel::insert_into(test_attempts::table)
        .values(&new_attempt)
        .execute(&mut conn)
        .await?;

    Ok(Json(StartAttemptResponse {
        attempt_id: new_attempt.id,
        category,
        time_limit_minutes: TIME_LIMIT_MINUTES,
        questions: questions
            .into_iter()
            .map(|q| QuestionView {
                id: q.id,
                prompt: q.prompt,
                options: q.options,
            })
            .collect(),
    }))
}

pub async fn submit_attempt(
    State(state): State<AppState>,
    ProviderUser(auth): ProviderUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    let mut conn = state.conn().await?;
    let provider = provider_for_user(&mut conn, auth.id).await?;

    let attempt = test_attempts::table
        .filter(test_attempts::id.eq(id))
        .first::<TestAttempt>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("attempt not found".to_string()))?;
    if attempt.provider_id != provider.id {
        return Err(ApiError::Forbidden(
            "attempt belongs to another provider".to_string(),
        ));
    }
    if attempt.submitted_at.is_some() {
        return Err(ApiError::BadRequest(
            "attempt has already been submitted".to_string(),
        ));
    }

    let now = Utc::now();
    if now > attempt.started_at + Duration::minutes(TIME_LIMIT_MINUTES) {
        // A late submission burns the attempt.
        diesel::update(test_attempts::table.filter(test_attempts::id.eq(id)))
            .set((
                test_attempts::correct.eq(Some(0)),
                test_attempts::passed.eq(Some(false)),
                test_attempts::submitted_at.eq(Some(now)),
            ))
            .execute(&mut conn)
            .await?;
        return Err(ApiError::BadRequest(
            "time limit exceeded, attempt marked as failed".to_string(),
        ));
    }

    let question_ids: Vec<Uuid> = serde_json::from_value(attempt.question_ids.clone())?;
    let questions = test_questions::table
        .filter(test_questions::id.eq_any(question_ids.clone()))
        .load::<TestQuestion>(&mut conn)
        .await?;
    let answer_key: HashMap<Uuid, i32> =
        questions.iter().map(|q| (q.id, q.correct_index)).collect();

    let mut counted: HashSet<Uuid> = HashSet::new();
    let mut correct = 0usize;
    for answer in &request.answers {
        if !question_ids.contains(&answer.question_id) {
            continue;
        }
        if !counted.insert(answer.question_id) {
            continue;
        }
        if answer_key.get(&answer.question_id) == Some(&answer.selected_index) {
            correct += 1;
        }
    }

    let outcome = grade(correct, attempt.total as usize);
    diesel::update(test_attempts::table.filter(test_attempts::id.eq(id)))
        .set((
            test_attempts::correct.eq(Some(outcome.correct as i32)),
            test_attempts::passed.eq(Some(outcome.passed)),
            test_attempts::submitted_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await?;

    Ok(Json(SubmitAttemptResponse {
        attempt_id: id,
        outcome,
    }))
}

pub async fn list_attempts(
    State(state): State<AppState>,
    ProviderUser(auth): ProviderUser,
) -> Result<Json<Vec<TestAttempt>>, ApiError> {
    let mut conn = state.conn().await?;
    let provider = provider_for_user(&mut conn, auth.id).await?;

    let attempts = test_attempts::table
        .filter(test_attempts::provider_id.eq(provider.id))
        .order(test_attempts::started_at.desc())
        .load::<TestAttempt>(&mut conn)
        .await?;
    Ok(Json(attempts))
}
