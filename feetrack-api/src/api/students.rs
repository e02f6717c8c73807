//! Student roster endpoints
//!
//! Phone numbers are validated at this boundary with the same normalizer
//! the dispatcher applies on the send path, so a number the form accepts is
//! a number the gateway can be handed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use feetrack_common::db::models::Student;
use feetrack_common::db::queries;
use feetrack_common::{phone, Error};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StudentsResponse {
    pub total: usize,
    pub students: Vec<Student>,
}

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<StudentsResponse>, ApiError> {
    let students = queries::list_students(&state.db).await?;
    Ok(Json(StudentsResponse {
        total: students.len(),
        students,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: String,
    #[serde(default)]
    pub student_phone: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub teacher_phone: Option<String>,
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(Error::InvalidInput("Name is required".to_string()).into());
    }

    for (label, value) in [
        ("student", &request.student_phone),
        ("guardian", &request.guardian_phone),
        ("teacher", &request.teacher_phone),
    ] {
        if let Some(p) = value {
            if !p.trim().is_empty() && !phone::is_valid_phone(p) {
                return Err(
                    Error::InvalidInput(format!("Invalid {} phone number", label)).into(),
                );
            }
        }
    }

    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        student_phone: clean(request.student_phone),
        guardian_phone: clean(request.guardian_phone),
        teacher_phone: clean(request.teacher_phone),
        active: true,
    };
    queries::insert_student(&state.db, &student).await?;

    info!(student_id = %student.id, "Student created");
    Ok((StatusCode::CREATED, Json(student)))
}

/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !queries::delete_student(&state.db, &id).await? {
        return Err(Error::NotFound(format!("Student {} not found", id)).into());
    }

    info!(student_id = %id, "Student deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
