use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::analysis::pipeline::{analyze_texts, AnalysisReport};
use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::document_key;
use crate::tasks::{self, AnalysisTask};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub resume_text: String,
    pub vacancy_text: String,
}

/// POST /api/v1/analyze
///
/// Synchronous analysis of free-text résumé and vacancy. A model output
/// that fails JSON decoding is returned as the explicit parse-error object
/// inside the payload, not as an HTTP failure.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    if req.resume_text.trim().is_empty() || req.vacancy_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text and vacancy_text must be non-empty".to_string(),
        ));
    }

    let report = analyze_texts(state.llm.as_ref(), &req.resume_text, &req.vacancy_text).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub task_id: i64,
    pub resume_ref: String,
    pub vacancy_ref: String,
}

/// POST /api/v1/analyze/upload
///
/// Asynchronous analysis of uploaded PDF documents: stores both blobs,
/// creates a pending task and returns immediately. Callers poll
/// `GET /api/v1/tasks/:id` for the outcome.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut resume: Option<(String, Vec<u8>)> = None;
    let mut vacancy: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .file_name()
            .unwrap_or("document.pdf")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read '{name}' field: {e}")))?;

        match name.as_str() {
            "resume" => resume = Some((filename, data.to_vec())),
            "vacancy" => vacancy = Some((filename, data.to_vec())),
            _ => {} // unknown fields are ignored
        }
    }

    let (resume_name, resume_bytes) =
        resume.ok_or_else(|| AppError::Validation("Missing 'resume' file field".to_string()))?;
    let (vacancy_name, vacancy_bytes) =
        vacancy.ok_or_else(|| AppError::Validation("Missing 'vacancy' file field".to_string()))?;

    let resume_ref = state
        .store
        .put(
            &document_key("resumes", &resume_name),
            resume_bytes,
            "application/pdf",
        )
        .await?;
    let vacancy_ref = state
        .store
        .put(
            &document_key("vacancies", &vacancy_name),
            vacancy_bytes,
            "application/pdf",
        )
        .await?;

    let task = tasks::create(&state.db, &resume_ref, &vacancy_ref).await?;

    Ok(Json(UploadResponse {
        task_id: task.id,
        resume_ref: task.resume_ref,
        vacancy_ref: task.vacancy_ref,
    }))
}

/// GET /api/v1/tasks/:id
///
/// Polling endpoint for asynchronous callers: exposes the task status and,
/// in a terminal state, the result or diagnostic payload.
pub async fn handle_get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AnalysisTask>, AppError> {
    let task = tasks::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {id} not found")))?;
    Ok(Json(task))
}
