use actix_multipart::Multipart;
use actix_web::{
    delete, get,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    patch, post,
    web::{scope, Data, Path, Query, ServiceConfig},
    HttpResponse,
};
use actix_web_validator::Json;
use futures_util::StreamExt;
use tracing::info;

use super::dto::{
    BulkImportResponse, DeleteQuery, DeleteResponse, JobListResponse, JobResponse, SearchQuery,
};
use super::models::{JobUpdate, NewJob};
use super::service::{JobService, StoreError};

/// Largest accepted import upload, in bytes
#[derive(Clone, Copy)]
pub struct UploadLimit(pub usize);

#[get("")]
async fn list_all_jobs(service: Data<JobService>) -> HttpResponse {
    let jobs = service.snapshot().await;
    HttpResponse::Ok().json(JobListResponse::new(None, None, jobs))
}

#[post("")]
async fn create_job(
    service: Data<JobService>,
    job: Json<NewJob>,
) -> Result<HttpResponse, StoreError> {
    let job = service.add(job.into_inner()).await?;
    Ok(HttpResponse::Created().json(JobResponse {
        message: "Job created successfully".to_string(),
        job,
    }))
}

#[get("/{category}/{sub_category}")]
async fn list_jobs(
    service: Data<JobService>,
    path: Path<(String, String)>,
    query: Query<SearchQuery>,
) -> HttpResponse {
    let (category, sub_category) = path.into_inner();
    let jobs = service.list(&category, &sub_category, &query.search).await;
    HttpResponse::Ok().json(JobListResponse::new(Some(category), Some(sub_category), jobs))
}

#[patch("/{id}")]
async fn update_job(
    service: Data<JobService>,
    path: Path<String>,
    update: Json<JobUpdate>,
) -> Result<HttpResponse, StoreError> {
    let job = service.update(&path.into_inner(), update.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JobResponse {
        message: "Job updated successfully".to_string(),
        job,
    }))
}

#[delete("/{id}")]
async fn delete_job(
    service: Data<JobService>,
    path: Path<String>,
    query: Query<DeleteQuery>,
) -> Result<HttpResponse, StoreError> {
    let removed = service.remove(&path.into_inner(), query.confirm.into()).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: "Job deleted successfully".to_string(),
        id: removed.id,
    }))
}

/// Import a delimited text file sent as multipart field `file`
#[post("/{category}/{sub_category}/import")]
async fn import_jobs(
    service: Data<JobService>,
    limit: Option<Data<UploadLimit>>,
    path: Path<(String, String)>,
    mut payload: Multipart,
) -> Result<HttpResponse, StoreError> {
    let (category, sub_category) = path.into_inner();
    let limit = limit.map(|limit| limit.0).unwrap_or(usize::MAX);
    let raw = read_upload(&mut payload, limit).await?;

    let summary = service.import_from_text(&raw, &category, &sub_category).await?;
    info!(
        "Imported {} jobs into {}/{} ({} lines rejected)",
        summary.imported,
        category,
        sub_category,
        summary.rejected.len()
    );

    Ok(HttpResponse::Created().json(BulkImportResponse {
        message: format!("Successfully imported {} jobs", summary.imported),
        created: summary.imported,
        errors: summary.rejected,
    }))
}

async fn read_upload(payload: &mut Multipart, limit: usize) -> Result<String, StoreError> {
    let mut upload = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| StoreError::InvalidUpload(e.to_string()))?;
        let is_file = field.name() == Some("file");

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| StoreError::InvalidUpload(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(StoreError::InvalidUpload(format!(
                    "file exceeds the {} byte limit",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file && upload.is_none() {
            upload = Some(bytes);
        }
    }

    let bytes =
        upload.ok_or_else(|| StoreError::InvalidUpload("missing multipart field 'file'".into()))?;
    String::from_utf8(bytes).map_err(|_| StoreError::InvalidUpload("file is not valid UTF-8".into()))
}

/// Download the filtered list of one category pair as CSV
#[get("/{category}/{sub_category}/export")]
async fn export_jobs(
    service: Data<JobService>,
    path: Path<(String, String)>,
    query: Query<SearchQuery>,
) -> HttpResponse {
    let (category, sub_category) = path.into_inner();
    let jobs = service.list(&category, &sub_category, &query.search).await;
    let export = service.export_to_text(&category, &sub_category, &jobs);
    info!("Exporting {} jobs as {}", jobs.len(), export.filename);

    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(export.filename)],
        })
        .body(export.content)
}

pub fn job_config(config: &mut ServiceConfig) {
    config.service(
        scope("jobs")
            .service(list_all_jobs)
            .service(create_job)
            .service(list_jobs)
            .service(update_job)
            .service(delete_job)
            .service(import_jobs)
            .service(export_jobs),
    );
}
