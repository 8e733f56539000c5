use actix_web::{
    get, post, put,
    web::{Data, ServiceConfig},
    HttpResponse,
};
use actix_web_validator::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateUrl, ValidationError};

use crate::api::job::{JobService, StoreError};
use crate::sync::{remote_script, PullReport, SyncDirection};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    script_url: Option<String>,
    syncing: bool,
    last_saved_at: Option<NaiveDateTime>,
}

/// Remote endpoint settings; a null or blank URL disconnects
#[derive(Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[validate(custom(function = "validate_script_url"))]
    pub script_url: Option<String>,
}

/// Blank is allowed and clears the endpoint; anything else must parse as a URL
fn validate_script_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_url() {
        return Ok(());
    }
    let mut error = ValidationError::new("url");
    error.message = Some("scriptUrl must be a valid URL".into());
    Err(error)
}

#[derive(Serialize)]
struct SettingsSaved {
    message: String,
    #[serde(rename = "scriptUrl")]
    script_url: Option<String>,
    pull: PullReport,
}

#[derive(Deserialize, Debug, Validate)]
pub struct SyncRequest {
    pub direction: SyncDirection,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
struct SyncResponse {
    direction: SyncDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pull: Option<PullReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pushed: Option<usize>,
}

#[get("/settings")]
async fn get_settings(service: Data<JobService>) -> Result<HttpResponse, StoreError> {
    let last_saved_at = service.storage().last_saved_at().await?;
    Ok(HttpResponse::Ok().json(SettingsResponse {
        script_url: service.script_url(),
        syncing: service.is_syncing(),
        last_saved_at,
    }))
}

/// Apps Script source to deploy as the remote endpoint
#[get("/settings/script")]
async fn get_script() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(remote_script())
}

/// Save the remote endpoint and load its dataset
#[put("/settings")]
async fn put_settings(
    service: Data<JobService>,
    update: Json<SettingsUpdate>,
) -> Result<HttpResponse, StoreError> {
    let update = update.into_inner();
    let pull = service.set_script_url(update.script_url).await?;

    let message = match &pull {
        PullReport::Replaced { count } => format!("Settings saved, loaded {} jobs from remote", count),
        _ => "Settings saved".to_string(),
    };
    Ok(HttpResponse::Ok().json(SettingsSaved {
        message,
        script_url: service.script_url(),
        pull,
    }))
}

/// Manual sync in an explicit direction
#[post("/sync")]
async fn sync_now(
    service: Data<JobService>,
    request: Json<SyncRequest>,
) -> Result<HttpResponse, StoreError> {
    let direction = request.into_inner().direction;
    let response = match direction {
        SyncDirection::OverwriteLocal => SyncResponse {
            direction,
            pull: Some(service.pull_remote().await?),
            pushed: None,
        },
        SyncDirection::OverwriteRemote => SyncResponse {
            direction,
            pull: None,
            pushed: Some(service.push_remote().await?),
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

pub fn settings_config(config: &mut ServiceConfig) {
    config
        .service(get_settings)
        .service(get_script)
        .service(put_settings)
        .service(sync_now);
}
