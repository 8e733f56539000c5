use actix_web::{error::InternalError, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

fn bad_request(error: &str, fields: serde_json::Map<String, serde_json::Value>) -> actix_web::Error {
    let error_response = ErrorResponse {
        error: error.to_string(),
        fields: serde_json::Value::Object(fields),
    };
    InternalError::from_response("", HttpResponse::BadRequest().json(error_response)).into()
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| {
        let mut fields = serde_json::Map::new();

        match err {
            actix_web_validator::Error::Validate(validation_errors) => {
                for (field, errors) in validation_errors.field_errors() {
                    let messages: Vec<String> = errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("Validation error in field: {}", field))
                        })
                        .collect();
                    fields.insert(field.to_string(), serde_json::json!({"errors": messages}));
                }
                bad_request("Validation failed", fields)
            }
            actix_web_validator::Error::Deserialize(de_err) => {
                let err_string = de_err.to_string();

                let message = if err_string.contains("EOF while parsing") {
                    "Request body is empty. Expected JSON payload"
                } else if err_string.contains("unknown variant") && err_string.contains("`In Progress`") {
                    "Invalid status. Use one of: Pending, In Progress, Completed"
                } else if err_string.contains("unknown variant") {
                    "Invalid enum value. Check allowed values for this field"
                } else if err_string.contains("missing field") {
                    "A required field is missing"
                } else {
                    "Invalid JSON format"
                };
                fields.insert("message".to_string(), serde_json::json!(message));
                fields.insert("detail".to_string(), serde_json::json!(err_string));

                bad_request("Request validation failed", fields)
            }
            _ => {
                fields.insert("message".to_string(), serde_json::json!("Validation error"));
                bad_request("Validation failed", fields)
            }
        }
    })
}
