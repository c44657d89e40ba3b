use crate::error::AppError;
use crate::models::EmbeddingModel;
use serde_json::Value;

/// Loose presence check: missing, null, false, zero and "" all count as absent.
pub(crate) fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Checks the body of a similarity-search request before it is forwarded.
///
/// `score_threshold` only has to be present as a key; `null` is accepted.
pub fn validate_similarity_request(body: &Value) -> Result<(), AppError> {
    let mut missing = Vec::new();
    for field in ["image", "model", "limit"] {
        if !is_present(body.get(field)) {
            missing.push(field);
        }
    }
    if body.get("score_threshold").is_none() {
        missing.push("score_threshold");
    }
    if !missing.is_empty() {
        log::debug!("Rejecting similarity request, missing: {:?}", missing);
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let model = body.get("model").and_then(Value::as_str);
    if model.and_then(EmbeddingModel::parse).is_none() {
        log::debug!("Rejecting similarity request, invalid model: {:?}", body.get("model"));
        return Err(AppError::Validation(
            "Invalid model. Must be \"v2\" or \"v3\"".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_complete_request() {
        let body = json!({ "image": "abc", "model": "v3", "limit": 10, "score_threshold": 0.4 });
        assert!(validate_similarity_request(&body).is_ok());
    }

    #[test]
    fn null_threshold_is_accepted() {
        let body = json!({ "image": "abc", "model": "v2", "limit": 10, "score_threshold": null });
        assert!(validate_similarity_request(&body).is_ok());
    }

    #[test]
    fn names_only_the_missing_fields() {
        let body = json!({ "image": "abc", "limit": 10, "score_threshold": 0.4 });
        assert_eq!(
            message(validate_similarity_request(&body)),
            "Missing required fields: model"
        );

        let body = json!({ "image": "", "model": "v2", "limit": 0 });
        assert_eq!(
            message(validate_similarity_request(&body)),
            "Missing required fields: image, limit, score_threshold"
        );
    }

    #[test]
    fn rejects_unknown_model() {
        let body = json!({ "image": "abc", "model": "v4", "limit": 10, "score_threshold": 0.4 });
        assert_eq!(
            message(validate_similarity_request(&body)),
            "Invalid model. Must be \"v2\" or \"v3\""
        );

        let body = json!({ "image": "abc", "model": 2, "limit": 10, "score_threshold": 0.4 });
        assert!(validate_similarity_request(&body).is_err());
    }

    #[test]
    fn non_object_body_is_missing_everything() {
        let msg = message(validate_similarity_request(&json!([1, 2, 3])));
        assert!(msg.contains("image") && msg.contains("score_threshold"));
    }
}
