//! Rackspace Monitoring webhook payloads.
//!
//! Rackspace notifications must carry the Iris plan name under
//! `metadata.iris_plan`; it has to be set through the Rackspace API since the
//! web console does not expose notification metadata.

use serde_json::{Map, Value};
use tracing::warn;

use super::{WebhookError, MAX_CONTEXT_LENGTH};

const REQUIRED_KEYS: [&str; 3] = ["version", "status", "alerts"];

/// A Rackspace alert that passed `validate_post`
#[derive(Debug, Clone, PartialEq)]
pub struct RackspaceAlert {
    pub metadata: AlertMetadata,
    /// The whole payload as posted, stored verbatim as incident context
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMetadata {
    pub iris_plan: String,
}

/// Check the required keys and lift the plan name out of `metadata`
pub fn validate_post(body: Value) -> Result<RackspaceAlert, WebhookError> {
    let object = body
        .as_object()
        .ok_or_else(|| WebhookError::Validation("alert body must be a JSON object".to_string()))?;

    if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
        return Err(WebhookError::Validation(
            "missing version, status and/or alert attributes".to_string(),
        ));
    }

    let metadata = parse_metadata(object)?;

    Ok(RackspaceAlert { metadata, payload: body })
}

fn parse_metadata(object: &Map<String, Value>) -> Result<AlertMetadata, WebhookError> {
    let metadata = object
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| WebhookError::Validation("missing metadata object".to_string()))?;

    match metadata.get("iris_plan") {
        Some(Value::String(plan)) => Ok(AlertMetadata { iris_plan: plan.clone() }),
        Some(_) => Err(WebhookError::Validation("iris_plan must be a string".to_string())),
        None => Err(WebhookError::Validation("missing iris_plan key in metadata".to_string())),
    }
}

/// Serialize the payload for `incident.context`, refusing anything over the column size
pub fn create_context(body: &Value) -> Result<String, WebhookError> {
    let context = serde_json::to_string(body)?;

    if context.len() > MAX_CONTEXT_LENGTH {
        warn!(
            size = context.len(),
            limit = MAX_CONTEXT_LENGTH,
            "POST from rackspace exceeded acceptable size"
        );
        return Err(WebhookError::ContextTooLarge {
            size: context.len(),
            limit: MAX_CONTEXT_LENGTH,
        });
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "version": "1",
            "status": "ok",
            "alerts": [],
            "metadata": { "iris_plan": "teamA" }
        })
    }

    #[test]
    fn accepts_complete_payload() {
        let alert = validate_post(sample()).unwrap();
        assert_eq!(alert.metadata.iris_plan, "teamA");
        assert_eq!(alert.payload, sample());
    }

    #[test]
    fn rejects_each_missing_top_level_key() {
        for key in ["version", "status", "alerts", "metadata"] {
            let mut body = sample();
            body.as_object_mut().unwrap().remove(key);
            assert!(
                matches!(validate_post(body), Err(WebhookError::Validation(_))),
                "payload without {key} should fail validation"
            );
        }
    }

    #[test]
    fn rejects_missing_or_mistyped_plan() {
        let mut body = sample();
        body["metadata"] = json!({ "other": "x" });
        assert!(matches!(validate_post(body), Err(WebhookError::Validation(_))));

        let mut body = sample();
        body["metadata"]["iris_plan"] = json!(42);
        assert!(matches!(validate_post(body), Err(WebhookError::Validation(_))));

        let mut body = sample();
        body["metadata"] = json!("teamA");
        assert!(matches!(validate_post(body), Err(WebhookError::Validation(_))));
    }

    #[test]
    fn null_values_still_count_as_present() {
        let body = json!({
            "version": null,
            "status": null,
            "alerts": null,
            "metadata": { "iris_plan": "teamA" }
        });
        assert!(validate_post(body).is_ok());
    }

    #[test]
    fn rejects_non_object_body() {
        assert!(matches!(validate_post(json!([1, 2])), Err(WebhookError::Validation(_))));
    }

    #[test]
    fn context_is_compact_json_of_whole_payload() {
        let context = create_context(&sample()).unwrap();
        let reparsed: Value = serde_json::from_str(&context).unwrap();
        assert_eq!(reparsed, sample());
        assert!(!context.contains('\n'));
    }

    #[test]
    fn context_at_limit_is_accepted() {
        let overhead = serde_json::to_string(&json!({ "pad": "" })).unwrap().len();
        let body = json!({ "pad": "x".repeat(MAX_CONTEXT_LENGTH - overhead) });
        assert_eq!(create_context(&body).unwrap().len(), MAX_CONTEXT_LENGTH);
    }

    #[test]
    fn context_over_limit_is_rejected_not_truncated() {
        let body = json!({ "pad": "x".repeat(MAX_CONTEXT_LENGTH) });
        match create_context(&body) {
            Err(WebhookError::ContextTooLarge { size, limit }) => {
                assert!(size > limit);
                assert_eq!(limit, MAX_CONTEXT_LENGTH);
            }
            other => panic!("expected ContextTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn limit_counts_bytes_not_chars() {
        // 3-byte UTF-8 code point, serialized unescaped
        let body = json!({ "pad": "\u{20ac}".repeat(MAX_CONTEXT_LENGTH / 3 + 1) });
        assert!(matches!(create_context(&body), Err(WebhookError::ContextTooLarge { .. })));
    }
}
