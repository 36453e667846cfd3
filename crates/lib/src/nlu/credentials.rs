//! Credential reference -> bearer token.
//!
//! The reference is either a path to a file or an inline secret. Files may hold JSON with an
//! `access_token` (or `token`) field, or the bare token.

use std::path::Path;

use super::NluError;

/// Resolve the configured credential reference to a bearer token.
pub fn resolve_token(reference: &str) -> Result<String, NluError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(NluError::ProviderRejected("credentials not configured".to_string()));
    }
    let path = Path::new(reference);
    let token = if path.is_file() {
        let s = std::fs::read_to_string(path).map_err(|e| {
            NluError::ProviderUnavailable(format!(
                "reading credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        log::debug!("nlu: loaded credentials from {}", path.display());
        token_from_file_contents(&s)
    } else {
        reference.to_string()
    };
    if token.is_empty() {
        return Err(NluError::ProviderRejected("credentials are empty".to_string()));
    }
    Ok(token)
}

fn token_from_file_contents(contents: &str) -> String {
    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(contents) {
        return ["access_token", "token"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
    }
    contents.trim().to_string()
}
