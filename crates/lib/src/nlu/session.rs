//! Session key derivation: conversation id -> stable provider-safe key.

/// MD5 of the conversation id, lowercase hex (32 chars). Same id always yields the same key,
/// so the provider keeps multi-turn context per conversation.
pub fn derive_session_key(conversation_id: &str) -> String {
    format!("{:x}", md5::compute(conversation_id.as_bytes()))
}

/// Provider session resource name for a project and session key.
pub fn session_path(project_id: &str, session_key: &str) -> String {
    format!("projects/{}/agent/sessions/{}", project_id, session_key)
}
