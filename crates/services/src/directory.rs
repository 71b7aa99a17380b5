use async_trait::async_trait;

/// Read-only lookup into the external user store, used for caller display
/// names on incoming-call notifications. Not part of the session state
/// machine.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Display name for a user, or `None` if unknown.
    async fn display_name(&self, user_id: &str) -> Option<String>;
}

/// Directory that knows nobody. Callers fall back to the raw user id.
pub struct NullDirectory;

#[async_trait]
impl UserDirectory for NullDirectory {
    async fn display_name(&self, _user_id: &str) -> Option<String> {
        None
    }
}
