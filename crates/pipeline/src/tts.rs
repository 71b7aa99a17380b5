use async_trait::async_trait;

/// Pluggable text-to-speech collaborator with start/stop control.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Speaks `text` in `language`, resolving when playback finishes or is
    /// stopped.
    async fn speak(&self, text: &str, language: &str) -> anyhow::Result<()>;

    /// Stops any utterance currently playing. Idempotent.
    async fn stop(&self);
}
