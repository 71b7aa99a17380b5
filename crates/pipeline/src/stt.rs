use async_trait::async_trait;
use tokio::sync::mpsc;

/// A recognition result from the speech-to-text collaborator.
#[derive(Debug, Clone)]
pub struct SttEvent {
    pub text: String,
    /// Final results end an utterance; interim results grow until replaced.
    pub is_final: bool,
}

/// Pluggable speech-to-text collaborator.
///
/// The engine is a black box that, once started, pushes `(text, is_final)`
/// events into the provided channel until stopped or the channel closes.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + 'static {
    /// Begins recognition for `language`, delivering events into `events`.
    /// A second `start` implicitly supersedes the first stream.
    async fn start(&self, language: &str, events: mpsc::Sender<SttEvent>) -> anyhow::Result<()>;

    /// Stops recognition. Must cause the event channel to close promptly;
    /// no events may be delivered after this returns.
    async fn stop(&self);
}
