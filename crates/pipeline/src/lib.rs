pub mod cache;
pub mod pipeline;
pub mod stt;
pub mod translator;
pub mod tts;

pub use cache::TranslationCache;
pub use pipeline::{AudioPipeline, PipelineEvent, PipelineStage, PipelineState};
pub use stt::{SpeechRecognizer, SttEvent};
pub use translator::{HttpTranslator, TranslateError, Translator};
pub use tts::SpeechSynthesizer;

use serde::{Deserialize, Serialize};

/// One unit of recognized speech, partial or final.
///
/// Partial chunks are superseded by later chunks for the same utterance and
/// are never individually translated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub text: String,
    pub source_language: String,
    pub timestamp_ms: i64,
    /// Monotonically increasing per pipeline instance.
    pub chunk_id: u64,
    pub is_partial: bool,
}
