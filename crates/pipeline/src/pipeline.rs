use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::TranscriptChunk;
use crate::cache::TranslationCache;
use crate::stt::{SpeechRecognizer, SttEvent};
use crate::tts::SpeechSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Listening,
    Translating,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Recognition,
    Translation,
    Synthesis,
}

/// Events emitted by the pipeline to its embedding application.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Interim transcript for the live "currently speaking" UI signal.
    /// Never sent downstream.
    PartialTranscript(TranscriptChunk),
    /// Finalized local utterance: forward verbatim to the peer over the
    /// data path, and display locally.
    FinalTranscript(TranscriptChunk),
    /// A translated inbound utterance finished playing.
    UtteranceSpoken { chunk_id: u64, text: String },
    /// Collaborator failure. Non-fatal: the pipeline keeps listening.
    Error {
        stage: PipelineStage,
        message: String,
    },
}

/// Client-side orchestrator: local speech → text (outbound), peer text →
/// translation → synthesized speech (inbound).
///
/// idle → listening → (per finalized inbound utterance) translating →
/// speaking → listening, with idle reachable from any state via `shutdown`.
pub struct AudioPipeline {
    stt: Arc<dyn SpeechRecognizer>,
    tts: Arc<dyn SpeechSynthesizer>,
    cache: Arc<TranslationCache>,
    /// (language spoken locally, language heard locally).
    languages: Mutex<(String, String)>,
    chunk_seq: AtomicU64,
    events: broadcast::Sender<PipelineEvent>,
    state: Mutex<PipelineState>,
    listen_task: Mutex<Option<AbortHandle>>,
    speak_task: Mutex<Option<AbortHandle>>,
    torn_down: AtomicBool,
}

impl AudioPipeline {
    pub fn new(
        stt: Arc<dyn SpeechRecognizer>,
        tts: Arc<dyn SpeechSynthesizer>,
        cache: Arc<TranslationCache>,
        source_language: &str,
        target_language: &str,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            stt,
            tts,
            cache,
            languages: Mutex::new((source_language.to_string(), target_language.to_string())),
            chunk_seq: AtomicU64::new(0),
            events,
            state: Mutex::new(PipelineState::Idle),
            listen_task: Mutex::new(None),
            speak_task: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// Begins continuous recognition of local speech.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            anyhow::bail!("pipeline is torn down");
        }

        let source = self.languages.lock().0.clone();
        let (tx, rx) = mpsc::channel::<SttEvent>(32);
        self.stt.start(&source, tx).await?;

        *self.state.lock() = PipelineState::Listening;

        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move { pipeline.listen_loop(rx).await });
        if let Some(old) = self.listen_task.lock().replace(handle.abort_handle()) {
            old.abort();
        }
        Ok(())
    }

    async fn listen_loop(self: Arc<Self>, mut rx: mpsc::Receiver<SttEvent>) {
        while let Some(event) = rx.recv().await {
            if self.torn_down.load(Ordering::SeqCst) {
                return;
            }
            let source = self.languages.lock().0.clone();
            let chunk = self.next_chunk(event.text, source, !event.is_final);
            let emitted = if chunk.is_partial {
                self.emit(PipelineEvent::PartialTranscript(chunk))
            } else {
                self.emit(PipelineEvent::FinalTranscript(chunk))
            };
            if !emitted {
                debug!("No pipeline subscribers");
            }
        }

        // Channel closed without teardown: the recognizer stream ended on
        // its own. Surface it; the embedder decides whether to restart.
        if !self.torn_down.load(Ordering::SeqCst) {
            self.emit(PipelineEvent::Error {
                stage: PipelineStage::Recognition,
                message: "recognition stream ended".to_string(),
            });
        }
    }

    fn next_chunk(&self, text: String, source_language: String, is_partial: bool) -> TranscriptChunk {
        TranscriptChunk {
            text,
            source_language,
            timestamp_ms: Utc::now().timestamp_millis(),
            chunk_id: self.chunk_seq.fetch_add(1, Ordering::SeqCst),
            is_partial,
        }
    }

    /// Feeds a transcript chunk that arrived from the peer. Partial chunks
    /// are ignored (translating them wastes calls and produces flickering
    /// speech); finals are translated and spoken.
    pub async fn handle_peer_chunk(self: &Arc<Self>, chunk: TranscriptChunk) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        if chunk.is_partial {
            debug!(chunk_id = chunk.chunk_id, "Ignoring partial inbound chunk");
            return;
        }

        let target = self.languages.lock().1.clone();
        *self.state.lock() = PipelineState::Translating;

        match self
            .cache
            .translate(&chunk.text, &chunk.source_language, &target)
            .await
        {
            Ok(translated) if translated.is_empty() => {
                *self.state.lock() = PipelineState::Listening;
            }
            Ok(translated) => {
                self.start_speaking(chunk.chunk_id, translated, target);
            }
            Err(e) => {
                // One failed utterance does not end the call.
                warn!(chunk_id = chunk.chunk_id, %e, "Translation failed");
                self.emit(PipelineEvent::Error {
                    stage: PipelineStage::Translation,
                    message: e.to_string(),
                });
                *self.state.lock() = PipelineState::Listening;
            }
        }
    }

    /// At most one synthesized utterance plays at a time, most-recent-wins.
    fn start_speaking(self: &Arc<Self>, chunk_id: u64, text: String, language: String) {
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move {
            // Interrupt whatever is currently playing before starting.
            pipeline.tts.stop().await;
            *pipeline.state.lock() = PipelineState::Speaking;

            match pipeline.tts.speak(&text, &language).await {
                Ok(()) => {
                    pipeline.emit(PipelineEvent::UtteranceSpoken { chunk_id, text });
                }
                Err(e) => {
                    warn!(chunk_id, %e, "Synthesis failed");
                    pipeline.emit(PipelineEvent::Error {
                        stage: PipelineStage::Synthesis,
                        message: e.to_string(),
                    });
                }
            }

            if !pipeline.torn_down.load(Ordering::SeqCst) {
                *pipeline.state.lock() = PipelineState::Listening;
            }
        });

        if let Some(previous) = self.speak_task.lock().replace(handle.abort_handle()) {
            previous.abort();
        }
    }

    /// Swaps both the recognition input language and the synthesis output
    /// language for subsequent utterances. The recognizer stream is
    /// restarted; in-flight utterances are unaffected.
    pub async fn set_languages(
        self: &Arc<Self>,
        source_language: &str,
        target_language: &str,
    ) -> anyhow::Result<()> {
        {
            let mut langs = self.languages.lock();
            *langs = (source_language.to_string(), target_language.to_string());
        }

        if self.state() != PipelineState::Idle {
            self.stt.stop().await;
            self.start().await?;
        }
        Ok(())
    }

    /// Tears the pipeline down: stops recognition and synthesis and releases
    /// every subscription so no further callbacks fire.
    pub async fn shutdown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);

        if let Some(handle) = self.listen_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.speak_task.lock().take() {
            handle.abort();
        }

        self.stt.stop().await;
        self.tts.stop().await;
        *self.state.lock() = PipelineState::Idle;
        debug!("Audio pipeline torn down");
    }

    fn emit(&self, event: PipelineEvent) -> bool {
        if self.torn_down.load(Ordering::SeqCst) {
            return false;
        }
        self.events.send(event).is_ok()
    }
}
