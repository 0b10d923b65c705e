//! Audible announcements
//!
//! At most one utterance is active at a time. Callers check
//! `is_speaking()` before calling `speak()`; an announcer that is already
//! speaking resolves the new request immediately without saying anything.

use crate::infra::config::SpeechConfig;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Text plus voice parameters for one announcement
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: String,
    /// 1.0 = engine default
    pub rate: f32,
    /// 1.0 = engine default
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, speech: &SpeechConfig) -> Self {
        Self { text: text.into(), voice: speech.voice.clone(), rate: speech.rate, pitch: speech.pitch }
    }
}

/// Fires when the utterance has finished (or failed)
pub type SpeechDone = oneshot::Receiver<()>;

pub trait Announcer: Send + Sync {
    fn is_speaking(&self) -> bool;

    /// Start speaking. The returned receiver resolves on completion.
    fn speak(&self, utterance: Utterance) -> SpeechDone;
}

/// Runs an espeak-compatible TTS binary per utterance
pub struct CommandAnnouncer {
    program: String,
    speaking: Arc<AtomicBool>,
}

// espeak defaults: 175 words per minute, pitch 50 (0-99)
const BASE_WPM: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;

impl CommandAnnouncer {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), speaking: Arc::new(AtomicBool::new(false)) }
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_WPM * utterance.rate).round().clamp(80.0, 450.0) as u32;
        let pitch = (BASE_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32;
        vec![
            "-v".to_string(),
            utterance.voice.clone(),
            "-s".to_string(),
            wpm.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            utterance.text.clone(),
        ]
    }
}

impl Announcer for CommandAnnouncer {
    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    fn speak(&self, utterance: Utterance) -> SpeechDone {
        let (done_tx, done_rx) = oneshot::channel();

        if self.speaking.swap(true, Ordering::AcqRel) {
            debug!("announcement_skipped_already_speaking");
            let _ = done_tx.send(());
            return done_rx;
        }

        let speaking = self.speaking.clone();
        let program = self.program.clone();
        let args = Self::args(&utterance);
        tokio::spawn(async move {
            info!(text = %utterance.text, voice = %utterance.voice, "announcement_started");
            let status = Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match status {
                Ok(s) if s.success() => debug!("announcement_finished"),
                Ok(s) => warn!(program = %program, code = ?s.code(), "announcement_failed"),
                Err(e) => warn!(program = %program, error = %e, "announcement_spawn_failed"),
            }
            speaking.store(false, Ordering::Release);
            let _ = done_tx.send(());
        });

        done_rx
    }
}
