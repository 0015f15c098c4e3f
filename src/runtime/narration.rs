//! Narration channel: speech options, voice selection, and the narrator
//!
//! The `Narrator` owns the speech provider and keeps at most one utterance in
//! flight. Starting a new utterance cancels the previous one. Engine signals
//! come back as `NarrationSignal`s tagged with the utterance id; signals for
//! anything but the in-flight utterance are stale and dropped.
//!
//! Engines do not reliably report the end of speech, so every utterance gets
//! a watchdog deadline sized to its text. Each utterance ends in exactly one
//! terminal notice: `Ended` (engine or watchdog), `Errored`, or `Cancelled`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{NarrationError, NarrationResult};
use super::turn::{Millis, Sequence, UtteranceId};

/// Playback options for one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechOptions {
    /// Speed multiplier
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Volume, 0 to 1
    pub volume: f32,
    /// BCP 47 language tag
    #[serde(default)]
    pub lang: Option<String>,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            lang: None,
        }
    }
}

impl SpeechOptions {
    /// Options used by the lesson guide: slower and a little quieter
    pub fn guide() -> Self {
        Self {
            rate: 0.85,
            pitch: 1.0,
            volume: 0.8,
            lang: None,
        }
    }

    /// Adjust pitch and rate for engine families that need it
    pub fn tuned_for(&self, voice: &Voice) -> Self {
        let name = voice.name.to_lowercase();
        let (pitch, rate) = if name.contains("google") {
            (0.9, 0.9)
        } else if name.contains("microsoft") {
            (1.1, 0.8)
        } else if name.contains("apple") || name.contains("samantha") {
            (0.95, 0.85)
        } else {
            (self.pitch, self.rate)
        };
        Self {
            pitch,
            rate,
            ..self.clone()
        }
    }
}

/// A voice offered by the speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-specific name
    pub name: String,
    /// Language tag, e.g. "en-US"
    pub lang: String,
}

impl Voice {
    /// Convenience constructor
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    fn locale(&self) -> String {
        self.lang.to_lowercase().replace('_', "-")
    }

    fn sounds_female(&self) -> bool {
        let name = self.name.to_lowercase();
        FEMALE_HINTS.iter().any(|hint| name.contains(hint))
    }
}

const FEMALE_HINTS: &[&str] = &[
    "female", "zira", "hazel", "susan", "karen", "serena", "allison", "ava", "victoria",
    "samantha", "alice", "emily", "sarah",
];

/// Pick a voice: the preferred name if present, then en-US, then en-GB, then
/// any other English, else the first voice. Inside each locale tier a
/// female-sounding voice wins over the rest.
pub fn select_voice<'a>(voices: &'a [Voice], preferred: Option<&str>) -> Option<&'a Voice> {
    if let Some(wanted) = preferred.map(str::to_lowercase) {
        if let Some(voice) = voices
            .iter()
            .find(|v| v.name.to_lowercase().contains(&wanted))
        {
            return Some(voice);
        }
    }

    let tiers: [&dyn Fn(&str) -> bool; 3] = [
        &|l: &str| l.starts_with("en-us"),
        &|l: &str| l.starts_with("en-gb"),
        &|l: &str| l == "en" || l.starts_with("en-"),
    ];
    for in_tier in tiers {
        let mut candidates = voices.iter().filter(|v| in_tier(v.locale().as_str()));
        let first = candidates.clone().next();
        if let Some(voice) = candidates.find(|v| v.sounds_female()).or(first) {
            return Some(voice);
        }
    }
    voices.first()
}

/// Watchdog sizing: `base_ms + per_char_ms * chars`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogBudget {
    /// Fixed allowance
    pub base_ms: u64,
    /// Allowance per character of text
    pub per_char_ms: u64,
}

impl Default for WatchdogBudget {
    fn default() -> Self {
        Self {
            base_ms: 5000,
            per_char_ms: 200,
        }
    }
}

impl WatchdogBudget {
    /// Budget for `text`
    pub fn for_text(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        self.base_ms.saturating_add(self.per_char_ms.saturating_mul(chars))
    }
}

/// One utterance handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Identifier echoed back in signals
    pub id: UtteranceId,
    /// Text to speak
    pub text: String,
    /// Playback options (already tuned for the voice)
    pub options: SpeechOptions,
    /// Chosen voice, `None` for the engine default
    pub voice: Option<Voice>,
}

/// Speech engine surface
pub trait NarrationProvider: Send {
    /// Whether speech is available at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Voices currently offered
    fn voices(&self) -> Vec<Voice>;

    /// Begin speaking; lifecycle signals arrive later as events
    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()>;

    /// Stop whatever is being spoken
    fn cancel(&mut self);
}

/// Raw lifecycle signal from the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrationSignal {
    /// Audio started
    Started(UtteranceId),
    /// Audio finished
    Ended(UtteranceId),
    /// Engine failed
    Errored(UtteranceId, String),
}

impl NarrationSignal {
    /// Utterance the signal refers to
    pub fn utterance(&self) -> UtteranceId {
        match self {
            NarrationSignal::Started(id)
            | NarrationSignal::Ended(id)
            | NarrationSignal::Errored(id, _) => *id,
        }
    }
}

/// Filtered lifecycle notice for the current utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrationNotice {
    /// Audio started
    Started(UtteranceId),
    /// Utterance finished
    Ended {
        /// Utterance
        id: UtteranceId,
        /// Produced by the watchdog rather than the engine
        synthetic: bool,
    },
    /// Utterance failed
    Errored {
        /// Utterance
        id: UtteranceId,
        /// Engine message
        reason: String,
    },
    /// Utterance was stopped before finishing
    Cancelled(UtteranceId),
}

#[derive(Debug, Clone)]
struct Inflight {
    id: UtteranceId,
    deadline: Millis,
    started: bool,
}

/// Single-channel narrator over a speech provider
pub struct Narrator {
    provider: Box<dyn NarrationProvider>,
    options: SpeechOptions,
    preferred_voice: Option<String>,
    budget: WatchdogBudget,
    ids: Sequence,
    inflight: Option<Inflight>,
}

impl Narrator {
    /// Create a narrator
    pub fn new(
        provider: Box<dyn NarrationProvider>,
        options: SpeechOptions,
        preferred_voice: Option<String>,
        budget: WatchdogBudget,
    ) -> Self {
        Self {
            provider,
            options,
            preferred_voice,
            budget,
            ids: Sequence::default(),
            inflight: None,
        }
    }

    /// Utterance currently in flight
    pub fn current(&self) -> Option<UtteranceId> {
        self.inflight.as_ref().map(|i| i.id)
    }

    /// Whether audio has started for the in-flight utterance
    pub fn is_speaking(&self) -> bool {
        self.inflight.as_ref().is_some_and(|i| i.started)
    }

    /// Watchdog deadline of the in-flight utterance
    pub fn deadline(&self) -> Option<Millis> {
        self.inflight.as_ref().map(|i| i.deadline)
    }

    /// Speak `text`, cancelling anything already in flight
    pub fn speak(&mut self, text: &str, at: Millis) -> NarrationResult<UtteranceId> {
        self.stop();
        if !self.provider.is_supported() {
            return Err(NarrationError::Unsupported);
        }
        if text.trim().is_empty() {
            return Err(NarrationError::EmptyText);
        }

        let voices = self.provider.voices();
        let voice = select_voice(&voices, self.preferred_voice.as_deref()).cloned();
        let options = match &voice {
            Some(v) => self.options.tuned_for(v),
            None => self.options.clone(),
        };
        let utterance = Utterance {
            id: UtteranceId(self.ids.next()),
            text: text.to_string(),
            options,
            voice,
        };

        self.provider.speak(&utterance)?;

        let deadline = at + self.budget.for_text(text);
        debug!(
            id = %utterance.id,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            %deadline,
            "Narration started"
        );
        self.inflight = Some(Inflight {
            id: utterance.id,
            deadline,
            started: false,
        });
        Ok(utterance.id)
    }

    /// Cancel the in-flight utterance, if any
    pub fn stop(&mut self) -> Option<NarrationNotice> {
        let inflight = self.inflight.take()?;
        self.provider.cancel();
        debug!(id = %inflight.id, "Narration cancelled");
        Some(NarrationNotice::Cancelled(inflight.id))
    }

    /// Filter an engine signal down to a notice about the current utterance
    pub fn on_signal(&mut self, signal: NarrationSignal) -> Option<NarrationNotice> {
        let id = signal.utterance();
        if self.current() != Some(id) {
            debug!(%id, "Dropping stale narration signal");
            return None;
        }
        match signal {
            NarrationSignal::Started(id) => {
                if let Some(inflight) = self.inflight.as_mut() {
                    inflight.started = true;
                }
                Some(NarrationNotice::Started(id))
            }
            NarrationSignal::Ended(id) => {
                self.inflight = None;
                Some(NarrationNotice::Ended {
                    id,
                    synthetic: false,
                })
            }
            NarrationSignal::Errored(id, reason) => {
                self.inflight = None;
                warn!(%id, %reason, "Narration failed");
                Some(NarrationNotice::Errored { id, reason })
            }
        }
    }

    /// Complete the in-flight utterance if its deadline has passed
    pub fn poll_watchdog(&mut self, at: Millis) -> Option<NarrationNotice> {
        let due = self.inflight.as_ref().is_some_and(|i| at >= i.deadline);
        if !due {
            return None;
        }
        let inflight = self.inflight.take()?;
        self.provider.cancel();
        info!(id = %inflight.id, %at, "Speech end not signalled; watchdog completing utterance");
        Some(NarrationNotice::Ended {
            id: inflight.id,
            synthetic: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::simulated::RecordingNarration;

    fn narrator(voices: Vec<Voice>) -> (Narrator, RecordingNarration) {
        let provider = RecordingNarration::with_voices(voices);
        let engine = provider.clone();
        let narrator = Narrator::new(
            Box::new(provider),
            SpeechOptions::guide(),
            None,
            WatchdogBudget::default(),
        );
        (narrator, engine)
    }

    #[test]
    fn test_voice_tiers() {
        let voices = vec![
            Voice::new("Rishi", "en-IN"),
            Voice::new("Daniel", "en-GB"),
            Voice::new("Alex", "en-US"),
            Voice::new("Samantha", "en-US"),
        ];
        assert_eq!(select_voice(&voices, None).unwrap().name, "Samantha");
        assert_eq!(select_voice(&voices, Some("daniel")).unwrap().name, "Daniel");
        assert_eq!(select_voice(&voices[..2], None).unwrap().name, "Daniel");
        assert_eq!(select_voice(&voices[..1], None).unwrap().name, "Rishi");

        let foreign = vec![Voice::new("Amelie", "fr-CA")];
        assert_eq!(select_voice(&foreign, None).unwrap().name, "Amelie");
        assert!(select_voice(&[], None).is_none());
    }

    #[test]
    fn test_tuning_by_engine_family() {
        let tuned = SpeechOptions::guide().tuned_for(&Voice::new("Google US English", "en-US"));
        assert_eq!((tuned.pitch, tuned.rate), (0.9, 0.9));
        assert_eq!(tuned.volume, 0.8);
        let plain = SpeechOptions::guide().tuned_for(&Voice::new("Fred", "en-US"));
        assert_eq!(plain, SpeechOptions::guide());
    }

    #[test]
    fn test_watchdog_budget() {
        let budget = WatchdogBudget::default();
        assert_eq!(budget.for_text("hello"), 6000);
    }

    #[test]
    fn test_new_speech_cancels_previous() {
        let (mut narrator, engine) = narrator(vec![Voice::new("Alex", "en-US")]);
        let first = narrator.speak("One", Millis(0)).unwrap();
        let second = narrator.speak("Two", Millis(10)).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.cancel_count(), 1);
        assert_eq!(narrator.on_signal(NarrationSignal::Ended(first)), None);
        assert_eq!(
            narrator.on_signal(NarrationSignal::Ended(second)),
            Some(NarrationNotice::Ended {
                id: second,
                synthetic: false
            })
        );
    }

    #[test]
    fn test_end_reported_once() {
        let (mut narrator, _engine) = narrator(Vec::new());
        let id = narrator.speak("Hi", Millis(0)).unwrap();
        assert!(narrator.on_signal(NarrationSignal::Ended(id)).is_some());
        assert!(narrator.on_signal(NarrationSignal::Ended(id)).is_none());
        assert!(narrator.poll_watchdog(Millis(1_000_000)).is_none());
    }

    #[test]
    fn test_watchdog_completes_silent_engine() {
        let (mut narrator, _engine) = narrator(Vec::new());
        let id = narrator.speak("Hi", Millis(100)).unwrap();
        assert_eq!(narrator.deadline(), Some(Millis(5500)));
        assert!(narrator.poll_watchdog(Millis(5499)).is_none());
        assert_eq!(
            narrator.poll_watchdog(Millis(5500)),
            Some(NarrationNotice::Ended { id, synthetic: true })
        );
        assert!(narrator.on_signal(NarrationSignal::Ended(id)).is_none());
    }

    #[test]
    fn test_error_clears_without_watchdog() {
        let (mut narrator, _engine) = narrator(Vec::new());
        let id = narrator.speak("Hi", Millis(0)).unwrap();
        assert!(matches!(
            narrator.on_signal(NarrationSignal::Errored(id, "synthesis-failed".into())),
            Some(NarrationNotice::Errored { .. })
        ));
        assert!(narrator.poll_watchdog(Millis(1_000_000)).is_none());
    }

    #[test]
    fn test_empty_text_rejected() {
        let (mut narrator, _engine) = narrator(Vec::new());
        assert_eq!(narrator.speak("  ", Millis(0)), Err(NarrationError::EmptyText));
        assert!(narrator.current().is_none());
    }
}
