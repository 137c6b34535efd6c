mod wav;

pub mod google;
pub mod piper;

pub use google::GoogleTts;
pub use piper::PiperVoices;
pub use wav::encode_wav;

/// Container format of synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

/// Encoded audio ready to be written to disk.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Text-to-speech backend. `lang` is an ISO 639-1 code such as `fr`.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str, lang: &str) -> anyhow::Result<SpeechAudio>;

    /// Format produced by [`SpeechSynthesizer::synthesize`].
    fn format(&self) -> AudioFormat;
}
