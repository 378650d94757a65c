//! Control-document (TwiML) builder
//!
//! Only the verbs this system answers calls with. Values are XML-escaped;
//! the carrier rejects documents with stray ampersands in callback URLs.

const VOICEMAIL_MAX_LENGTH_SECS: u32 = 120;

/// A voice control document under construction.
#[derive(Debug, Default)]
pub struct VoiceResponse {
    body: String,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` to the caller.
    pub fn say(mut self, text: &str) -> Self {
        self.body.push_str("<Say>");
        self.body.push_str(&escape(text));
        self.body.push_str("</Say>");
        self
    }

    /// Play an audio asset.
    pub fn play(mut self, url: &str) -> Self {
        self.body.push_str("<Play>");
        self.body.push_str(&escape(url));
        self.body.push_str("</Play>");
        self
    }

    /// Open a bidirectional media socket to `ws_url`.
    pub fn connect_stream(mut self, ws_url: &str) -> Self {
        self.body.push_str("<Connect><Stream url=\"");
        self.body.push_str(&escape(ws_url));
        self.body.push_str("\"/></Connect>");
        self
    }

    /// Join the named conference room. The conference ends when this leg
    /// leaves, which tears the whole call down once either side hangs up.
    pub fn dial_conference(mut self, room: &str) -> Self {
        self.body
            .push_str("<Dial><Conference endConferenceOnExit=\"true\" beep=\"false\">");
        self.body.push_str(&escape(room));
        self.body.push_str("</Conference></Dial>");
        self
    }

    /// Record a message, reporting the recording and its transcription to
    /// the given callback URLs.
    pub fn record(mut self, recording_callback: &str, transcribe_callback: &str) -> Self {
        self.body.push_str(&format!(
            "<Record maxLength=\"{VOICEMAIL_MAX_LENGTH_SECS}\" \
             recordingStatusCallback=\"{}\" \
             transcribe=\"true\" transcribeCallback=\"{}\"/>",
            escape(recording_callback),
            escape(transcribe_callback),
        ));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.body.push_str("<Hangup/>");
        self
    }

    pub fn build(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
            self.body
        )
    }
}

/// Answer document for an inbound call: greeting, then the hold-audio
/// media socket.
pub fn answer(greeting_url: Option<&str>, ws_url: &str) -> String {
    let response = match greeting_url {
        Some(url) => VoiceResponse::new().play(url),
        None => VoiceResponse::new().say("Thanks for calling. Please hold while we find someone."),
    };
    response.connect_stream(ws_url).build()
}

/// Join document for either leg of a bridged call.
pub fn conference(room: &str) -> String {
    VoiceResponse::new().dial_conference(room).build()
}

/// Voicemail document: prompt, record with callbacks, hang up.
pub fn voicemail(recording_callback: &str, transcribe_callback: &str) -> String {
    VoiceResponse::new()
        .say("No one could pick up. Please leave a message after the tone.")
        .record(recording_callback, transcribe_callback)
        .hangup()
        .build()
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
