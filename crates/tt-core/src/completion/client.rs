use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CompletionError, DownloadMonitor, LanguageModel, LogMonitor, PromptSession, SessionOptions};
use crate::config::CompletionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Corrector,
    Predictor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Corrector => "corrector",
            Self::Predictor => "predictor",
        })
    }
}

/// Uniform `correct` / `predict_next` contract over two optional sessions.
///
/// Both calls block the calling thread for the duration of the model call;
/// the engine only invokes them from its worker threads. Neither ever fails:
/// an absent session, a failed call, or malformed output all produce the
/// fallback (input unchanged, or the configured prediction placeholder).
pub struct CompletionClient {
    corrector: Option<Arc<dyn PromptSession>>,
    predictor: Option<Arc<dyn PromptSession>>,
    input_prefix: String,
    prediction_fallback: String,
    max_growth_ratio: f64,
}

impl CompletionClient {
    /// Probe `model` once and open both sessions. A missing model, an
    /// unavailable one, or a failed session creation leaves that role absent.
    pub fn initialize(model: Option<&dyn LanguageModel>, config: &CompletionConfig) -> Self {
        let mut client = Self::without_sessions(config);
        let Some(model) = model else {
            info!("no language model provided; completion disabled");
            return client;
        };

        let availability = model.availability();
        if !availability.is_usable() {
            info!("language model not available; completion disabled");
            return client;
        }
        debug!(?availability, "language model probed");

        let monitor: Arc<dyn DownloadMonitor> = Arc::new(LogMonitor);
        client.corrector = open_session(model, Role::Corrector, &config.corrector_prompt, &monitor);
        client.predictor = open_session(model, Role::Predictor, &config.predictor_prompt, &monitor);
        client
    }

    pub fn without_sessions(config: &CompletionConfig) -> Self {
        Self {
            corrector: None,
            predictor: None,
            input_prefix: config.input_prefix.clone(),
            prediction_fallback: config.prediction_fallback.clone(),
            max_growth_ratio: config.max_growth_ratio,
        }
    }

    /// Build a client around already-open sessions.
    pub fn with_sessions(
        corrector: Option<Arc<dyn PromptSession>>,
        predictor: Option<Arc<dyn PromptSession>>,
        config: &CompletionConfig,
    ) -> Self {
        Self {
            corrector,
            predictor,
            ..Self::without_sessions(config)
        }
    }

    pub fn has_session(&self, role: Role) -> bool {
        match role {
            Role::Corrector => self.corrector.is_some(),
            Role::Predictor => self.predictor.is_some(),
        }
    }

    /// Spelling/grammar correction of `text`; `text` itself on any failure.
    pub fn correct(&self, text: &str) -> String {
        let Some(session) = &self.corrector else {
            return text.to_string();
        };
        match self
            .ask(session.as_ref(), text)
            .and_then(|out| self.check_correction(text, out))
        {
            Ok(corrected) => {
                debug!(%corrected, "corrected text");
                corrected
            }
            Err(e) => {
                warn!(role = %Role::Corrector, "error correcting text: {e}");
                text.to_string()
            }
        }
    }

    /// Predicted continuation of `text`; the placeholder on any failure.
    pub fn predict_next(&self, text: &str) -> String {
        let Some(session) = &self.predictor else {
            return self.prediction_fallback.clone();
        };
        match self.ask(session.as_ref(), text).and_then(first_line) {
            Ok(next) => {
                debug!(%next, "predicted next word");
                next
            }
            Err(e) => {
                warn!(role = %Role::Predictor, "error predicting next word: {e}");
                self.prediction_fallback.clone()
            }
        }
    }

    fn ask(&self, session: &dyn PromptSession, text: &str) -> Result<String, CompletionError> {
        let input = format!("{}{}", self.input_prefix, text);
        session.prompt(&input)
    }

    /// Reject output that cannot be a correction of `input`: empty, or far
    /// longer than the input (the model answered instead of correcting).
    fn check_correction(&self, input: &str, output: String) -> Result<String, CompletionError> {
        let trimmed = output.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            return Err(CompletionError::Malformed("empty correction".to_string()));
        }
        let limit = (input.chars().count() as f64 * self.max_growth_ratio) as usize + 16;
        let len = trimmed.chars().count();
        if len > limit {
            return Err(CompletionError::Malformed(format!(
                "correction of {len} chars for input of {} chars",
                input.chars().count()
            )));
        }
        Ok(trimmed.to_string())
    }
}

fn first_line(output: String) -> Result<String, CompletionError> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CompletionError::Malformed("empty prediction".to_string()))
}

fn open_session(
    model: &dyn LanguageModel,
    role: Role,
    system_prompt: &str,
    monitor: &Arc<dyn DownloadMonitor>,
) -> Option<Arc<dyn PromptSession>> {
    let options = SessionOptions {
        system_prompt,
        monitor: Some(Arc::clone(monitor)),
    };
    match model.create_session(&options) {
        Ok(session) => {
            info!(%role, "session created");
            Some(session)
        }
        Err(e) => {
            warn!(%role, "could not create session: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::completion::Availability;
    use crate::config::Config;

    struct Scripted {
        reply: Result<String, String>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn shared(self: &Arc<Self>) -> Option<Arc<dyn PromptSession>> {
            let session: Arc<dyn PromptSession> = self.clone();
            Some(session)
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("model crashed".to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl PromptSession for Scripted {
        fn prompt(&self, input: &str) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(input.to_string());
            self.reply.clone().map_err(CompletionError::Call)
        }
    }

    struct FakeModel {
        availability: Availability,
        prompts: Mutex<Vec<String>>,
        fail_predictor: bool,
    }

    impl LanguageModel for FakeModel {
        fn availability(&self) -> Availability {
            self.availability
        }

        fn create_session(
            &self,
            options: &SessionOptions<'_>,
        ) -> Result<Arc<dyn PromptSession>, CompletionError> {
            self.prompts
                .lock()
                .unwrap()
                .push(options.system_prompt.to_string());
            if self.fail_predictor && options.system_prompt.contains("writing assistant") {
                return Err(CompletionError::Setup("quota".to_string()));
            }
            let session: Arc<dyn PromptSession> = Scripted::ok("ok");
            Ok(session)
        }
    }

    fn cfg() -> CompletionConfig {
        Config::default().completion
    }

    #[test]
    fn test_absent_sessions_fall_back() {
        let client = CompletionClient::initialize(None, &cfg());
        assert_eq!(client.correct("I am gong"), "I am gong");
        assert_eq!(client.predict_next("I like "), "");
    }

    #[test]
    fn test_unavailable_model_not_used() {
        let model = FakeModel {
            availability: Availability::Unavailable,
            prompts: Mutex::new(Vec::new()),
            fail_predictor: false,
        };
        let client = CompletionClient::initialize(Some(&model), &cfg());
        assert!(!client.has_session(Role::Corrector));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_creates_both_roles() {
        let model = FakeModel {
            availability: Availability::NeedsSetup,
            prompts: Mutex::new(Vec::new()),
            fail_predictor: false,
        };
        let client = CompletionClient::initialize(Some(&model), &cfg());
        assert!(client.has_session(Role::Corrector));
        assert!(client.has_session(Role::Predictor));
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("spelling corrector"));
    }

    #[test]
    fn test_failed_session_leaves_role_absent() {
        let model = FakeModel {
            availability: Availability::Available,
            prompts: Mutex::new(Vec::new()),
            fail_predictor: true,
        };
        let client = CompletionClient::initialize(Some(&model), &cfg());
        assert!(client.has_session(Role::Corrector));
        assert!(!client.has_session(Role::Predictor));
    }

    #[test]
    fn test_correct_sends_prefixed_input() {
        let session = Scripted::ok("I am going\n");
        let client = CompletionClient::with_sessions(session.shared(), None, &cfg());
        assert_eq!(client.correct("I am gong"), "I am going");
        assert_eq!(session.seen.lock().unwrap()[0], "Sequence: I am gong");
    }

    #[test]
    fn test_failed_call_returns_input() {
        let client = CompletionClient::with_sessions(
            Scripted::failing().shared(),
            Scripted::failing().shared(),
            &cfg(),
        );
        assert_eq!(client.correct("teh"), "teh");
        assert_eq!(client.predict_next("the "), "");
    }

    #[test]
    fn test_malformed_correction_rejected() {
        let client = CompletionClient::with_sessions(Scripted::ok("  \n").shared(), None, &cfg());
        assert_eq!(client.correct("teh"), "teh");

        let rambling = "Sure! Here is the corrected sequence you asked for: the";
        let client = CompletionClient::with_sessions(Scripted::ok(rambling).shared(), None, &cfg());
        assert_eq!(client.correct("teh"), "teh");
    }

    #[test]
    fn test_prediction_first_line() {
        let client =
            CompletionClient::with_sessions(None, Scripted::ok("\n cats \nand dogs").shared(), &cfg());
        assert_eq!(client.predict_next("I like "), "cats");
    }

    #[test]
    fn test_custom_prediction_fallback() {
        let mut config = cfg();
        config.prediction_fallback = "suggestion".to_string();
        let client = CompletionClient::initialize(None, &config);
        assert_eq!(client.predict_next(""), "suggestion");
    }
}
