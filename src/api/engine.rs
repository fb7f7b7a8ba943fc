use std::sync::Arc;

use tracing::info;
use tt_core::completion::{CompletionClient, LanguageModel, Role};
use tt_core::config::{config, Config};
use tt_core::metrics::{EstimatingMeasurer, TextMeasurer};
use tt_core::settings::{Settings, SettingsStore};
use tt_session::clock::{Clock, SystemClock};
use tt_session::AugmentSession;

use super::foreign::{ForeignMeasurer, ForeignModel};
use super::{TtError, TtLanguageModel, TtSession, TtSettings, TtTextMeasurer};
use crate::async_worker::AsyncWorker;
use crate::capability::http::HttpModel;

/// Process-wide engine: one probed model, one settings store, any number of
/// document sessions.
#[derive(uniffi::Object)]
pub struct TtEngine {
    config: Config,
    client: Arc<CompletionClient>,
    settings: SettingsStore,
    measurer: Arc<dyn TextMeasurer>,
}

#[uniffi::export]
impl TtEngine {
    /// Probe `model` once and open the corrector and predictor sessions.
    /// Without a measurer, overlay placement uses a width estimate.
    #[uniffi::constructor]
    fn new(
        model: Option<Arc<dyn TtLanguageModel>>,
        measurer: Option<Arc<dyn TtTextMeasurer>>,
    ) -> Arc<Self> {
        let model = model.map(ForeignModel);
        let measurer = measurer.map(|m| Arc::new(ForeignMeasurer(m)) as Arc<dyn TextMeasurer>);
        Arc::new(Self::build(
            config().clone(),
            model.as_ref().map(|m| m as &dyn LanguageModel),
            measurer,
        ))
    }

    /// Engine backed by an Ollama-compatible HTTP endpoint instead of a
    /// host-provided model.
    #[uniffi::constructor]
    fn with_http_model(
        endpoint: String,
        model: String,
        measurer: Option<Arc<dyn TtTextMeasurer>>,
    ) -> Result<Arc<Self>, TtError> {
        let http = HttpModel::new(&endpoint, &model)?;
        let measurer = measurer.map(|m| Arc::new(ForeignMeasurer(m)) as Arc<dyn TextMeasurer>);
        Ok(Arc::new(Self::build(
            config().clone(),
            Some(&http as &dyn LanguageModel),
            measurer,
        )))
    }

    fn create_session(&self) -> Result<Arc<TtSession>, TtError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        self.session_with_clock(clock).map(Arc::new)
    }

    fn has_corrector(&self) -> bool {
        self.client.has_session(Role::Corrector)
    }

    fn has_predictor(&self) -> bool {
        self.client.has_session(Role::Predictor)
    }

    fn settings(&self) -> TtSettings {
        self.settings.get().into()
    }
}

impl TtEngine {
    pub fn build(
        config: Config,
        model: Option<&dyn LanguageModel>,
        measurer: Option<Arc<dyn TextMeasurer>>,
    ) -> Self {
        let client = CompletionClient::initialize(model, &config.completion);
        let measurer =
            measurer.unwrap_or_else(|| Arc::new(EstimatingMeasurer::new(&config.metrics)));
        info!(
            corrector = client.has_session(Role::Corrector),
            predictor = client.has_session(Role::Predictor),
            "engine ready"
        );
        Self {
            config,
            client: Arc::new(client),
            settings: SettingsStore::new(Settings::default()),
            measurer,
        }
    }

    /// Build around an already-initialized client (tools and tests).
    pub fn with_client(config: Config, client: CompletionClient, measurer: Arc<dyn TextMeasurer>) -> Self {
        Self {
            config,
            client: Arc::new(client),
            settings: SettingsStore::new(Settings::default()),
            measurer,
        }
    }

    pub fn session_with_clock(&self, clock: Arc<dyn Clock>) -> Result<TtSession, TtError> {
        let session = AugmentSession::new(
            &self.config,
            self.settings.clone(),
            Arc::clone(&self.measurer),
            clock,
        );
        let worker = AsyncWorker::new(Arc::clone(&self.client)).map_err(|e| TtError::Internal {
            msg: format!("failed to spawn worker: {e}"),
        })?;
        Ok(TtSession::new(session, worker))
    }
}
