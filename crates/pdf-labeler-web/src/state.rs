use pdf_labeler_core::{AppConfig, LabelSpec};

/// Global application state.
///
/// Read-only after startup; every request builds its own [`LabelSpec`]
/// and `RequestContext` from it.
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub const fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Label settings used for form fields the client left out.
    pub fn default_spec(&self) -> LabelSpec {
        LabelSpec::from_defaults(&self.config.label)
    }
}
