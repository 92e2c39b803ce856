//! A backend that replays canned responses in order.
//!
//! Used by tests and by `rally recommend --response-file` to push a captured
//! backend output through the rest of the pipeline without a network call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::trait_def::{BackendError, GenerationRequest, GenerativeBackend};

/// Replays a queue of results; when one result remains it is repeated.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Result<String, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A backend that always answers with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    /// A backend that always fails with `err`.
    pub fn failing(err: BackendError) -> Self {
        Self::new([Err(err)])
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        let mut script = self
            .script
            .lock()
            .map_err(|_| BackendError::Network("scripted backend poisoned".to_string()))?;
        match script.len() {
            0 => Err(BackendError::EmptyResponse("script exhausted".to_string())),
            1 => script[0].clone(),
            _ => script
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::EmptyResponse("script exhausted".to_string()))),
        }
    }
}
