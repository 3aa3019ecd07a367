use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use crate::ReasoningService;

/// Canned-reply backend for tests and offline runs. Replies are consumed in
/// order; running out behaves like a collaborator outage.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReasoningService {
    replies: Arc<Mutex<VecDeque<String>>>,
}

impl ScriptedReasoningService {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(Into::into).collect(),
            )),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(reply.into());
    }
}

impl ReasoningService for ScriptedReasoningService {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        match self.replies.lock().pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("scripted reasoning service has no replies left"),
        }
    }
}
