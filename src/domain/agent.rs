//! Response generation collaborator
//!
//! The relay does not generate speech itself. It hands the transcript to a
//! `ResponseAgent` and relays whatever frames come back.

use crate::domain::session::{CallerNumber, OutboundEvent, ResponseRequest};
use crate::domain::shared::{CallId, Result};
use futures::stream::{self, BoxStream, StreamExt};

/// What an agent knows about the call it is speaking on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub call_id: CallId,
    pub caller: Option<CallerNumber>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResponseAgent: Send + Sync {
    /// Opening utterance, sent once call details are known
    async fn begin_message(&self, call: CallContext) -> Result<Option<OutboundEvent>>;

    /// Lazily generated reply frames for one response id
    fn draft_response(
        &self,
        call: CallContext,
        request: ResponseRequest,
    ) -> BoxStream<'static, Result<OutboundEvent>>;
}

/// Built-in agent: an optional fixed greeting and nothing else
#[derive(Debug, Clone, Default)]
pub struct StaticAgent {
    greeting: Option<String>,
}

impl StaticAgent {
    pub fn new(greeting: Option<String>) -> Self {
        Self { greeting }
    }
}

#[async_trait::async_trait]
impl ResponseAgent for StaticAgent {
    async fn begin_message(&self, _call: CallContext) -> Result<Option<OutboundEvent>> {
        Ok(self
            .greeting
            .as_ref()
            .map(|text| OutboundEvent::response(0, text.clone(), true)))
    }

    fn draft_response(
        &self,
        _call: CallContext,
        _request: ResponseRequest,
    ) -> BoxStream<'static, Result<OutboundEvent>> {
        stream::empty().boxed()
    }
}
