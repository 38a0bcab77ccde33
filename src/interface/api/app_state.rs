//! Shared handler state

use crate::application::{SessionDirectory, SessionSettings};
use crate::config::Config;
use crate::domain::agent::{ResponseAgent, StaticAgent};
use crate::infrastructure::broadcast::SubscriberRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriberRegistry>,
    pub sessions: Arc<SessionDirectory>,
    pub agent: Arc<dyn ResponseAgent>,
    pub session_settings: SessionSettings,
    pub observer_queue_capacity: usize,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(agent: Arc<dyn ResponseAgent>) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            sessions: Arc::new(SessionDirectory::new()),
            agent,
            session_settings: SessionSettings::default(),
            observer_queue_capacity: 256,
            started_at: Utc::now(),
        }
    }

    /// State wired from configuration, using the built-in agent
    pub fn from_config(config: &Config) -> Self {
        let agent: Arc<dyn ResponseAgent> = Arc::new(StaticAgent::new(config.agent.greeting.clone()));
        Self {
            session_settings: config.session_settings(),
            observer_queue_capacity: config.relay.observer_queue_capacity,
            ..Self::new(agent)
        }
    }
}
