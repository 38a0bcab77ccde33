//! Relay metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub fn describe() {
    describe_gauge!("relay_active_sessions", "Number of live call sessions");
    describe_gauge!("relay_observers", "Number of registered observer connections");
    describe_counter!(
        "relay_session_messages_total",
        "Inbound session frames by interaction type"
    );
    describe_counter!(
        "relay_protocol_faults_total",
        "Inbound session frames dropped as malformed"
    );
    describe_counter!("relay_broadcasts_total", "Messages fanned out to observers");
    describe_counter!(
        "relay_broadcast_evictions_total",
        "Observers removed because their connection was gone"
    );
    describe_counter!(
        "relay_webhook_events_total",
        "Lifecycle notifications received by event name"
    );
    describe_counter!(
        "relay_stale_responses_total",
        "Generation streams abandoned for a newer response id"
    );
}

pub fn set_active_sessions(count: usize) {
    gauge!("relay_active_sessions").set(count as f64);
}

pub fn set_observers(count: usize) {
    gauge!("relay_observers").set(count as f64);
}

pub fn record_session_message(interaction_type: &'static str) {
    counter!("relay_session_messages_total", "interaction_type" => interaction_type).increment(1);
}

pub fn record_protocol_fault() {
    counter!("relay_protocol_faults_total").increment(1);
}

pub fn record_broadcast(evicted: usize) {
    counter!("relay_broadcasts_total").increment(1);
    if evicted > 0 {
        counter!("relay_broadcast_evictions_total").increment(evicted as u64);
    }
}

pub fn record_webhook_event(event: &str) {
    counter!("relay_webhook_events_total", "event" => event.to_string()).increment(1);
}

pub fn record_stale_response() {
    counter!("relay_stale_responses_total").increment(1);
}
