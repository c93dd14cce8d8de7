use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("multichat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("multichat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("multichat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("multichat.stream.events");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("multichat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("multichat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("multichat.stream.bytes");
pub(crate) static STREAM_ABORTS: Counter = Counter::new("multichat.stream.aborts");
pub(crate) static STREAM_DURATION: Moments = Moments::new("multichat.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("multichat.session.turns");
pub(crate) static SESSION_CONFIGURATION_ERRORS: Counter =
    Counter::new("multichat.session.configuration_errors");
pub(crate) static SESSION_MODEL_SWITCHES: Counter = Counter::new("multichat.session.model_switches");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_ABORTS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_CONFIGURATION_ERRORS);
    collector.register_counter(&SESSION_MODEL_SWITCHES);
}
