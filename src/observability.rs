use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatter.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatter.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatter.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("chatter.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatter.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatter.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("chatter.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatter.stream.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);
}
