use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("bedrock_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("bedrock_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("bedrock_chat.client.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("bedrock_chat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("bedrock_chat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("bedrock_chat.stream.bytes");

pub(crate) static EXCHANGES_COMPLETED: Counter =
    Counter::new("bedrock_chat.session.exchanges_completed");
pub(crate) static EXCHANGES_FAILED: Counter =
    Counter::new("bedrock_chat.session.exchanges_failed");
pub(crate) static EXCHANGE_DURATION: Moments =
    Moments::new("bedrock_chat.session.exchange_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&EXCHANGES_COMPLETED);
    collector.register_counter(&EXCHANGES_FAILED);
    collector.register_moments(&EXCHANGE_DURATION);
}

/// Current value of every counter, by name.
pub fn counter_readings() -> Vec<(&'static str, u64)> {
    vec![
        ("bedrock_chat.client.requests", CLIENT_REQUESTS.read()),
        ("bedrock_chat.client.request_errors", CLIENT_REQUEST_ERRORS.read()),
        ("bedrock_chat.stream.fragments", STREAM_FRAGMENTS.read()),
        ("bedrock_chat.stream.errors", STREAM_ERRORS.read()),
        ("bedrock_chat.stream.bytes", STREAM_BYTES.read()),
        ("bedrock_chat.session.exchanges_completed", EXCHANGES_COMPLETED.read()),
        ("bedrock_chat.session.exchanges_failed", EXCHANGES_FAILED.read()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_count() {
        register_biometrics(Collector::new());
        let before = STREAM_FRAGMENTS.read();
        STREAM_FRAGMENTS.click();
        assert!(STREAM_FRAGMENTS.read() > before);
    }

    #[test]
    fn readings_cover_every_counter() {
        EXCHANGES_FAILED.click();
        let readings = counter_readings();
        assert_eq!(readings.len(), 7);
        let failed = readings
            .iter()
            .find(|(name, _)| *name == "bedrock_chat.session.exchanges_failed")
            .unwrap();
        assert!(failed.1 >= 1);
    }
}
