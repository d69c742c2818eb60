use biometrics::{Collector, Counter, Moments};

pub(crate) static EXCHANGE_REQUESTS: Counter = Counter::new("parlor.exchange.requests");
pub(crate) static EXCHANGE_ERRORS: Counter = Counter::new("parlor.exchange.errors");
pub(crate) static EXCHANGE_EMPTY_REPLIES: Counter = Counter::new("parlor.exchange.empty_replies");
pub(crate) static EXCHANGE_DURATION: Moments =
    Moments::new("parlor.exchange.duration_seconds");

pub(crate) static SUBMIT_IGNORED: Counter = Counter::new("parlor.submit.ignored");
pub(crate) static SUBMIT_BUSY: Counter = Counter::new("parlor.submit.busy");

pub(crate) static IDENTITY_CREATED: Counter = Counter::new("parlor.identity.created");
pub(crate) static IDENTITY_FALLBACKS: Counter = Counter::new("parlor.identity.fallbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&EXCHANGE_REQUESTS);
    collector.register_counter(&EXCHANGE_ERRORS);
    collector.register_counter(&EXCHANGE_EMPTY_REPLIES);
    collector.register_moments(&EXCHANGE_DURATION);

    collector.register_counter(&SUBMIT_IGNORED);
    collector.register_counter(&SUBMIT_BUSY);

    collector.register_counter(&IDENTITY_CREATED);
    collector.register_counter(&IDENTITY_FALLBACKS);
}
