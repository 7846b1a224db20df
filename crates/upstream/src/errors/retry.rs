/// Classification for retry policy.
///
/// Used by the callers that own a circuit breaker to decide whether an
/// upstream failure should count against it.
///
/// # Behavior Summary
///
/// | Class | Retry later? | Record Circuit Breaker Failure? |
/// |-------|--------------|--------------------------------|
/// | `Never` | No | No |
/// | `WithPenalty` | Yes | Yes (affects future requests) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the failure is local (closed permit gate, bad rate value)
    /// and says nothing about the health of the upstream.
    Never,

    /// Transient upstream failure: 5xx, 429, transport error, timeout or an
    /// unreadable body. The failure is recorded in the circuit breaker, which
    /// may short-circuit future calls once failures accumulate.
    WithPenalty,
}
