// End-to-end tests for the synthesis pipeline
//
// Every test gets its own engine wired to a scripted synthesizer and an
// in-memory audio store through the test-context lifecycle hooks, so tests
// run in parallel without sharing queue or credential state.

mod test_cancellation;
mod test_credentials;
mod test_reconstruction;
