pub mod retry;

pub use retry::{do_with_tries, FixedRetry};
