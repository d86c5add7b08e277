pub mod logging;
pub mod max_concurrency;
pub mod password_input;
