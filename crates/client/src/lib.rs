pub mod statuses;

pub use statuses::{StatusClient, StatusClientError};
