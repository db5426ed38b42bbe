mod http;

pub use http::{ApiClient, ApiClientError};
