//! Shared error kinds for hosted-model calls.
//!
//! Embedding and generation are the only unbounded-latency operations in
//! the pipeline, so their failures carry a distinct kind per failure mode:
//! timeout, an error response from the API, or a connection failure.

/// Failure of a hosted embedding or generation call.
#[derive(Debug)]
pub enum ServiceError {
    /// The call exceeded its configured deadline.
    Timeout {
        service: &'static str,
        secs: u64,
    },
    /// The backend returned an error response.
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },
    /// The backend could not be reached.
    Connect {
        service: &'static str,
        message: String,
    },
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Timeout { service, secs } => {
                write!(f, "{} call timed out after {}s", service, secs)
            }
            ServiceError::Api {
                service,
                status,
                message,
            } => write!(f, "{} API error {}: {}", service, status, message),
            ServiceError::Connect { service, message } => {
                write!(f, "{} unreachable: {}", service, message)
            }
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Classify a reqwest transport error against the configured deadline.
    pub fn from_request(service: &'static str, timeout_secs: u64, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout {
                service,
                secs: timeout_secs,
            }
        } else {
            ServiceError::Connect {
                service,
                message: err.to_string(),
            }
        }
    }

    /// Whether a retry could plausibly succeed: rate limits, server errors,
    /// and transport failures. Client errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Timeout { .. } | ServiceError::Connect { .. } => true,
            ServiceError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
