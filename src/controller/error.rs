//! Controller error types

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The resource spec cannot be turned into a workload. Retried with
    /// backoff so a corrected spec is picked up.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("missing {0} on resource")]
    MissingObjectKey(&'static str),
}

impl Error {
    /// Short label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::Kube(_) => "kube_error",
            Error::Configuration(_) => "configuration_error",
            Error::MissingObjectKey(_) => "missing_key",
        }
    }
}
