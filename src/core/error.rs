use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Missing 'task' parameter")]
    MissingTaskParameter,

    #[error("Missing required parameter: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Access to {} is not allowed outside the data directory", .0.display())]
    PathAccessDenied(PathBuf),

    #[error("No matching operation found for the task")]
    NoMatchingOperation,

    #[error("The file or directory {} does not exist or cannot be found", .0.display())]
    NotFound(PathBuf),

    #[error("{} is a directory", .0.display())]
    IsADirectory(PathBuf),

    #[error("Failed to install dependency '{dependency}': {stderr}")]
    DependencyInstallFailed { dependency: String, stderr: String },

    #[error("Generated code failed: {stderr}")]
    GeneratedCodeExecutionFailed { stderr: String },

    #[error("LLM error: {0}")]
    UpstreamProvider(String),

    #[error("{what} timed out after {after:?}")]
    UpstreamTimeout { what: String, after: Duration },

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl DispatchError {
    /// HTTP status code this error is reported with
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::MissingTaskParameter
            | DispatchError::MissingParameters(_)
            | DispatchError::InvalidArgument { .. }
            | DispatchError::PathAccessDenied(_)
            | DispatchError::NoMatchingOperation
            | DispatchError::IsADirectory(_) => 400,
            DispatchError::NotFound(_) => 404,
            DispatchError::UpstreamTimeout { .. } => 504,
            _ => 500,
        }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        DispatchError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Attach the offending path to a raw IO error.
    ///
    /// `NotFound` becomes a 404 naming the path; everything else stays an IO error.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DispatchError::NotFound(path.into()),
            _ => DispatchError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DispatchError::MissingTaskParameter.status(), 400);
        assert_eq!(DispatchError::NoMatchingOperation.status(), 400);
        assert_eq!(
            DispatchError::PathAccessDenied(PathBuf::from("/etc/passwd")).status(),
            400
        );
        assert_eq!(DispatchError::NotFound(PathBuf::from("/data/x")).status(), 404);
        assert_eq!(
            DispatchError::DependencyInstallFailed {
                dependency: "nope".into(),
                stderr: String::new(),
            }
            .status(),
            500
        );
        assert_eq!(
            DispatchError::UpstreamTimeout {
                what: "LLM request".into(),
                after: Duration::from_secs(5),
            }
            .status(),
            504
        );
        assert_eq!(DispatchError::UpstreamProvider("boom".into()).status(), 500);
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let err = DispatchError::UpstreamTimeout {
            what: "Process 'sh'".into(),
            after: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "Process 'sh' timed out after 200ms");
    }

    #[test]
    fn test_missing_parameters_lists_every_name() {
        let err = DispatchError::MissingParameters(vec!["input".into(), "output".into()]);
        assert_eq!(err.to_string(), "Missing required parameter: input, output");
    }

    #[test]
    fn test_from_io_not_found_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = DispatchError::from_io(io, "/data/dates.txt");
        assert!(matches!(err, DispatchError::NotFound(_)));
        assert!(err.to_string().contains("/data/dates.txt"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            DispatchError::from_io(io, "/data/x"),
            DispatchError::Io(_)
        ));
    }
}
