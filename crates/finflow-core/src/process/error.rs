//! Process errors

use thiserror::Error;

/// Errors starting or running a service
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started at all (missing executable, permissions)
    #[error("Failed to launch {service} ({program}): {source}")]
    Launch {
        service: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully
    #[error("{service} exited with {}{}", describe_code(.exit_code), describe_tail(.stderr_tail))]
    Exit {
        service: String,
        /// `None` when the process was terminated by a signal
        exit_code: Option<i32>,
        /// Last lines the process wrote to stderr
        stderr_tail: Vec<String>,
    },

    #[error("IO error while supervising {service}: {source}")]
    Io {
        service: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Exit { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

fn describe_tail(tail: &[String]) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(":\n{}", tail.join("\n"))
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_error_message() {
        let err = ProcessError::Exit {
            service: "backend".to_string(),
            exit_code: Some(2),
            stderr_tail: vec!["docker not running".to_string()],
        };
        assert_eq!(err.to_string(), "backend exited with code 2:\ndocker not running");
        assert_eq!(err.exit_code(), Some(2));

        let signalled = ProcessError::Exit {
            service: "frontend".to_string(),
            exit_code: None,
            stderr_tail: vec![],
        };
        assert_eq!(signalled.to_string(), "frontend exited with a signal");
    }
}
