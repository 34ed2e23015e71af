//! Secret reference resolver.
//!
//! Values in `config.toml` (currently the export token) can point at a secret
//! stored outside the file:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: `$VAR_NAME` from the environment
//! - anything else: used as-is

use std::process::ExitStatus;

use thiserror::Error;

const PASS_PREFIX: &str = "pass::";
const ENV_PREFIX: &str = "env::";

/// A secret reference that could not be resolved.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to run `pass show {path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`pass show {path}` failed ({status}): {stderr}")]
    Pass {
        path: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`pass show {path}` produced no output")]
    Empty { path: String },

    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),
}

/// Returns true if the value is a reference rather than the secret itself.
pub fn is_reference(value: &str) -> bool {
    value.starts_with(PASS_PREFIX) || value.starts_with(ENV_PREFIX)
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    if let Some(path) = value.strip_prefix(PASS_PREFIX) {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix(ENV_PREFIX) {
        std::env::var(var).map_err(|_| SecretError::MissingEnv(var.to_string()))
    } else {
        Ok(value.to_string())
    }
}

/// Runs `pass show <path>` and returns the first line of stdout.
fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|source| SecretError::Spawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::Pass {
            path: path.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| SecretError::Empty {
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("hello").unwrap(), "hello");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("hello"));
    }

    #[test]
    fn env_prefix_resolves() {
        unsafe {
            std::env::set_var("_CALIMPORT_TEST_TOKEN", "my-token");
        }
        assert!(is_reference("env::_CALIMPORT_TEST_TOKEN"));
        assert_eq!(resolve("env::_CALIMPORT_TEST_TOKEN").unwrap(), "my-token");
        unsafe {
            std::env::remove_var("_CALIMPORT_TEST_TOKEN");
        }
    }

    #[test]
    fn env_prefix_missing_var_errors() {
        let err = resolve("env::_CALIMPORT_NONEXISTENT_VAR_12345").unwrap_err();
        assert!(matches!(err, SecretError::MissingEnv(_)));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn pass_prefix_errors_for_unknown_entry() {
        // Fails whether or not `pass` is installed.
        assert!(is_reference("pass::nonexistent/entry"));
        assert!(resolve("pass::nonexistent/entry/that/should/not/exist/12345").is_err());
    }
}
