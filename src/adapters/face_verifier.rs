//! Subprocess adapter for the external face verifier.
//!
//! The verifier is an opaque script invoked with the tag id as its only
//! argument. Success requires both a clean exit and the literal
//! `VERIFIED` marker on stdout; stderr is logged for diagnostics but
//! never parsed for control decisions. Every process-level failure
//! (spawn error, bad exit, missing marker, timeout) reduces to `false`
//! per the [`TagVerifier`] contract, so the orchestrator never sees an
//! error from this path.

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::config::VerifierConfig;
use crate::ports::TagVerifier;

/// Literal the verifier prints on a positive verification.
const SUCCESS_MARKER: &str = "VERIFIED";

/// Runs the configured verifier script once per request.
pub struct FaceVerifier {
    config: VerifierConfig,
}

impl FaceVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TagVerifier for FaceVerifier {
    async fn verify(&self, tag_id: &str) -> bool {
        let mut command = Command::new(&self.config.interpreter);
        command
            .arg(&self.config.script)
            .arg(tag_id)
            // If the wait below times out and the future is dropped, the
            // child must die with it rather than run unattended.
            .kill_on_drop(true);

        debug!(
            tag_id,
            interpreter = %self.config.interpreter,
            script = %self.config.script,
            "spawning verifier"
        );

        let output = match timeout(self.config.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                warn!(tag_id, %error, "failed to run verifier process");
                return false;
            }
            Err(_) => {
                warn!(
                    tag_id,
                    timeout_secs = self.config.timeout.as_secs(),
                    "verifier timed out, killing process"
                );
                return false;
            }
        };

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(tag_id, "verifier stderr: {line}");
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(tag_id, "verifier stdout: {}", stdout.trim());

        let verified = output.status.success() && stdout.contains(SUCCESS_MARKER);
        info!(
            tag_id,
            exit = ?output.status.code(),
            verified,
            "verifier finished"
        );
        verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    /// Write a shell script and return config pointing at it.
    fn script_config(dir: &tempfile::TempDir, body: &str, timeout: Duration) -> VerifierConfig {
        let path = dir.path().join("verify.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{body}").unwrap();
        VerifierConfig {
            interpreter: "/bin/sh".to_string(),
            script: path.to_string_lossy().into_owned(),
            timeout,
        }
    }

    #[tokio::test]
    async fn test_clean_exit_with_marker_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(&dir, "echo VERIFIED", Duration::from_secs(5));
        assert!(FaceVerifier::new(config).verify("TAG001").await);
    }

    #[tokio::test]
    async fn test_marker_without_clean_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(&dir, "echo VERIFIED; exit 1", Duration::from_secs(5));
        assert!(!FaceVerifier::new(config).verify("TAG001").await);
    }

    #[tokio::test]
    async fn test_clean_exit_without_marker_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(&dir, "echo NOT_RECOGNIZED", Duration::from_secs(5));
        assert!(!FaceVerifier::new(config).verify("TAG001").await);
    }

    #[tokio::test]
    async fn test_stderr_output_does_not_verify() {
        // The marker on stderr must not count; only stdout is consulted.
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(&dir, "echo VERIFIED 1>&2", Duration::from_secs(5));
        assert!(!FaceVerifier::new(config).verify("TAG001").await);
    }

    #[tokio::test]
    async fn test_spawn_failure_reduces_to_false() {
        let config = VerifierConfig {
            interpreter: "/nonexistent/interpreter".to_string(),
            script: "verify.py".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(!FaceVerifier::new(config).verify("TAG001").await);
    }

    #[tokio::test]
    async fn test_hung_verifier_is_killed_at_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(&dir, "sleep 30; echo VERIFIED", Duration::from_millis(200));

        let started = Instant::now();
        let verified = FaceVerifier::new(config).verify("TAG001").await;

        assert!(!verified);
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "verify must return at the timeout, not wait for the child"
        );
    }

    #[tokio::test]
    async fn test_tag_id_reaches_the_script() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_config(
            &dir,
            r#"if [ "$1" = "TAG007" ]; then echo VERIFIED; fi"#,
            Duration::from_secs(5),
        );
        let verifier = FaceVerifier::new(config);
        assert!(verifier.verify("TAG007").await);
        assert!(!verifier.verify("TAG008").await);
    }
}
