//! Test fixtures and environment helpers.

use std::path::Path;
use std::process::Command;

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn docker_available() -> bool {
    docker_available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn docker_available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

/// A synthetic job identifier suitable for fixtures that don't care about
/// uniqueness guarantees beyond "doesn't collide within one test run".
#[must_use]
pub fn sample_job_id(label: &str) -> String {
    format!("test-job-{label}")
}

/// A small WAV-like byte buffer used to exercise storage and pipeline paths
/// without shipping a real audio fixture. Not a valid WAV file; callers that
/// need real codec behaviour should supply their own fixture bytes.
#[must_use]
pub fn sample_audio_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_available_respects_unix_socket_env() {
        assert!(!docker_available_with_host(Some(
            "unix:///definitely/missing.sock".into()
        )));
    }

    #[test]
    fn docker_available_accepts_tcp_env() {
        assert!(docker_available_with_host(Some(
            "tcp://127.0.0.1:2375".into()
        )));
    }

    #[test]
    fn docker_available_obeys_env_value() {
        let env_value = std::env::var("DOCKER_HOST").ok();
        let expected = docker_available_with_host(env_value);
        assert_eq!(docker_available(), expected);
    }

    #[test]
    fn sample_job_id_embeds_the_label() {
        assert_eq!(sample_job_id("abc"), "test-job-abc");
    }

    #[test]
    fn sample_audio_bytes_has_the_requested_length() {
        assert_eq!(sample_audio_bytes(128).len(), 128);
    }
}
