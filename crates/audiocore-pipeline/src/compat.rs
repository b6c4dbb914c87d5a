//! Streaming-compatibility policy for `(input, output)` format pairs.
//!
//! This table is a tunable policy, not a protocol contract: entries decide
//! whether the pipeline attempts the streaming data plane or routes to the
//! buffered fallback path.

/// Result of a compatibility check for one `(input, output)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    /// Whether the streaming data plane may be used for this pair.
    pub streaming_supported: bool,
    /// Whether the fallback path is recommended even if streaming would technically work.
    pub fallback_recommended: bool,
    /// Human-readable reason, surfaced in logs.
    pub reason: &'static str,
}

/// Containers that require a seekable moov atom or page table and so cannot
/// be produced by a pure stdout pipe.
const SEEKABLE_CONTAINER_OUTPUTS: &[&str] = &["m4a", "ogg"];

/// Determine whether `(input_ext, output_ext)` can use the streaming data plane.
///
/// `input_ext` is taken for symmetry with the spec's predicate signature and
/// to leave room for input-codec-specific exceptions; the current policy
/// only keys off the output container.
#[must_use]
pub fn check(_input_ext: &str, output_ext: &str) -> Compatibility {
    let output_ext = output_ext.to_ascii_lowercase();
    if SEEKABLE_CONTAINER_OUTPUTS.contains(&output_ext.as_str()) {
        return Compatibility {
            streaming_supported: false,
            fallback_recommended: true,
            reason: "output container requires a seekable index that cannot be written to a stdout pipe",
        };
    }

    Compatibility {
        streaming_supported: true,
        fallback_recommended: false,
        reason: "container pair supports stdout streaming",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_to_flac_streams() {
        let result = check("wav", "flac");
        assert!(result.streaming_supported);
        assert!(!result.fallback_recommended);
    }

    #[test]
    fn m4a_output_forces_fallback() {
        let result = check("mp3", "m4a");
        assert!(!result.streaming_supported);
        assert!(result.fallback_recommended);
    }

    #[test]
    fn ogg_output_forces_fallback() {
        let result = check("wav", "ogg");
        assert!(!result.streaming_supported);
    }
}
