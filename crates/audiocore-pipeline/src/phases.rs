//! The pipeline's fixed phase plan: entry floor progress and stage text.

/// One step of the conversion pipeline's phase plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading the input blob from the storage gateway has begun.
    CreateSourceStream,
    /// The transcoder subprocess has been spawned.
    SpawnTool,
    /// Stdin/stdout/stderr plumbing is being wired up.
    WirePipeline,
    /// The source and sink streams are being connected to the subprocess.
    ConnectStreams,
    /// Parser-driven streaming is underway; entry floor only, the parser
    /// drives progress within `40..=95` from here.
    Streaming,
    /// The first output bytes have been observed from the subprocess.
    OutputBytesObserved,
    /// The multipart upload of the output has begun.
    UploadStarted,
    /// Finalising the output's recorded size.
    FinaliseSize,
    /// The job has reached its terminal success state.
    Done,
}

impl Phase {
    /// Progress percentage at which this phase is entered.
    #[must_use]
    pub const fn floor(self) -> i8 {
        match self {
            Self::CreateSourceStream => 5,
            Self::SpawnTool => 15,
            Self::WirePipeline => 25,
            Self::ConnectStreams => 35,
            Self::Streaming => 40,
            Self::OutputBytesObserved => 50,
            Self::UploadStarted => 70,
            Self::FinaliseSize => 98,
            Self::Done => 100,
        }
    }

    /// Human-readable stage label published in the `ProgressRecord`.
    #[must_use]
    pub const fn stage(self) -> &'static str {
        match self {
            Self::CreateSourceStream => "creating source stream",
            Self::SpawnTool => "starting transcoder",
            Self::WirePipeline => "setting up streaming pipeline",
            Self::ConnectStreams => "connecting streaming pipeline",
            Self::Streaming => "streaming conversion in progress",
            Self::OutputBytesObserved => "processing audio stream",
            Self::UploadStarted => "uploading to object store",
            Self::FinaliseSize => "finalising",
            Self::Done => "completed",
        }
    }
}

/// Upper bound of the parser-driven streaming range.
pub const STREAMING_CEILING: i8 = 95;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_floors_are_non_decreasing_in_declaration_order() {
        let phases = [
            Phase::CreateSourceStream,
            Phase::SpawnTool,
            Phase::WirePipeline,
            Phase::ConnectStreams,
            Phase::Streaming,
            Phase::OutputBytesObserved,
            Phase::UploadStarted,
            Phase::FinaliseSize,
            Phase::Done,
        ];
        for window in phases.windows(2) {
            assert!(window[0].floor() <= window[1].floor(), "{window:?} floors must be non-decreasing");
        }
    }

    #[test]
    fn done_reaches_100_with_the_completed_stage() {
        assert_eq!(Phase::Done.floor(), 100);
        assert_eq!(Phase::Done.stage(), "completed");
    }
}
