use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum KeepAliveError {
    /// The host exposes no audio-processing capability at all.
    AudioUnavailable,
    AudioSetup(String),
    Schedule(String),
    WorkerLaunch(String),
    InvalidConfig(String),
    AlreadyRunning,
}

impl KeepAliveError {
    /// Errors the service absorbs instead of returning to the caller.
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            KeepAliveError::AudioUnavailable | KeepAliveError::AudioSetup(_)
        )
    }
}

impl fmt::Display for KeepAliveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepAliveError::AudioUnavailable => {
                write!(f, "audio context is not supported by this host")
            }
            KeepAliveError::AudioSetup(detail) => write!(f, "audio setup failed: {detail}"),
            KeepAliveError::Schedule(detail) => {
                write!(f, "could not schedule periodic task: {detail}")
            }
            KeepAliveError::WorkerLaunch(detail) => write!(f, "worker launch failed: {detail}"),
            KeepAliveError::InvalidConfig(detail) => write!(f, "invalid configuration: {detail}"),
            KeepAliveError::AlreadyRunning => write!(f, "keep-alive is already running"),
        }
    }
}

impl std::error::Error for KeepAliveError {}
