//! Session lifecycle states.

/// Lifecycle of the connection to the camera driver.
///
/// ```text
/// Uninitialized ─open─▶ Initializing ─ok──▶ Ready ─close─▶ Released
///                            └──────err──▶ Failed
/// ```
///
/// `Failed` and `Released` sessions may be opened again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Never opened.
    #[default]
    Uninitialized,
    /// `open` is talking to the driver.
    Initializing,
    /// Open and usable.
    Ready,
    /// The last `open` failed.
    Failed,
    /// Closed after being ready.
    Released,
}

impl SessionState {
    /// Returns true if operations other than open/close are allowed.
    #[inline]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    /// Returns true if `open` may be attempted from this state.
    pub fn can_open(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Failed | Self::Released)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_open() {
        assert!(SessionState::Uninitialized.can_open());
        assert!(SessionState::Failed.can_open());
        assert!(SessionState::Released.can_open());
        assert!(!SessionState::Initializing.can_open());
        assert!(!SessionState::Ready.can_open());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(SessionState::default().to_string(), "uninitialized");
    }
}
