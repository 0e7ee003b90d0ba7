//! Connection stages and retry backoff

/// Connection stages in execution order
///
/// Ordering is meaningful: falling back to an earlier stage is always
/// `stage = min(stage, target)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Start associating with the wireless network
    NetworkConnect,
    /// Wait for the association
    NetworkAwait,
    /// Open the socket to the server
    SocketConnect,
    /// Wait for the socket
    SocketAwait,
    /// Write the HTTP upgrade request
    HandshakeSend,
    /// Match `HTTP/1.1 101`
    StatusLineRead,
    /// Validate upgrade headers up to the blank line
    HeaderRead,
    /// Send the project credentials
    AuthSend,
    /// First byte of the server's frame
    AuthOpcodeRead,
    /// Payload length of the server's frame
    AuthLengthRead,
    /// Scan the payload for the success marker
    AuthPayloadRead,
    /// Compute speed mapping from stored settings
    DeriveCalibration,
    /// Connected and authenticated
    Steady,
}

impl Stage {
    /// The stage that follows this one
    pub fn next(self) -> Self {
        use Stage::*;
        match self {
            NetworkConnect => NetworkAwait,
            NetworkAwait => SocketConnect,
            SocketConnect => SocketAwait,
            SocketAwait => HandshakeSend,
            HandshakeSend => StatusLineRead,
            StatusLineRead => HeaderRead,
            HeaderRead => AuthSend,
            AuthSend => AuthOpcodeRead,
            AuthOpcodeRead => AuthLengthRead,
            AuthLengthRead => AuthPayloadRead,
            AuthPayloadRead => DeriveCalibration,
            DeriveCalibration => Steady,
            Steady => Steady,
        }
    }
}

/// Anything whose progress can be pulled back to an earlier stage
pub trait Rewind {
    /// Fall back to `target` if currently past it
    fn rewind_to(&mut self, target: Stage);
}

impl Rewind for Stage {
    fn rewind_to(&mut self, target: Stage) {
        if *self > target {
            *self = target;
        }
    }
}

/// Which failure a backoff is delaying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackoffKind {
    /// Network association failed; retry from the start
    NetworkFailed,
    /// Socket, handshake or authentication failed; keep the network
    SocketFailed,
}

impl BackoffKind {
    /// Stage retried once the backoff expires
    pub fn resume_stage(self) -> Stage {
        match self {
            BackoffKind::NetworkFailed => Stage::NetworkConnect,
            BackoffKind::SocketFailed => Stage::SocketConnect,
        }
    }
}

/// A pending retry delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    pub kind: BackoffKind,
    /// Retry is allowed once the clock reaches this second
    pub until: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_walks_every_stage_in_order() {
        let mut stage = Stage::NetworkConnect;
        let mut count = 1;
        while stage != Stage::Steady {
            let next = stage.next();
            assert!(next > stage);
            stage = next;
            count += 1;
        }
        assert_eq!(count, 13);
        assert_eq!(Stage::Steady.next(), Stage::Steady);
    }

    #[test]
    fn test_rewind_only_moves_backwards() {
        let mut stage = Stage::Steady;
        stage.rewind_to(Stage::SocketConnect);
        assert_eq!(stage, Stage::SocketConnect);

        stage.rewind_to(Stage::DeriveCalibration);
        assert_eq!(stage, Stage::SocketConnect);

        stage.rewind_to(Stage::NetworkConnect);
        assert_eq!(stage, Stage::NetworkConnect);
    }

    #[test]
    fn test_backoff_resume_stages() {
        assert_eq!(
            BackoffKind::NetworkFailed.resume_stage(),
            Stage::NetworkConnect
        );
        assert_eq!(BackoffKind::SocketFailed.resume_stage(), Stage::SocketConnect);
    }
}
