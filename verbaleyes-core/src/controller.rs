//! One iteration of the device main loop

use crate::connection::{ConnectionStateMachine, Progress};
use crate::parser::ConfigParser;
use crate::speed::{OffsetButton, SpeedMapper};
use crate::timing::Timing;
use verbaleyes_hal::Host;

/// Outcome of [`Controller::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// A configuration update is open; the connection is paused
    Configuring,
    /// Connection progress of this iteration
    Link(Progress),
}

/// Owns the parser, the connection and the telemetry state
///
/// The board runs `poll` in a loop, passing at most one configuration
/// character, the latest speed sample and the button level each time.
#[derive(Debug, Clone)]
pub struct Controller {
    parser: ConfigParser,
    link: ConnectionStateMachine,
    speed: SpeedMapper,
    button: OffsetButton,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

impl Controller {
    pub fn new(timing: Timing) -> Self {
        Self {
            parser: ConfigParser::new(&timing),
            link: ConnectionStateMachine::new(&timing),
            speed: SpeedMapper::new(),
            button: OffsetButton::new(),
        }
    }

    pub fn poll<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        input: Option<u8>,
        sample: u16,
        button_pressed: bool,
    ) -> Status {
        if self.parser.feed(host, &mut self.link, input) {
            return Status::Configuring;
        }

        let progress = self.link.step(host);
        if progress == Progress::Connected {
            if let Some(calibration) = self.link.calibration() {
                self.speed.update(host, calibration, sample);
            }
            self.button.update(host, button_pressed);
        }
        Status::Link(progress)
    }

    pub fn connection(&self) -> &ConnectionStateMachine {
        &self.link
    }

    pub fn speed(&self) -> &SpeedMapper {
        &self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{read_text, FieldId};
    use crate::connection::Stage;
    use crate::mock::{server_frame, unmask_client_frame, MockHost, Reply};

    const AUTH_OK: &[u8] = br#"{"authed":true}"#;

    fn type_config(controller: &mut Controller, host: &mut MockHost, text: &str) -> Status {
        let mut status = Status::Link(Progress::Working);
        for byte in text.bytes() {
            status = controller.poll(host, Some(byte), 0, false);
        }
        status
    }

    /// Type `text` and let the connection run once the update is closed
    fn configure(controller: &mut Controller, host: &mut MockHost, text: &str) -> Status {
        type_config(controller, host, text);
        controller.poll(host, None, 0, false)
    }

    fn with_server(host: &mut MockHost) {
        host.replies.push_back(Reply::Upgrade(""));
        host.replies.push_back(Reply::Bytes(server_frame(AUTH_OK)));
    }

    #[test]
    fn test_connection_paused_while_configuring() {
        let mut host = MockHost::configured();
        with_server(&mut host);
        let mut controller = Controller::default();

        assert_eq!(
            type_config(&mut controller, &mut host, "proj=demo\n"),
            Status::Configuring
        );
        assert_eq!(controller.poll(&mut host, None, 0, false), Status::Configuring);
        assert!(host.associations.is_empty());

        // The blank line commits; the connection resumes on the next poll
        assert_eq!(controller.poll(&mut host, Some(b'\n'), 0, false), Status::Configuring);
        assert_eq!(host.commits, 1);
        assert_eq!(
            controller.poll(&mut host, None, 0, false),
            Status::Link(Progress::Connected)
        );
        assert_eq!(read_text(&mut host, FieldId::Proj).as_str(), "demo");

        let auth = unmask_client_frame(&host.sent[1]);
        assert_eq!(
            auth,
            br#"{"_core": {"auth": {"id": "demo", "key": "fff"}}}"#.to_vec()
        );
    }

    #[test]
    fn test_steady_reports_speed_and_offset() {
        let mut host = MockHost::configured();
        with_server(&mut host);
        let mut controller = Controller::default();
        configure(
            &mut controller,
            &mut host,
            "speedmin=0\nspeedmax=100\ndeadzone=0\ncallow=0\ncalhigh=1000\nsensitivity=0\n\n",
        );
        assert_eq!(controller.connection().stage(), Stage::Steady);
        let sent = host.sent.len();

        assert_eq!(
            controller.poll(&mut host, None, 250, false),
            Status::Link(Progress::Connected)
        );
        assert_eq!(controller.speed().last().0, 2500);
        assert_eq!(
            unmask_client_frame(&host.sent[sent]),
            br#"{"_core": {"doc": {"speed": 25.00}}}"#.to_vec()
        );

        controller.poll(&mut host, None, 250, true);
        assert_eq!(host.sent.len(), sent + 2);
        assert!(host.log.ends_with("\r\nScroll position has been set to: 0"));
    }

    #[test]
    fn test_calibration_change_reapplied_without_reconnect() {
        let mut host = MockHost::configured();
        with_server(&mut host);
        let mut controller = Controller::default();
        configure(&mut controller, &mut host, "deadzone=0\nspeedmin=0\n\n");
        assert_eq!(controller.connection().stage(), Stage::Steady);
        let opens = host.opens.len();

        type_config(&mut controller, &mut host, "speedmax=50\n");
        assert_eq!(controller.connection().stage(), Stage::DeriveCalibration);
        configure(&mut controller, &mut host, "\n");

        assert_eq!(controller.connection().stage(), Stage::Steady);
        assert_eq!(host.opens.len(), opens);
        assert!(host.log.contains("\r\n\tMaximum speed at: 50\r\n"));
    }

    #[test]
    fn test_no_telemetry_before_connected() {
        let mut host = MockHost::configured();
        let mut controller = Controller::default();

        assert_eq!(
            controller.poll(&mut host, None, 700, true),
            Status::Link(Progress::Working)
        );
        controller.poll(&mut host, None, 700, false);
        controller.poll(&mut host, None, 700, true);
        // Only the upgrade request went out
        assert_eq!(host.sent.len(), 1);
    }
}
