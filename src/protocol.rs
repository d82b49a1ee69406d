/// Servo firmware text protocol
///
/// Newline-delimited ASCII commands sent to the board, and recognition of the
/// one structured line the firmware sends back (the pin map report).

use std::fmt;

pub const NUM_SERVOS: usize = 7;

pub const ANGLE_MIN: i64 = 0;
pub const ANGLE_MAX: i64 = 180;
pub const HOME_ANGLE: i32 = 90;

pub const PINMAP_PREFIX: &str = "PINMAP:";

/// Clamp any integer to the servo range. Out-of-range input is never rejected.
pub fn clamp_angle(angle: i64) -> i32 {
    angle.clamp(ANGLE_MIN, ANGLE_MAX) as i32
}

/// Outgoing command. Servo indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetAngle { servo: usize, angle: i32 },
    Home { servo: usize },
    HomeAll,
    PinMap([u8; NUM_SERVOS]),
    GetPinMap,
}

impl Command {
    pub fn set_angle(servo: usize, angle: i64) -> Self {
        Command::SetAngle { servo, angle: clamp_angle(angle) }
    }

    /// Wire text without the trailing newline.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Clamp again so a hand-built SetAngle can't leave the range on the wire
            Command::SetAngle { servo, angle } => {
                write!(f, "S{}:{}", servo, clamp_angle(i64::from(*angle)))
            }
            Command::Home { servo } => write!(f, "HOME{}", servo),
            Command::HomeAll => f.write_str("HOMEALL"),
            Command::PinMap(pins) => {
                f.write_str(PINMAP_PREFIX)?;
                for (i, pin) in pins.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", pin)?;
                }
                Ok(())
            }
            Command::GetPinMap => f.write_str("GETPINMAP"),
        }
    }
}

/// Recognise a `PINMAP:` report from the firmware.
///
/// Returns the trimmed field text in servo order only when the report carries
/// exactly one field per servo. Anything else is `None` and the line is only
/// logged by the caller.
pub fn parse_pin_report(line: &str) -> Option<[String; NUM_SERVOS]> {
    let body = line.strip_prefix(PINMAP_PREFIX)?;
    let fields: Vec<String> = body.split(',').map(|p| p.trim().to_string()).collect();
    <[String; NUM_SERVOS]>::try_from(fields).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_commands() {
        assert_eq!(Command::set_angle(3, 45).encode(), "S3:45");
        assert_eq!(Command::Home { servo: 7 }.encode(), "HOME7");
        assert_eq!(Command::HomeAll.encode(), "HOMEALL");
        assert_eq!(
            Command::PinMap([22, 23, 24, 25, 26, 27, 28]).encode(),
            "PINMAP:22,23,24,25,26,27,28"
        );
        assert_eq!(Command::GetPinMap.encode(), "GETPINMAP");
    }

    #[test]
    fn test_angles_are_clamped() {
        assert_eq!(Command::set_angle(1, -40).encode(), "S1:0");
        assert_eq!(Command::set_angle(1, 999).encode(), "S1:180");
        assert_eq!(Command::set_angle(1, i64::MAX).encode(), "S1:180");
        // Built directly, bypassing set_angle
        assert_eq!(Command::SetAngle { servo: 2, angle: 500 }.encode(), "S2:180");
    }

    #[test]
    fn test_pin_report_with_seven_fields() {
        let pins = parse_pin_report("PINMAP:2,3,4,5,6,7,8").expect("seven fields");
        assert_eq!(pins, ["2", "3", "4", "5", "6", "7", "8"].map(String::from));
    }

    #[test]
    fn test_pin_report_fields_are_trimmed() {
        let pins = parse_pin_report("PINMAP: 22, 23,24 ,25,26,27,28").expect("seven fields");
        assert_eq!(pins[0], "22");
        assert_eq!(pins[2], "24");
    }

    #[test]
    fn test_pin_report_wrong_count_ignored() {
        assert!(parse_pin_report("PINMAP:2,3,4").is_none());
        assert!(parse_pin_report("PINMAP:1,2,3,4,5,6,7,8").is_none());
        assert!(parse_pin_report("PINMAP:").is_none());
    }

    #[test]
    fn test_other_lines_are_not_reports() {
        assert!(parse_pin_report("READY").is_none());
        assert!(parse_pin_report("GETPINMAP").is_none());
    }
}
