/// Operator input validation
///
/// Angles typed by the operator are parsed and clamped. Pin maps are parsed
/// and checked against the Arduino Mega's usable PWM/digital ranges.

use std::collections::BTreeSet;
use std::num::IntErrorKind;
use std::ops::RangeInclusive;

use crate::error::ValidationError;
use crate::protocol::{clamp_angle, NUM_SERVOS};

/// Pins usable for servos on an Arduino Mega: 2–13 or 22–53.
pub const MEGA_PIN_RANGES: [RangeInclusive<i64>; 2] = [2..=13, 22..=53];

pub fn is_valid_mega_pin(pin: i64) -> bool {
    MEGA_PIN_RANGES.iter().any(|r| r.contains(&pin))
}

/// Parse an angle entry and clamp it into [0, 180].
///
/// Integers too large for `i64` still clamp to the nearest bound.
pub fn parse_angle(input: &str) -> Result<i32, ValidationError> {
    match input.trim().parse::<i64>() {
        Ok(v) => Ok(clamp_angle(v)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(clamp_angle(i64::MAX)),
            IntErrorKind::NegOverflow => Ok(clamp_angle(i64::MIN)),
            _ => Err(ValidationError::InvalidAngle { input: input.to_string() }),
        },
    }
}

/// Validate the seven pin fields, in servo order.
///
/// Checks run in order: every field is an integer, no two are equal, every
/// pin is in range. The first failing check is reported.
pub fn validate_pins<S: AsRef<str>>(fields: &[S]) -> Result<[u8; NUM_SERVOS], ValidationError> {
    let mut pins = [0i64; NUM_SERVOS];
    for (i, field) in fields.iter().take(NUM_SERVOS).enumerate() {
        let text = field.as_ref();
        pins[i] = text.trim().parse::<i64>().map_err(|_| ValidationError::InvalidPin {
            servo: i + 1,
            input: text.to_string(),
        })?;
    }
    if fields.len() < NUM_SERVOS {
        return Err(ValidationError::InvalidPin { servo: fields.len() + 1, input: String::new() });
    }

    let mut seen = BTreeSet::new();
    let duplicates: BTreeSet<i64> = pins.iter().copied().filter(|p| !seen.insert(*p)).collect();
    if !duplicates.is_empty() {
        return Err(ValidationError::DuplicatePins(duplicates.into_iter().collect()));
    }

    let invalid: Vec<i64> = pins.iter().copied().filter(|p| !is_valid_mega_pin(*p)).collect();
    if !invalid.is_empty() {
        return Err(ValidationError::PinOutOfRange(invalid));
    }

    // Every pin is within 2..=53 here
    Ok(pins.map(|p| p as u8))
}
