//! Servo panel controller.
//!
//! `ServoPanel` owns the per-servo state, the operator log, the connection and
//! the inbound line queue. The GUI reads this state and calls the operations
//! below; nothing else mutates it. Every operation updates local state first
//! and then encodes and sends the matching command.
//!
//! Sending while disconnected is not an error: local state still changes and
//! the log records `! Not connected`. Failed writes are also log lines. Only
//! validation and connection failures come back as `Err` for the GUI to show.

use std::io::{Read, Write};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, info};

use crate::config_loader::SerialSettings;
use crate::error::{PanelError, ValidationError};
use crate::protocol::{clamp_angle, parse_pin_report, Command, HOME_ANGLE, NUM_SERVOS};
use crate::transport::{Connection, ConnectionState};
use crate::validation::{parse_angle, validate_pins};

/// Angle presets offered per servo.
pub const ANGLE_PRESETS: [i32; 5] = [0, 45, 90, 135, 180];

/// Default pin for servo 1; the rest follow consecutively.
pub const FIRST_DEFAULT_PIN: usize = 22;

/// View model for one servo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoSlot {
    /// 1-based, fixed for the life of the slot.
    pub index: usize,
    /// Last angle set locally (slider, entry, preset or group op).
    pub angle: i32,
    pub angle_input: String,
    pub pin_input: String,
    pub selected: bool,
}

impl ServoSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            angle: HOME_ANGLE,
            angle_input: HOME_ANGLE.to_string(),
            pin_input: (FIRST_DEFAULT_PIN + index - 1).to_string(),
            selected: false,
        }
    }

    /// Move the slider, entry and gauge together.
    pub fn set_angle_local(&mut self, angle: i64) {
        self.angle = clamp_angle(angle);
        self.angle_input = self.angle.to_string();
    }
}

pub struct ServoPanel {
    slots: Vec<ServoSlot>,
    pub group_angle_input: String,
    log: Vec<String>,
    connection: ConnectionState,
    inbound_tx: Sender<String>,
    inbound_rx: Receiver<String>,
    settings: SerialSettings,
}

impl ServoPanel {
    pub fn new(settings: SerialSettings) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            slots: (1..=NUM_SERVOS).map(ServoSlot::new).collect(),
            group_angle_input: HOME_ANGLE.to_string(),
            log: Vec::new(),
            connection: ConnectionState::Disconnected,
            inbound_tx,
            inbound_rx,
            settings,
        }
    }

    pub fn slots(&self) -> &[ServoSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&ServoSlot> {
        self.slots.get(index.checked_sub(1)?)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ServoSlot> {
        self.slots.get_mut(index.checked_sub(1)?)
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connected_device(&self) -> Option<&str> {
        self.connection.device()
    }

    /// Producer side of the inbound queue; lines sent here are handled by the next drain.
    pub fn inbound_sender(&self) -> Sender<String> {
        self.inbound_tx.clone()
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "panel", "{}", message);
        self.log.push(message);
    }

    // ---------- Connection ----------

    /// Open `device` and start listening. An empty device is a validation error.
    pub fn connect(&mut self, device: &str) -> Result<(), PanelError> {
        if device.is_empty() {
            return Err(ValidationError::NoPortSelected.into());
        }
        let connection = Connection::open(device, &self.settings, self.inbound_sender())?;
        self.attach(connection);
        Ok(())
    }

    /// Connect over already-open handles instead of opening a port.
    pub fn connect_io(
        &mut self,
        device: &str,
        writer: Box<dyn Write + Send>,
        reader: Box<dyn Read + Send>,
    ) -> Result<(), PanelError> {
        let connection = Connection::from_parts(device, writer, reader, &self.settings, self.inbound_sender())?;
        self.attach(connection);
        Ok(())
    }

    fn attach(&mut self, connection: Connection) {
        // Replacing a live connection closes it first
        if let ConnectionState::Connected(mut old) = std::mem::take(&mut self.connection) {
            old.close();
        }
        let message = format!("Connected to {} @ {}", connection.device(), self.settings.baud);
        info!(target: "panel", "{}", message);
        self.connection = ConnectionState::Connected(connection);
        self.log(message);
        // Ask the firmware to report its current pin map
        self.read_pins();
    }

    pub fn disconnect(&mut self) {
        if let ConnectionState::Connected(mut connection) = std::mem::take(&mut self.connection) {
            connection.close();
            info!(target: "panel", "Disconnected from {}", connection.device());
        }
        self.log("Disconnected.");
    }

    pub fn toggle_connect(&mut self, device: &str) -> Result<(), PanelError> {
        if self.is_connected() {
            self.disconnect();
            Ok(())
        } else {
            self.connect(device)
        }
    }

    /// Send one command, reporting the outcome in the log.
    pub fn send_command(&mut self, command: &Command) {
        let text = command.encode();
        let outcome = match &mut self.connection {
            ConnectionState::Disconnected => {
                self.log("! Not connected");
                return;
            }
            ConnectionState::Connected(connection) => connection.write_line(&text),
        };
        match outcome {
            Ok(()) => self.log(format!("> {}", text)),
            Err(e) => self.log(e.log_line()),
        }
    }

    // ---------- Per-servo ----------

    /// Slider drag: local only, nothing is sent.
    pub fn slider_changed(&mut self, index: usize, angle: i32) {
        if let Some(slot) = self.slot_mut(index) {
            slot.set_angle_local(i64::from(angle));
        }
    }

    /// Send the angle typed into a servo's entry.
    pub fn send_angle(&mut self, index: usize) -> Result<(), PanelError> {
        let Some(slot) = self.slot(index) else {
            return Ok(());
        };
        let angle = parse_angle(&slot.angle_input)?;
        self.set_and_send(index, angle);
        Ok(())
    }

    pub fn send_preset(&mut self, index: usize, angle: i32) {
        self.set_and_send(index, angle);
    }

    fn set_and_send(&mut self, index: usize, angle: i32) {
        if let Some(slot) = self.slot_mut(index) {
            slot.set_angle_local(i64::from(angle));
            let command = Command::set_angle(index, i64::from(slot.angle));
            self.send_command(&command);
        }
    }

    /// Home one servo. Indices outside 1..=7 are ignored.
    pub fn home_one(&mut self, index: usize) {
        if let Some(slot) = self.slot_mut(index) {
            slot.set_angle_local(i64::from(HOME_ANGLE));
            self.send_command(&Command::Home { servo: index });
        }
    }

    pub fn home_all(&mut self) {
        for slot in &mut self.slots {
            slot.set_angle_local(i64::from(HOME_ANGLE));
        }
        self.send_command(&Command::HomeAll);
    }

    // ---------- Group ----------

    pub fn selected_indices(&self) -> Vec<usize> {
        self.slots.iter().filter(|s| s.selected).map(|s| s.index).collect()
    }

    fn require_selection(&self) -> Result<Vec<usize>, ValidationError> {
        let selected = self.selected_indices();
        if selected.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(selected)
    }

    /// Send the typed group angle to every selected servo.
    pub fn group_send_angle(&mut self) -> Result<(), PanelError> {
        let selected = self.require_selection()?;
        let angle = parse_angle(&self.group_angle_input)?;
        for index in selected {
            self.set_and_send(index, angle);
        }
        Ok(())
    }

    /// Re-send each selected servo's current slider angle.
    pub fn group_push_ui(&mut self) -> Result<(), PanelError> {
        let selected = self.require_selection()?;
        for index in selected {
            if let Some(angle) = self.slot(index).map(|s| s.angle) {
                self.set_and_send(index, angle);
            }
        }
        Ok(())
    }

    pub fn group_home(&mut self) -> Result<(), PanelError> {
        let selected = self.require_selection()?;
        for index in selected {
            self.home_one(index);
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        for slot in &mut self.slots {
            slot.selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        for slot in &mut self.slots {
            slot.selected = false;
        }
    }

    // ---------- Pins ----------

    /// Validate the pin fields and send the pin map. Firmware acknowledgement is not awaited.
    pub fn apply_pins(&mut self) -> Result<(), PanelError> {
        let fields: Vec<&str> = self.slots.iter().map(|s| s.pin_input.as_str()).collect();
        let pins = validate_pins(&fields)?;
        self.send_command(&Command::PinMap(pins));
        Ok(())
    }

    pub fn read_pins(&mut self) {
        self.send_command(&Command::GetPinMap);
    }

    // ---------- Inbound ----------

    /// Drain every queued inbound line. Returns how many lines were handled.
    ///
    /// Pin map reports with one field per servo overwrite all pin fields;
    /// every line, recognised or not, goes to the log.
    pub fn drain_inbound(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.inbound_rx.try_recv() {
                Ok(line) => {
                    if let Some(pins) = parse_pin_report(&line) {
                        for (slot, pin) in self.slots.iter_mut().zip(pins) {
                            slot.pin_input = pin;
                        }
                    }
                    self.log(line);
                    drained += 1;
                }
                // The panel holds a sender, so the queue never reports disconnected
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }
}

impl Drop for ServoPanel {
    fn drop(&mut self) {
        if self.is_connected() {
            self.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slots() {
        let panel = ServoPanel::new(SerialSettings::default());
        let pins: Vec<&str> = panel.slots().iter().map(|s| s.pin_input.as_str()).collect();
        assert_eq!(pins, ["22", "23", "24", "25", "26", "27", "28"]);
        assert!(panel.slots().iter().all(|s| s.angle == 90 && !s.selected));
        assert_eq!(panel.slot(7).map(|s| s.index), Some(7));
        assert!(panel.slot(0).is_none());
        assert!(panel.slot(8).is_none());
    }

    #[test]
    fn test_slider_is_local_only() {
        let mut panel = ServoPanel::new(SerialSettings::default());
        panel.slider_changed(3, 200);
        assert_eq!(panel.slot(3).map(|s| (s.angle, s.angle_input.as_str())), Some((180, "180")));
        assert!(panel.log_lines().is_empty());
    }

    #[test]
    fn test_send_while_disconnected_still_updates_locally() {
        let mut panel = ServoPanel::new(SerialSettings::default());
        panel.send_preset(2, 45);
        assert_eq!(panel.slot(2).map(|s| s.angle), Some(45));
        assert_eq!(panel.log_lines(), ["! Not connected"]);
    }

    #[test]
    fn test_connect_without_port() {
        let mut panel = ServoPanel::new(SerialSettings::default());
        let err = panel.connect("").unwrap_err();
        assert!(matches!(err, PanelError::Validation(ValidationError::NoPortSelected)));
        assert!(!panel.is_connected());
    }

    #[test]
    fn test_selection_helpers() {
        let mut panel = ServoPanel::new(SerialSettings::default());
        panel.select_all();
        assert_eq!(panel.selected_indices(), (1..=7).collect::<Vec<_>>());
        panel.clear_selection();
        assert!(panel.selected_indices().is_empty());
    }
}
