/// Servo tester window
///
/// Port bar, group controls, pin bar, a two-column grid of servo cards and
/// the log. Widgets edit the panel's slots directly; button presses are
/// collected as actions during layout and applied afterwards.

use std::time::{Duration, Instant};

use egui::Color32;

use crate::config_loader::Settings;
use crate::error::{PanelError, Severity};
use crate::gui::gauge;
use crate::panel::{ServoPanel, ANGLE_PRESETS};
use crate::ports::{self, PortEntry};
use crate::protocol::NUM_SERVOS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    RefreshPorts,
    ToggleConnect,
    HomeAll,
    GroupSendAngle,
    GroupPushUi,
    GroupHome,
    SelectAll,
    ClearSelection,
    ApplyPins,
    ReadPins,
    SendAngle(usize),
    Preset(usize, i32),
    Home(usize),
}

/// Dialog shown until the operator dismisses it.
struct Notice {
    title: String,
    message: String,
    severity: Severity,
}

impl From<&PanelError> for Notice {
    fn from(err: &PanelError) -> Self {
        Self {
            title: err.title().to_string(),
            message: err.to_string(),
            severity: err.severity(),
        }
    }
}

pub struct ServoTesterGUI {
    panel: ServoPanel,
    ports: Vec<PortEntry>,
    selected_port: String,
    notice: Option<Notice>,
    drain_interval: Duration,
    last_drain: Instant,
}

impl ServoTesterGUI {
    pub fn new(settings: Settings, preferred_port: Option<String>) -> Self {
        let mut gui = Self {
            panel: ServoPanel::new(settings.serial),
            ports: Vec::new(),
            selected_port: String::new(),
            notice: None,
            drain_interval: settings.panel.drain_interval(),
            last_drain: Instant::now(),
        };
        gui.refresh_ports();
        if let Some(device) = preferred_port {
            gui.selected_port = gui
                .ports
                .iter()
                .find(|p| p.device == device)
                .map(PortEntry::label)
                .unwrap_or(device);
        }
        gui
    }

    fn refresh_ports(&mut self) {
        self.ports = ports::list_ports();
        // First port preselected, as on startup
        self.selected_port = self.ports.first().map(PortEntry::label).unwrap_or_default();
    }

    fn report(&mut self, result: Result<(), PanelError>) {
        if let Err(e) = result {
            log::warn!(target: "gui", "{}: {}", e.title(), e);
            self.notice = Some(Notice::from(&e));
        }
    }

    fn apply(&mut self, action: Action) {
        let result = match action {
            Action::RefreshPorts => {
                self.refresh_ports();
                Ok(())
            }
            Action::ToggleConnect => {
                let device = ports::device_from_label(&self.selected_port).to_string();
                self.panel.toggle_connect(&device)
            }
            Action::HomeAll => {
                self.panel.home_all();
                Ok(())
            }
            Action::GroupSendAngle => self.panel.group_send_angle(),
            Action::GroupPushUi => self.panel.group_push_ui(),
            Action::GroupHome => self.panel.group_home(),
            Action::SelectAll => {
                self.panel.select_all();
                Ok(())
            }
            Action::ClearSelection => {
                self.panel.clear_selection();
                Ok(())
            }
            Action::ApplyPins => self.panel.apply_pins(),
            Action::ReadPins => {
                self.panel.read_pins();
                Ok(())
            }
            Action::SendAngle(index) => self.panel.send_angle(index),
            Action::Preset(index, angle) => {
                self.panel.send_preset(index, angle);
                Ok(())
            }
            Action::Home(index) => {
                self.panel.home_one(index);
                Ok(())
            }
        };
        self.report(result);
    }

    /// Apply the actions collected this frame. Nothing is applied while a
    /// notice was open during layout.
    fn apply_all(&mut self, actions: Vec<Action>, interactive: bool) {
        if !interactive {
            return;
        }
        for action in actions {
            self.apply(action);
        }
    }

    fn top_bar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            ui.label("Port:");
            egui::ComboBox::from_id_source("port_select")
                .width(280.0)
                .selected_text(self.selected_port.as_str())
                .show_ui(ui, |ui| {
                    for port in &self.ports {
                        let label = port.label();
                        ui.selectable_value(&mut self.selected_port, label.clone(), label);
                    }
                });
            if ui.button("Refresh").clicked() {
                actions.push(Action::RefreshPorts);
            }
            let connect_label = if self.panel.is_connected() { "Disconnect" } else { "Connect" };
            if ui.button(connect_label).clicked() {
                actions.push(Action::ToggleConnect);
            }
            if ui.button("HOME ALL").clicked() {
                actions.push(Action::HomeAll);
            }
            if let Some(device) = self.panel.connected_device() {
                ui.colored_label(Color32::from_rgb(0, 160, 0), format!("● {}", device));
            }
        });

        ui.horizontal(|ui| {
            ui.label("Group Controls:");
            ui.label("Angle");
            ui.add(egui::TextEdit::singleline(&mut self.panel.group_angle_input).desired_width(40.0));
            if ui.button("Send Angle → Selected").clicked() {
                actions.push(Action::GroupSendAngle);
            }
            if ui.button("Push UI → Selected").clicked() {
                actions.push(Action::GroupPushUi);
            }
            if ui.button("HOME Selected").clicked() {
                actions.push(Action::GroupHome);
            }
            ui.add_space(12.0);
            if ui.button("Select All").clicked() {
                actions.push(Action::SelectAll);
            }
            if ui.button("Clear").clicked() {
                actions.push(Action::ClearSelection);
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Apply Pins").clicked() {
                actions.push(Action::ApplyPins);
            }
            if ui.button("Read Pins").clicked() {
                actions.push(Action::ReadPins);
            }
        });
    }

    fn servo_card(&mut self, ui: &mut egui::Ui, index: usize, actions: &mut Vec<Action>) {
        let Some(slot) = self.panel.slot_mut(index) else {
            return;
        };
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong(format!("Servo {}", index));
                ui.checkbox(&mut slot.selected, "Select");
            });
            ui.horizontal(|ui| {
                gauge::draw(ui, slot.angle);
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.label("Pin:");
                        ui.add(egui::TextEdit::singleline(&mut slot.pin_input).desired_width(40.0));
                    });

                    let mut angle = slot.angle;
                    if ui.add(egui::Slider::new(&mut angle, 0..=180)).changed() {
                        // Local only; the operator sends explicitly
                        slot.set_angle_local(i64::from(angle));
                    }

                    ui.horizontal(|ui| {
                        ui.label("Angle:");
                        ui.add(egui::TextEdit::singleline(&mut slot.angle_input).desired_width(40.0));
                        if ui.button("Send").clicked() {
                            actions.push(Action::SendAngle(index));
                        }
                    });

                    egui::Grid::new(("presets", index)).show(ui, |ui| {
                        for (i, preset) in ANGLE_PRESETS.iter().enumerate() {
                            if ui.button(format!("{}°", preset)).clicked() {
                                actions.push(Action::Preset(index, *preset));
                            }
                            if i % 3 == 2 {
                                ui.end_row();
                            }
                        }
                    });

                    if ui.button(format!("HOME {}", index)).clicked() {
                        actions.push(Action::Home(index));
                    }
                });
            });
        });
    }

    fn log_panel(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Log:");
            if ui.button("Copy log").clicked() {
                let text = self.panel.log_lines().join("\n");
                ui.output_mut(|o| o.copied_text = text);
            }
        });
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.panel.log_lines() {
                    ui.monospace(line);
                }
            });
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.severity {
            Severity::Info => ctx.style().visuals.text_color(),
            Severity::Warning => Color32::from_rgb(220, 160, 0),
            Severity::Error => Color32::from_rgb(220, 50, 50),
        };
        let mut dismissed = false;
        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(color, notice.message.as_str());
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.notice = None;
        }
    }
}

impl eframe::App for ServoTesterGUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.last_drain.elapsed() >= self.drain_interval {
            self.panel.drain_inbound();
            self.last_drain = Instant::now();
        }

        let mut actions = Vec::new();

        // A pending notice blocks every other control until dismissed
        let interactive = self.notice.is_none();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.set_enabled(interactive);
            self.top_bar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("log")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                self.log_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_enabled(interactive);
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.columns(2, |columns| {
                    for index in 1..=NUM_SERVOS {
                        self.servo_card(&mut columns[(index - 1) % 2], index, &mut actions);
                    }
                });
            });
        });

        self.notice_window(ctx);
        self.apply_all(actions, interactive);

        ctx.request_repaint_after(self.drain_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn gui() -> ServoTesterGUI {
        ServoTesterGUI::new(Settings::default(), None)
    }

    #[test]
    fn test_actions_ignored_while_notice_open() {
        let mut gui = gui();
        gui.report(Err(ValidationError::EmptySelection.into()));
        assert!(gui.notice.is_some());

        gui.apply_all(vec![Action::HomeAll, Action::SelectAll], false);
        assert!(gui.panel.log_lines().is_empty());
        assert!(gui.panel.selected_indices().is_empty());
        assert_eq!(gui.notice.as_ref().map(|n| n.title.as_str()), Some(PanelError::from(ValidationError::EmptySelection).title()));
    }

    #[test]
    fn test_actions_applied_when_no_notice() {
        let mut gui = gui();
        gui.apply_all(vec![Action::SelectAll, Action::HomeAll], true);
        assert_eq!(gui.panel.selected_indices().len(), NUM_SERVOS);
        assert_eq!(gui.panel.log_lines(), ["! Not connected"]);
    }
}
