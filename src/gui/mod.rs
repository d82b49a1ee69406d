//! egui front end for the servo panel.

pub mod gauge;
pub mod servo_tester_gui;

pub use servo_tester_gui::ServoTesterGUI;
