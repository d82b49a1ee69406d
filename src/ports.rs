/// Serial port discovery for the port selector.

use serialport::SerialPortType;

/// Separator between device and description in selector labels.
pub const LABEL_SEPARATOR: &str = " — ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    pub device: String,
    pub description: String,
}

impl PortEntry {
    pub fn label(&self) -> String {
        format!("{}{}{}", self.device, LABEL_SEPARATOR, self.description)
    }
}

/// Human-readable description of a port, similar to what OS device managers show.
pub fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => match (&info.manufacturer, &info.product) {
            (_, Some(product)) => product.clone(),
            (Some(manufacturer), None) => format!("{} USB Serial", manufacturer),
            (None, None) => format!("USB Serial ({:04x}:{:04x})", info.vid, info.pid),
        },
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

/// List the serial ports currently present. Enumeration failures give an empty list.
pub fn list_ports() -> Vec<PortEntry> {
    match serialport::available_ports() {
        Ok(ports) => {
            let entries: Vec<PortEntry> = ports
                .into_iter()
                .map(|p| PortEntry {
                    description: describe(&p.port_type),
                    device: p.port_name,
                })
                .collect();
            log::debug!(target: "ports", "Found {} serial port(s)", entries.len());
            entries
        }
        Err(e) => {
            log::warn!(target: "ports", "Serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Recover the device path from a selector label.
pub fn device_from_label(label: &str) -> &str {
    label.split(LABEL_SEPARATOR).next().unwrap_or(label).trim()
}
