//! Port list rendering

use baud_detect::PortRecord;
use colored::Colorize;

/// Shown when filtering leaves nothing to display
pub const NO_USB_PORTS: &str = "No USB connections found. (consider running with --showall)";

/// What the `list` command displays
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Add the resolved device name column
    pub show_names: bool,
    /// Include non-USB ports
    pub show_all: bool,
}

impl ListOptions {
    /// Ports that pass the USB filter, in display order
    pub fn visible<'a>(&self, ports: &[&'a PortRecord]) -> Vec<&'a PortRecord> {
        ports
            .iter()
            .copied()
            .filter(|p| self.show_all || p.is_usb)
            .collect()
    }
}

fn cell_width(s: &str) -> usize {
    s.chars().count()
}

/// Render ports as an aligned table
///
/// Returns None when the USB filter leaves nothing to show. With `show_all`
/// an empty port list still renders the header row.
pub fn render_table(ports: &[&PortRecord], options: ListOptions) -> Option<String> {
    let visible = options.visible(ports);
    if visible.is_empty() && !options.show_all {
        return None;
    }

    let mut headers = vec!["PORT", "USB", "VID", "PID", "SERIAL NUMBER"];
    if options.show_names {
        headers.push("DEVICE NAME");
    }

    let rows: Vec<Vec<String>> = visible
        .iter()
        .map(|port| {
            let mut row = vec![
                port.name.trim().to_string(),
                if port.is_usb { "Yes" } else { "No" }.to_string(),
                port.vendor_id.clone(),
                port.product_id.clone(),
                port.serial_number.clone(),
            ];
            if options.show_names {
                row.push(port.product_name.clone());
            }
            row
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .map(|row| cell_width(&row[col]))
                .chain(std::iter::once(cell_width(header)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!(" {:<w$} ", h, w = w).bright_purple().bold().to_string())
        .collect();
    out.push_str(header_line.join("").trim_end());
    out.push('\n');

    for (row, port) in rows.iter().zip(&visible) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, w))| {
                let padded = format!(" {:<w$} ", cell, w = w);
                // highlight USB ports when they are mixed with native ones
                if col == 1 && port.is_usb && options.show_all {
                    padded.bright_cyan().to_string()
                } else {
                    padded
                }
            })
            .collect();
        out.push_str(line.join("").trim_end());
        out.push('\n');
    }

    Some(out)
}

/// Render ports as a JSON array
pub fn render_json(ports: &[&PortRecord], options: ListOptions) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&options.visible(ports))
}
