use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbeelink_frame::{frame_type_name, Frame, RemoteCommandResponse};
use xbeelink_session::{to_hex, Destination, DiscoveredNode};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    command: &'a str,
    data_hex: String,
    data: String,
    timestamp: String,
}

#[derive(Serialize)]
struct RemoteOutput<'a> {
    command: &'a str,
    remote64: String,
    remote16: String,
    data_hex: String,
    data: String,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame_type: String,
    frame_type_name: &'static str,
    frame: &'a Frame,
    timestamp: String,
}

#[derive(Serialize)]
struct DeliveryOutput {
    delivered: bool,
    destination: String,
    len: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct NodeOutput<'a> {
    node_identifier: &'a str,
    address64: String,
    address16: String,
    device_type: Option<u8>,
}

pub fn print_command_data(command: &str, data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&CommandOutput {
            command,
            data_hex: to_hex(data),
            data: payload_preview(data),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["COMMAND", "DATA (HEX)", "DATA"]);
            table.add_row(vec![command.to_string(), to_hex(data), payload_preview(data)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{command}: {} ({})",
                to_hex(data),
                payload_preview(data)
            );
        }
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_remote_response(response: &RemoteCommandResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RemoteOutput {
            command: &response.command,
            remote64: to_hex(&response.remote64),
            remote16: to_hex(&response.remote16),
            data_hex: to_hex(&response.data),
            data: payload_preview(&response.data),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["COMMAND", "REMOTE64", "REMOTE16", "DATA (HEX)"]);
            table.add_row(vec![
                response.command.clone(),
                to_hex(&response.remote64),
                to_hex(&response.remote16),
                to_hex(&response.data),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} from {} ({}): {}",
                response.command,
                to_hex(&response.remote64),
                to_hex(&response.remote16),
                to_hex(&response.data)
            );
        }
        OutputFormat::Raw => print_raw(&response.data),
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let name = frame_type_name(frame.frame_type());
    match format {
        OutputFormat::Json => print_json(&FrameOutput {
            frame_type: format!("0x{:02X}", frame.frame_type()),
            frame_type_name: name,
            frame,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TYPE", "SOURCE", "PAYLOAD"]);
            table.add_row(vec![name.to_string(), frame_source(frame), frame_payload(frame)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={name} source={} payload={}",
                frame_source(frame),
                frame_payload(frame)
            );
        }
        OutputFormat::Raw => {
            if let Frame::ZigbeeReceivePacket(packet) = frame {
                print_raw(&packet.data);
            }
        }
    }
}

pub fn print_delivery(destination: &Destination, len: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DeliveryOutput {
            delivered: true,
            destination: destination.to_string(),
            len,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["DESTINATION", "BYTES", "STATUS"]);
            table.add_row(vec![
                destination.to_string(),
                len.to_string(),
                "delivered".to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("delivered {len} bytes to {destination}"),
        OutputFormat::Raw => {}
    }
}

pub fn print_nodes(nodes: &[DiscoveredNode], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<_> = nodes
                .iter()
                .map(|node| NodeOutput {
                    node_identifier: &node.node_identifier,
                    address64: to_hex(&node.address64),
                    address16: to_hex(&node.address16),
                    device_type: node.device_type,
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["NODE", "ADDRESS64", "ADDRESS16", "DEVICE"]);
            for node in nodes {
                table.add_row(vec![
                    node.node_identifier.clone(),
                    to_hex(&node.address64),
                    to_hex(&node.address16),
                    device_type_name(node.device_type).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for node in nodes {
                println!(
                    "{} {} {} {}",
                    to_hex(&node.address64),
                    to_hex(&node.address16),
                    device_type_name(node.device_type),
                    node.node_identifier
                );
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn device_type_name(device_type: Option<u8>) -> &'static str {
    match device_type {
        Some(0) => "coordinator",
        Some(1) => "router",
        Some(2) => "end-device",
        Some(_) => "unknown",
        None => "-",
    }
}

fn frame_source(frame: &Frame) -> String {
    match frame {
        Frame::ZigbeeReceivePacket(packet) => to_hex(&packet.remote64),
        Frame::ZigbeeIoSample(sample) => to_hex(&sample.remote64),
        Frame::RemoteCommandResponse(response) => to_hex(&response.remote64),
        _ => "local".to_string(),
    }
}

fn frame_payload(frame: &Frame) -> String {
    match frame {
        Frame::ZigbeeReceivePacket(packet) => payload_preview(&packet.data),
        Frame::ZigbeeIoSample(sample) => {
            let mut parts = Vec::new();
            if let Some(digital) = sample.digital_samples {
                parts.push(format!("digital={digital:#06x}"));
            }
            if !sample.analog_samples.is_empty() {
                parts.push(format!("analog={:?}", sample.analog_samples));
            }
            parts.join(" ")
        }
        Frame::AtCommandResponse(response) => {
            format!("{} {}", response.command, to_hex(&response.data))
        }
        Frame::ModemStatus(status) => format!("status={:#04x}", status.status),
        other => match other.frame_id() {
            Some(id) => format!("id={id}"),
            None => String::new(),
        },
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previews_text_and_binary() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }

    #[test]
    fn names_device_types() {
        assert_eq!(device_type_name(Some(1)), "router");
        assert_eq!(device_type_name(None), "-");
    }
}
