//! API frame type identifiers.
//!
//! The first byte of every API frame's data selects its kind. Request kinds
//! sent to the radio are below 0x80; responses and unsolicited reports have
//! the high bit set.

/// 64-bit addressed transmit request (802.15.4 modules).
pub const TX_REQUEST_64: u8 = 0x00;

/// 16-bit addressed transmit request (802.15.4 modules).
pub const TX_REQUEST_16: u8 = 0x01;

/// Local AT command.
pub const AT_COMMAND: u8 = 0x08;

/// ZigBee/ZNet transmit request.
pub const ZIGBEE_TRANSMIT_REQUEST: u8 = 0x10;

/// Remote AT command request.
pub const REMOTE_AT_COMMAND_REQUEST: u8 = 0x17;

/// Local AT command response.
pub const AT_COMMAND_RESPONSE: u8 = 0x88;

/// Transmit status (802.15.4 modules).
pub const TX_STATUS: u8 = 0x89;

/// Modem status report.
pub const MODEM_STATUS: u8 = 0x8A;

/// ZigBee/ZNet transmit status.
pub const ZIGBEE_TRANSMIT_STATUS: u8 = 0x8B;

/// ZigBee/ZNet received data packet.
pub const ZIGBEE_RECEIVE_PACKET: u8 = 0x90;

/// ZigBee/ZNet I/O data sample.
pub const ZIGBEE_IO_DATA_SAMPLE_RX: u8 = 0x92;

/// Remote AT command response.
pub const REMOTE_COMMAND_RESPONSE: u8 = 0x97;

/// Returns a human-readable name for a frame type.
pub fn frame_type_name(frame_type: u8) -> &'static str {
    match frame_type {
        TX_REQUEST_64 => "TX_REQUEST_64",
        TX_REQUEST_16 => "TX_REQUEST_16",
        AT_COMMAND => "AT_COMMAND",
        ZIGBEE_TRANSMIT_REQUEST => "ZIGBEE_TRANSMIT_REQUEST",
        REMOTE_AT_COMMAND_REQUEST => "REMOTE_AT_COMMAND_REQUEST",
        AT_COMMAND_RESPONSE => "AT_COMMAND_RESPONSE",
        TX_STATUS => "TX_STATUS",
        MODEM_STATUS => "MODEM_STATUS",
        ZIGBEE_TRANSMIT_STATUS => "ZIGBEE_TRANSMIT_STATUS",
        ZIGBEE_RECEIVE_PACKET => "ZIGBEE_RECEIVE_PACKET",
        ZIGBEE_IO_DATA_SAMPLE_RX => "ZIGBEE_IO_DATA_SAMPLE_RX",
        REMOTE_COMMAND_RESPONSE => "REMOTE_COMMAND_RESPONSE",
        _ => "UNKNOWN",
    }
}

/// Returns true if frames of this type carry a correlation id.
pub fn carries_frame_id(frame_type: u8) -> bool {
    matches!(
        frame_type,
        TX_REQUEST_64
            | TX_REQUEST_16
            | AT_COMMAND
            | ZIGBEE_TRANSMIT_REQUEST
            | REMOTE_AT_COMMAND_REQUEST
            | AT_COMMAND_RESPONSE
            | TX_STATUS
            | ZIGBEE_TRANSMIT_STATUS
            | REMOTE_COMMAND_RESPONSE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_types() {
        assert_eq!(frame_type_name(AT_COMMAND), "AT_COMMAND");
        assert_eq!(frame_type_name(REMOTE_COMMAND_RESPONSE), "REMOTE_COMMAND_RESPONSE");
        assert_eq!(frame_type_name(0x7F), "UNKNOWN");
    }

    #[test]
    fn request_response_kinds_carry_ids() {
        assert!(carries_frame_id(AT_COMMAND));
        assert!(carries_frame_id(ZIGBEE_TRANSMIT_STATUS));
        assert!(!carries_frame_id(MODEM_STATUS));
        assert!(!carries_frame_id(ZIGBEE_RECEIVE_PACKET));
    }
}
