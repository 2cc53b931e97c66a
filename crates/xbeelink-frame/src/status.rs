//! Protocol status codes carried in response frames.

/// AT command completed successfully.
pub const COMMAND_STATUS_OK: u8 = 0x00;

/// Transmission was delivered.
pub const DELIVERY_STATUS_SUCCESS: u8 = 0x00;

/// Every defined AT command status, in code order.
pub const COMMAND_STATUSES: &[(u8, &str)] = &[
    (0x00, "OK"),
    (0x01, "ERROR"),
    (0x02, "Invalid Command"),
    (0x03, "Invalid Parameter"),
    (0x04, "Remote Command Transmission Failed"),
];

/// Every defined transmit delivery status, in code order.
pub const DELIVERY_STATUSES: &[(u8, &str)] = &[
    (0x00, "Success"),
    (0x01, "MAC ACK Failure"),
    (0x02, "CCA Failure"),
    (0x03, "Purged"),
    (0x15, "Invalid destination endpoint"),
    (0x21, "Network ACK Failure"),
    (0x22, "Not Joined to Network"),
    (0x23, "Self-addressed"),
    (0x24, "Address Not Found"),
    (0x25, "Route Not Found"),
    (0x26, "Broadcast source failed to hear a neighbor relay the message"),
    (0x2B, "Invalid binding table index"),
    (0x2C, "Resource error lack of free buffers, timers, etc."),
    (0x2D, "Attempted broadcast with APS transmission"),
    (0x2E, "Attempted unicast with APS transmission, but EE=0"),
    (0x32, "Resource error lack of free buffers, timers, etc."),
    (0x74, "Data payload too large"),
    (0x75, "Indirect message unrequested"),
];

/// Human-readable name of an AT command status code.
pub fn command_status_name(status: u8) -> &'static str {
    lookup(COMMAND_STATUSES, status).unwrap_or("Unknown status")
}

/// Human-readable name of a transmit delivery status code.
pub fn delivery_status_name(status: u8) -> &'static str {
    lookup(DELIVERY_STATUSES, status).unwrap_or("Unknown delivery status")
}

fn lookup(table: &[(u8, &'static str)], code: u8) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, name)| *name)
}
