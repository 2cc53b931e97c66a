#![cfg(all(unix, feature = "cli"))]

use std::process::Command;

fn xbeelink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_xbeelink"));
    command
        .env_remove("XBEELINK_PORT")
        .env_remove("XBEELINK_BAUD")
        .env_remove("XBEELINK_MODULE")
        .arg("--log-level")
        .arg("error");
    command
}

#[test]
fn version_prints_crate_version() {
    let output = xbeelink().arg("version").output().expect("version should run");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "stdout: {stdout}");
}

#[test]
fn missing_port_is_usage_error() {
    let output = xbeelink()
        .args(["local", "NI"])
        .output()
        .expect("command should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn nonexistent_port_is_transport_error() {
    let port = std::env::temp_dir().join(format!("xbeelink-missing-{}", std::process::id()));
    let output = xbeelink()
        .args(["local", "--port"])
        .arg(&port)
        .args(["--timeout", "200ms", "NI"])
        .output()
        .expect("command should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn bad_command_length_is_usage_error() {
    let output = xbeelink()
        .args(["local", "--port", "/dev/null", "NIX"])
        .output()
        .expect("command should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn node_id_on_series1_is_usage_error() {
    let output = xbeelink()
        .args([
            "remote", "--port", "/dev/null", "--module", "802.15.4", "--timeout", "200ms", "SH",
            "--node-id", "PUMP",
        ])
        .output()
        .expect("command should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn unsupported_api_mode_is_usage_error() {
    let output = xbeelink()
        .args(["local", "--port", "/dev/null", "--api-mode", "3", "NI"])
        .output()
        .expect("command should run");
    assert_eq!(output.status.code(), Some(64));
}
