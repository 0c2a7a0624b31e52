//! End-to-end tests driving the `volumectl` binary against an in-process
//! service listening on a private control socket.

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Serve every connection on `<dir>/volumed.sock` with a fixed response.
fn spawn_service(dir: &Path, response: &'static str) {
    let listener = UnixListener::bind(dir.join("volumed.sock")).expect("bind socket");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0_u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(response.as_bytes());
        }
    });
}

fn volumectl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("volumectl").expect("binary");
    cmd.env("VOLUMECTL_SOCKET_DIR", dir)
        .env_remove("VOLUMECTL_DEBUG")
        .env_remove("VOLUMECTL_VERBOSE")
        .env_remove("VOLUMECTL_VERSION")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn discovery_failure_is_fatal_and_named() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .args(["volume", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "volumed does not appear to be running (no control socket found)",
        ))
        .stderr(predicate::str::contains("volume list"));
}

#[test]
fn missing_required_option_is_a_usage_error_without_any_call() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .args(["volume", "create", "--type", "nvme", "--capacity", "1024"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("required option --name missing"))
        .stderr(predicate::str::contains("volume create"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .args(["volume", "list", "--bogus"])
        .assert()
        .code(2);
}

#[test]
fn namespace_without_subcommand_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path()).args(["volume"]).assert().code(2);
}

#[test]
fn machine_mode_prints_exactly_the_pretty_payload() {
    let dir = TempDir::new().expect("tempdir");
    spawn_service(
        dir.path(),
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 35\r\n\r\n{\"name\":\"v1\",\"capacity\":1073741824}",
    );

    volumectl(dir.path())
        .args(["volume", "inspect", "v1", "--machine"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "{\n  \"capacity\": 1073741824,\n  \"name\": \"v1\"\n}\n",
        ));
}

#[test]
fn not_modified_with_empty_body_prints_nothing() {
    let dir = TempDir::new().expect("tempdir");
    spawn_service(dir.path(), "HTTP/1.1 304 Not Modified\r\n\r\n");

    volumectl(dir.path())
        .args(["volume", "inspect", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn server_error_reports_status_and_command_path() {
    let dir = TempDir::new().expect("tempdir");
    spawn_service(
        dir.path(),
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 16\r\n\r\n{\"error\":\"boom\"}",
    );

    volumectl(dir.path())
        .args(["volume", "inspect", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("500"))
        .stderr(predicate::str::contains("volume inspect"))
        .stderr(predicate::str::contains("boom"));
}

#[test]
fn human_list_renders_a_table() {
    let dir = TempDir::new().expect("tempdir");
    spawn_service(
        dir.path(),
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 51\r\n\r\n[{\"name\":\"v1\",\"type\":\"nvme\",\"capacity\":1073741824}]",
    );

    volumectl(dir.path())
        .args(["volume", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("v1"))
        .stdout(predicate::str::contains("1.0 GiB"));
}

#[test]
fn yaml_dump_bypasses_human_rendering() {
    let dir = TempDir::new().expect("tempdir");
    spawn_service(
        dir.path(),
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 51\r\n\r\n[{\"name\":\"v1\",\"type\":\"nvme\",\"capacity\":1073741824}]",
    );

    volumectl(dir.path())
        .args(["volume", "list", "--yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: v1"))
        .stdout(predicate::str::contains("type: nvme"));
}

#[test]
fn version_works_without_a_service() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("volumectl "));
}

#[test]
fn version_honors_the_env_override() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .env("VOLUMECTL_VERSION", "9.9.9-test")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("9.9.9-test"));
}

#[test]
fn help_hides_advanced_options_unless_verbose() {
    let dir = TempDir::new().expect("tempdir");

    volumectl(dir.path())
        .args(["volume", "create", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--capacity"))
        .stdout(predicate::str::contains("--machine").not());

    volumectl(dir.path())
        .args(["volume", "create", "-h", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--machine"))
        .stdout(predicate::str::contains("--api-url"));
}

#[test]
fn escaped_name_reaches_the_request_path() {
    let dir = TempDir::new().expect("tempdir");

    // Echo the request line back so the test can observe the path.
    let listener = UnixListener::bind(dir.path().join("volumed.sock")).expect("bind socket");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0_u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let line = request.lines().next().unwrap_or_default().to_string();
            let body = format!("{{\"path\":\"{}\"}}", line.split(' ').nth(1).unwrap_or_default());
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    volumectl(dir.path())
        .args(["volume", "inspect", "a/b.c", "--machine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/volume/a%2Fb%2Ec"));
}
