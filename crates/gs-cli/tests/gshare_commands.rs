// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
[[volumes]]
volume-id = "my_files"
volume-type = "downloads"
root = "/home/chronos/MyFiles"

[[volumes]]
volume-id = "crostini"
volume-type = "crostini"
root = "/media/fuse/crostini_user_termina_penguin"

[[guests]]
vm-name = "termina"
container-name = "penguin"
"#;

fn write_config(dir: &Path) -> String {
    let path = dir.join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path.to_string_lossy().into_owned()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("command output is valid JSON")
}

#[test]
fn check_allows_downloads_subfolder() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "check", "--json", "--persist"])
        .arg("/home/chronos/MyFiles/Downloads/photos")
        .assert()
        .success()
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["allowed"], true);
    assert_eq!(json["volume_id"], "my_files");
    assert!(json["denial"].is_null());
}

#[test]
fn check_denies_default_vm_own_root() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "check", "--json"])
        .arg("/media/fuse/crostini_user_termina_penguin/projects")
        .assert()
        .success()
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["allowed"], false);
    assert_eq!(json["denial"], "default-vm-own-root");
}

#[test]
fn check_denies_disabled_vm() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "check", "--json", "--vm", "PvmDefault"])
        .arg("/home/chronos/MyFiles/Downloads")
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout_json(&output)["denial"], "vm-disabled");
}

#[test]
fn replay_prints_final_table() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let events = temp.path().join("events.json");
    std::fs::write(
        &events,
        r#"[
            {"event": "enable", "vm_name": "PvmDefault", "container_name": ""},
            {"event": "share", "vm_name": "termina",
             "entries": [{"path": "/home/chronos/MyFiles/Downloads", "kind": "directory",
                          "filesystem_root": "/home/chronos/MyFiles"}]},
            {"event": "share", "vm_name": "termina",
             "entries": [{"path": "/home/chronos/MyFiles/Downloads/Sub", "kind": "directory",
                          "filesystem_root": "/home/chronos/MyFiles"}]},
            {"event": "share", "vm_name": "PvmDefault",
             "entries": [{"path": "/home/chronos/MyFiles/Music", "kind": "directory",
                          "filesystem_root": "/home/chronos/MyFiles"}]},
            {"event": "unshare", "vm_name": "PvmDefault",
             "entries": [{"path": "/home/chronos/MyFiles/Music", "kind": "directory",
                          "filesystem_root": "/home/chronos/MyFiles"}]}
        ]"#,
    )
    .unwrap();

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "replay"])
        .arg(&events)
        .assert()
        .success()
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["events"], 5);
    let shared = json["shared"].as_object().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(
        shared["/home/chronos/MyFiles/Downloads"],
        serde_json::json!(["termina"])
    );
    let enabled: Vec<&str> = json["enabled"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(enabled, ["PvmDefault", "termina/penguin"]);
}

#[test]
fn replay_rejects_malformed_log() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let events = temp.path().join("events.json");
    std::fs::write(&events, r#"[{"event": "reboot"}]"#).unwrap();

    cargo_bin_cmd!("gshare")
        .args(["--config", &config, "replay"])
        .arg(&events)
        .assert()
        .failure();
}

#[test]
fn dedup_and_resolve_on_disk() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let dir = temp.path().join("out");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("file.txt"), b"one").unwrap();
    std::fs::write(dir.join("file (1).txt"), b"two").unwrap();

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "dedup", "--dir"])
        .arg(&dir)
        .arg("file.txt")
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "file (2).txt");

    let output = cargo_bin_cmd!("gshare")
        .args(["--config", &config, "resolve", "--json", "--root"])
        .arg(temp.path())
        .arg("/out/file.txt")
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(&output);
    assert_eq!(json["kind"], "file");
    assert_eq!(json["full_path"], "/out/file.txt");

    cargo_bin_cmd!("gshare")
        .args(["--config", &config, "resolve", "--root"])
        .arg(temp.path())
        .arg("/missing")
        .assert()
        .failure();
}
