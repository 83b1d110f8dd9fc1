//! End-to-end tests driving the `finrec` binary.
//!
//! Stdout is not a terminal under the test harness, so every command
//! answers in JSON.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn finrec(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("finrec").unwrap();
    cmd.env("FINREC_HOME", home)
        .env_remove("FINREC_DB")
        .env_remove("FINREC_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &Path) {
    finrec(home).arg("init").assert().success();
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn add(home: &Path, title: &str, kind: &str, amount: &str, date: &str) {
    finrec(home)
        .args(["--user", "1", "record", "add", title, "--type", kind])
        .args(["--amount", amount, "--date", date])
        .assert()
        .success();
}

#[test]
fn test_init_then_add_and_list() {
    let home = TempDir::new().unwrap();
    init(home.path());
    add(home.path(), "Penjualan", "income", "1500000", "2025-01-15");
    add(home.path(), "Listrik", "expense", "350000.50", "2025-01-20");

    let list = json_stdout(finrec(home.path()).args(["--user", "1", "record", "list"]));
    assert_eq!(list["count"], 2);
    assert_eq!(list["records"][0]["title"], "Listrik");

    let other = json_stdout(finrec(home.path()).args(["--user", "2", "record", "list"]));
    assert_eq!(other["count"], 0);
}

#[test]
fn test_add_rejects_invalid_entry() {
    let home = TempDir::new().unwrap();
    init(home.path());

    let output = finrec(home.path())
        .args(["--user", "1", "record", "add", "Aneh", "--type", "transfer"])
        .args(["--amount=-5", "--date", "2025-01-01"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));

    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "INVALID_RECORD");
    assert_eq!(error["error"]["fields"]["type"], "Tipe transaksi tidak valid.");
    assert_eq!(error["error"]["fields"]["amount"], "Jumlah tidak boleh negatif.");
}

#[test]
fn test_missing_user_and_missing_database() {
    let home = TempDir::new().unwrap();

    let output = finrec(home.path()).args(["record", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("NO_USER"));

    let output = finrec(home.path())
        .args(["--user", "1", "record", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("NOT_INITIALIZED"));
}

#[test]
fn test_export_import_round_trip_between_homes() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    init(source.path());
    init(target.path());
    add(source.path(), "Gaji", "income", "5000000", "2025-02-01");
    add(source.path(), "Iklan", "expense", "75000", "2025-02-03");

    let exported = json_stdout(
        finrec(source.path())
            .args(["--user", "1", "export", "-f", "sql", "-o"])
            .arg(outbox.path()),
    );
    let path = exported["path"].as_str().unwrap().to_string();
    assert!(path.ends_with(".sql"));
    assert!(exported["bytes"].as_u64().unwrap() > 0);

    let imported = json_stdout(finrec(target.path()).args(["--user", "7", "import", &path]));
    assert_eq!(imported["succeeded"], true);
    assert_eq!(imported["stats"]["imported"], 2);

    // Second run only finds duplicates
    let again = json_stdout(finrec(target.path()).args(["--user", "7", "import", &path]));
    assert_eq!(again["stats"]["imported"], 0);
    assert_eq!(again["stats"]["skipped"], 2);

    let list = json_stdout(finrec(target.path()).args(["--user", "7", "record", "list"]));
    assert_eq!(list["count"], 2);
}

#[test]
fn test_export_with_nothing_selected() {
    let home = TempDir::new().unwrap();
    init(home.path());

    let output = finrec(home.path())
        .args(["--user", "1", "export"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Tidak ada data untuk diekspor."));
    let leftovers = fs::read_dir(home.path().join("temp/exports")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_validate_rejects_wrong_extension_and_oversize() {
    let dir = TempDir::new().unwrap();
    let exe = dir.path().join("payload.exe");
    fs::write(&exe, b"MZ").unwrap();

    let output = finrec(dir.path()).arg("validate").arg(&exe).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Format file harus ZIP, JSON, atau SQL."));

    let big = dir.path().join("big.zip");
    fs::File::create(&big)
        .unwrap()
        .set_len(60 * 1024 * 1024)
        .unwrap();
    let output = finrec(dir.path()).arg("validate").arg(&big).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Ukuran file maksimal 50MB."));

    let ok = dir.path().join("data.json");
    fs::write(&ok, b"[]").unwrap();
    let checked = json_stdout(finrec(dir.path()).arg("validate").arg(&ok));
    assert_eq!(checked["valid"], true);
}

#[test]
fn test_import_malformed_json_fails_batch() {
    let home = TempDir::new().unwrap();
    init(home.path());
    let bad = home.path().join("bad.json");
    fs::write(&bad, b"{not json").unwrap();

    let output = finrec(home.path())
        .args(["--user", "1", "import"])
        .arg(&bad)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["succeeded"], false);
    assert!(result["errors"]["general"]
        .as_str()
        .unwrap()
        .starts_with("Format JSON tidak valid"));
}

#[test]
fn test_summary_and_delete() {
    let home = TempDir::new().unwrap();
    init(home.path());
    add(home.path(), "Modal", "income", "1000", "2025-03-01");
    add(home.path(), "Sewa", "expense", "400", "2025-03-02");

    let summary = json_stdout(finrec(home.path()).args(["--user", "1", "summary"]));
    assert_eq!(summary["balance"], "600.00");
    assert_eq!(summary["recent"].as_array().unwrap().len(), 2);

    let list = json_stdout(finrec(home.path()).args(["--user", "1", "record", "list"]));
    let id = list["records"][0]["id"].as_i64().unwrap();
    finrec(home.path())
        .args(["--user", "1", "record", "delete", &id.to_string()])
        .assert()
        .success();

    let output = finrec(home.path())
        .args(["--user", "1", "record", "show", &id.to_string()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}
