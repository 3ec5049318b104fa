use assert_cmd::Command;
use image::{ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mastervault"));
    cmd.env_remove("MASTERVAULT_PASSWORD")
        .env_remove("MASTERVAULT_NEW_PASSWORD")
        .env_remove("MASTERVAULT_LOG")
        .env_remove("MASTERVAULT_DIR");
    cmd
}

/// Creates a vault with cheap Argon2 parameters.
fn init(dir: &Path, password: &str) {
    bin()
        .env("MASTERVAULT_PASSWORD", password)
        .arg("--dir")
        .arg(dir)
        .args(["init", "--argon-mem", "1024", "--argon-time", "1"])
        .assert()
        .success();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::from_pixel(width, height, Rgb([12, 200, 34]))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn init_creates_vault_files() {
    let dir = tempdir().unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .args(["init", "--argon-mem", "1024", "--argon-time", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vault initialized"));

    assert!(dir.path().join("vault.mvlt").exists());
    assert!(dir.path().join("preferences.json").exists());
}

#[test]
fn init_fails_if_vault_exists() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .args(["init", "--argon-mem", "1024", "--argon-time", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vault already exists"));
}

#[test]
fn init_with_invalid_argon2_parameters_fails() {
    let dir = tempdir().unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .args(["init", "--argon-time", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key derivation failed"));

    assert!(!dir.path().join("vault.mvlt").exists());
}

#[test]
fn unlock_with_correct_password() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .success()
        .stdout(predicate::str::contains("passphrase accepted"));
}

#[test]
fn wrong_password_fails() {
    let dir = tempdir().unwrap();
    init(dir.path(), "correct");

    bin()
        .env("MASTERVAULT_PASSWORD", "wrong")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid passphrase"));
}

#[test]
fn actions_fail_if_vault_not_exists() {
    let dir = tempdir().unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vault does not exist"));
}

#[test]
fn change_passphrase_then_unlock_with_new() {
    let dir = tempdir().unwrap();
    init(dir.path(), "old-pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "old-pw")
        .env("MASTERVAULT_NEW_PASSWORD", "new-pw")
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "the usual"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passphrase changed"));

    bin()
        .env("MASTERVAULT_PASSWORD", "new-pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .success();

    bin()
        .env("MASTERVAULT_PASSWORD", "old-pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid passphrase"));

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("hint")
        .assert()
        .success()
        .stdout(predicate::str::contains("the usual"));
}

#[test]
fn change_passphrase_reads_piped_stdin() {
    let dir = tempdir().unwrap();
    init(dir.path(), "old-pw");

    bin()
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "piped"])
        .write_stdin("old-pw\nnew-pw\nnew-pw\n")
        .assert()
        .success();

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .write_stdin("new-pw\n")
        .assert()
        .success();
}

#[test]
fn mismatched_confirmation_fails() {
    let dir = tempdir().unwrap();
    init(dir.path(), "old-pw");

    bin()
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "piped"])
        .write_stdin("old-pw\nnew-pw\nother\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("passwords do not match"));
}

#[test]
fn hint_containing_passphrase_is_rejected() {
    let dir = tempdir().unwrap();
    init(dir.path(), "old-pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "old-pw")
        .env("MASTERVAULT_NEW_PASSWORD", "abc123")
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint must not contain the passphrase"));

    bin()
        .env("MASTERVAULT_PASSWORD", "old-pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .success();
}

#[test]
fn hint_too_short_is_rejected() {
    let dir = tempdir().unwrap();
    init(dir.path(), "old-pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "old-pw")
        .env("MASTERVAULT_NEW_PASSWORD", "new-pw")
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint is too short"));
}

#[test]
fn vault_without_passphrase_unlocks_without_input() {
    let dir = tempdir().unwrap();

    bin()
        .arg("--dir")
        .arg(dir.path())
        .args(["init", "--no-passphrase", "--argon-mem", "1024", "--argon-time", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("without passphrase"));

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .success();

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Password disabled:  true"));
}

#[test]
fn disable_passphrase_then_unlock_without_input() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("disable-passphrase")
        .assert()
        .success()
        .stdout(predicate::str::contains("protection disabled"));

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("unlock")
        .assert()
        .success();
}

#[test]
fn info_shows_kdf_parameters() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    bin()
        .arg("--dir")
        .arg(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("mem 1024 KiB, time 1"))
        .stdout(predicate::str::contains("Passphrase changed: never"));
}

#[test]
fn encrypt_and_decrypt_roundtrip() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    let plain = dir.path().join("note.txt");
    let sealed = dir.path().join("note.enc");
    std::fs::write(&plain, b"attachment body").unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("encrypt")
        .arg(&plain)
        .arg(&sealed)
        .assert()
        .success();

    assert_ne!(std::fs::read(&sealed).unwrap(), b"attachment body");

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("decrypt")
        .arg(&sealed)
        .assert()
        .success()
        .stdout("attachment body");
}

#[test]
fn content_survives_passphrase_change() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    let plain = dir.path().join("note.txt");
    let sealed = dir.path().join("note.enc");
    std::fs::write(&plain, b"still readable").unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("encrypt")
        .arg(&plain)
        .arg(&sealed)
        .assert()
        .success();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .env("MASTERVAULT_NEW_PASSWORD", "pw2")
        .arg("--dir")
        .arg(dir.path())
        .args(["change-passphrase", "--hint", "rotated"])
        .assert()
        .success();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw2")
        .arg("--dir")
        .arg(dir.path())
        .arg("decrypt")
        .arg(&sealed)
        .assert()
        .success()
        .stdout("still readable");
}

#[test]
fn thumbnail_of_encrypted_image() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    let plain = dir.path().join("photo.png");
    let sealed = dir.path().join("photo.enc");
    let preview = dir.path().join("photo-thumb.jpg");
    std::fs::write(&plain, png(200, 100)).unwrap();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("encrypt")
        .arg(&plain)
        .arg(&sealed)
        .assert()
        .success();

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("thumbnail")
        .arg(&sealed)
        .args(["--content-type", "image/png", "--max-dimension", "64", "--out"])
        .arg(&preview)
        .assert()
        .success()
        .stdout(predicate::str::contains("thumbnail 64x32"));

    let jpeg = std::fs::read(&preview).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn thumbnail_of_non_image_is_skipped() {
    let dir = tempdir().unwrap();
    init(dir.path(), "pw");

    let preview = dir.path().join("thumb.jpg");

    bin()
        .env("MASTERVAULT_PASSWORD", "pw")
        .arg("--dir")
        .arg(dir.path())
        .arg("thumbnail")
        .arg(dir.path().join("whatever.enc"))
        .args(["--content-type", "application/pdf", "--out"])
        .arg(&preview)
        .assert()
        .success()
        .stdout(predicate::str::contains("no thumbnail"));

    assert!(!preview.exists());
}
