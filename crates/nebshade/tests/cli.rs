use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn nebshade(config_dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nebshade"));
    command
        .env("NEBSHADE_CONFIG_DIR", config_dir.path())
        .env_remove("NEBSHADE_CONFIG")
        .env("RUST_LOG", "error");
    command
}

#[test]
fn still_writes_png_of_requested_size() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("frames/hero.png");

    let status = nebshade(&root)
        .args(["still", "--size", "48x24", "--time", "2.5", "--theme", "light"])
        .arg("--output")
        .arg(&output)
        .status()
        .expect("failed to run nebshade still");

    assert!(status.success());
    let image = image::open(&output).expect("still frame is a readable png");
    assert_eq!((image.width(), image.height()), (48, 24));
}

#[test]
fn fallback_writes_png_and_prints_css() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("fallback.png");

    let result = nebshade(&root)
        .args(["fallback", "--size", "40x20"])
        .arg("--output")
        .arg(&output)
        .output()
        .expect("failed to run nebshade fallback");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("radial-gradient"));
    let image = image::open(&output).expect("fallback is a readable png");
    assert_eq!((image.width(), image.height()), (40, 20));
}

#[test]
fn check_reports_embedded_program() {
    let root = TempDir::new().unwrap();
    let result = nebshade(&root)
        .arg("check")
        .output()
        .expect("failed to run nebshade check");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("program ok"));
    for uniform in ["time", "resolution", "mouse", "scroll", "theme"] {
        assert!(stdout.contains(uniform), "missing uniform {uniform} in:\n{stdout}");
    }
}

#[test]
fn check_fails_on_broken_fragment() {
    let root = TempDir::new().unwrap();
    let fragment = root.path().join("broken.frag");
    fs::write(&fragment, "#version 450\nvoid main( {\n").unwrap();

    let status = nebshade(&root)
        .arg("check")
        .arg("--fragment")
        .arg(&fragment)
        .status()
        .expect("failed to run nebshade check");

    assert!(!status.success());
}

#[test]
fn invalid_config_file_is_rejected() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("config.toml");
    fs::write(&config, "version = 1\n[scroll]\npage_height = 0\n").unwrap();

    let result = nebshade(&root)
        .arg("--config")
        .arg(&config)
        .arg("check")
        .output()
        .expect("failed to run nebshade");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("scroll.page_height"), "unexpected stderr:\n{stderr}");
}
