//! Build identification for agrivision-client
//!
//! Exposes to the crate:
//! - `GIT_HASH`: `git describe` of the checkout, `-modified` when dirty
//! - `BUILD_TIMESTAMP`: UTC, second precision
//! - `BUILD_PROFILE`: cargo profile
//! - `AGRIVISION_BUILD_ID`: `<version>+<hash>.<profile>`, sent as the HTTP user agent

use std::path::Path;
use std::process::Command;

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--abbrev=8", "--dirty=-modified"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    (!described.is_empty()).then(|| described.to_string())
}

fn main() {
    let git_hash = git_describe().unwrap_or_else(|| "nogit".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", built_at);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    println!(
        "cargo:rustc-env=AGRIVISION_BUILD_ID={}+{}.{}",
        version, git_hash, profile
    );

    // Workspace checkout lives one level up
    for head in ["../.git/HEAD", "../.git/index"] {
        if Path::new(head).exists() {
            println!("cargo:rerun-if-changed={}", head);
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
