use std::process::Command;

use anyhow::{Context, Result};

const PACKAGE: &str = "authway-client";

const FEATURE_COMBINATIONS: &[&[&str]] = &[
    &[],
    &["keychain"],
    &["test-utils"],
    &["keychain", "test-utils"],
];

/// The browser host only exists on this target.
const WASM_TARGET: &str = "wasm32-unknown-unknown";

/// Check that every supported host feature combination compiles, natively
/// and for the browser.
pub fn check_feature_matrix() -> Result<()> {
    println!("Checking {} {PACKAGE} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let label = if features.is_empty() { "default" } else { joined.as_str() };

        println!("\n[{}/{}] {PACKAGE} [{label}]", index + 1, FEATURE_COMBINATIONS.len());

        let mut command = Command::new("cargo");
        command.args(["check", "-p", PACKAGE, "--all-targets"]);
        if !features.is_empty() {
            command.args(["--features", joined.as_str()]);
        }

        let status =
            command.status().with_context(|| format!("Failed to run cargo check for '{label}'"))?;
        if !status.success() {
            anyhow::bail!("Feature combination '{label}' failed to compile");
        }
    }

    check_wasm()?;

    println!("\n✅ All feature combinations compile");
    Ok(())
}

/// Check the `web` host against the browser target.
///
/// Needs the target installed: `rustup target add wasm32-unknown-unknown`.
fn check_wasm() -> Result<()> {
    println!("\n[wasm] {PACKAGE} [web] --target {WASM_TARGET}");

    let status = Command::new("cargo")
        .args(["check", "-p", PACKAGE, "--lib", "--target", WASM_TARGET, "--features", "web"])
        .status()
        .context("Failed to run cargo check for the wasm target")?;
    if !status.success() {
        anyhow::bail!("{PACKAGE} [web] failed to compile for {WASM_TARGET}");
    }
    Ok(())
}
