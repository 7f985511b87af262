//! Development automation for the Authway workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! Output goes to the terminal with `println!`/`eprintln!`; this binary is a
//! developer tool, not part of the engine.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::{env, fs};

use anyhow::{Context, Result};

mod features;

/// Where `ts-rs` writes bindings for the domain crate
const BINDINGS_DIR: &str = "crates/domain/bindings";

fn main() -> ExitCode {
    let task = env::args().nth(1);
    let out_dir = env::args().nth(2);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("test-features") => features::check_feature_matrix(),
        Some("codegen") => run_codegen(out_dir.as_deref()),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}\n");
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("Authway Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK> [ARGS]");
    println!();
    println!("TASKS:");
    println!("    ci              fmt, clippy, feature matrix and tests");
    println!("    fmt             Check Rust code formatting");
    println!("    clippy          Run Clippy lints on all targets");
    println!("    test            Run workspace tests with test-utils enabled");
    println!("    test-features   Check authway-client feature combinations (incl. wasm32 + web)");
    println!("    codegen [DIR]   Export AuthState/User TypeScript types (default: {BINDINGS_DIR})");
    println!("    help            Show this help message");
}

fn run_ci() -> Result<()> {
    let steps: [(&str, fn() -> Result<()>); 4] = [
        ("Checking Rust format", run_fmt),
        ("Running Clippy", run_clippy),
        ("Checking feature matrix", features::check_feature_matrix),
        ("Running tests", run_test),
    ];

    for (index, (label, step)) in steps.iter().enumerate() {
        println!("\n==> Step {}/{}: {label}...", index + 1, steps.len());
        step()?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("cargo {} failed", args.join(" "));
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"]).context("Run 'cargo fmt --all' to fix")
}

fn run_clippy() -> Result<()> {
    // `web` is wasm32 only; `test-features` covers it.
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--features",
        "authway-client/keychain,authway-client/test-utils",
    ])
}

fn run_test() -> Result<()> {
    cargo(&["test", "--workspace", "--features", "authway-client/test-utils"])
}

/// Generate TypeScript declarations for the observable state so a UI layer
/// can type its subscriptions.
fn run_codegen(out_dir: Option<&str>) -> Result<()> {
    println!("==> Exporting TypeScript bindings...");
    cargo(&["test", "-p", "authway-domain", "--features", "ts-gen", "--lib"])
        .context("TypeScript export tests failed")?;

    let bindings = PathBuf::from(BINDINGS_DIR);
    if !bindings.exists() {
        anyhow::bail!("No bindings at {}; did ts-rs export run?", bindings.display());
    }

    let target = out_dir.map_or_else(|| bindings.clone(), PathBuf::from);
    if target != bindings {
        copy_bindings(&bindings, &target)?;
    }
    write_index(&target)?;

    println!("✓ Bindings written to {}", target.display());
    Ok(())
}

fn ts_modules(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut modules: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension()?.to_str()? != "ts" {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            (stem != "index").then(|| stem.to_string())
        })
        .collect();
    modules.sort();
    Ok(modules)
}

fn copy_bindings(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    for module in ts_modules(src)? {
        let file = format!("{module}.ts");
        fs::copy(src.join(&file), dest.join(&file))
            .with_context(|| format!("Failed to copy {file}"))?;
    }
    Ok(())
}

fn write_index(dir: &Path) -> Result<()> {
    let modules = ts_modules(dir)?;
    let mut content = String::from("// Generated by `cargo xtask codegen`. Do not edit.\n\n");
    for module in &modules {
        let _ = writeln!(content, "export type {{ {module} }} from './{module}';");
    }

    let index = dir.join("index.ts");
    fs::write(&index, content).with_context(|| format!("Failed to write {}", index.display()))?;
    println!("  index.ts exports {} types", modules.len());
    Ok(())
}
