use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use solconnect_core::config::ConfigFile;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

const CONFIG_PATH: &str = "extension/extension.toml";
const DIST: &str = "dist";
const WASM_TARGET: &str = "wasm32-unknown-unknown";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "SolConnect extension task runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the wasm bundles into dist/
    Build {
        /// Debug build
        #[arg(long)]
        dev: bool,
    },

    /// Build, then write manifest, HTML shells and JS glue into dist/
    Package {
        /// Debug build
        #[arg(long)]
        dev: bool,
    },

    /// Validate extension.toml
    CheckConfig {
        #[arg(default_value = CONFIG_PATH)]
        path: String,
    },

    /// Run the core tests
    Test,

    /// Run clippy linter
    Clippy,

    /// Remove dist/
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { dev } => build(dev),
        Commands::Package { dev } => {
            build(dev)?;
            package()
        }
        Commands::CheckConfig { path } => check_config(&path),
        Commands::Test => test(),
        Commands::Clippy => clippy(),
        Commands::Clean => clean(),
    }
}

fn build(dev: bool) -> Result<()> {
    let profile = if dev { "--dev" } else { "--release" };

    println!("🔨 Building popup, connection page and content script...");
    run_cmd(
        "wasm-pack",
        &[
            "build",
            "extension",
            profile,
            "--target",
            "web",
            "--out-dir",
            "../dist/pkg",
            "--out-name",
            "solconnect_extension",
        ],
    )?;

    // The worker must not pull in Dioxus
    println!("🔨 Building background worker...");
    let mut args = vec![
        "build",
        "-p",
        "solconnect-extension",
        "--bin",
        "background",
        "--no-default-features",
        "--target",
        WASM_TARGET,
    ];
    if !dev {
        args.push("--release");
    }
    run_cmd("cargo", &args)?;

    let wasm = format!(
        "target/{}/{}/background.wasm",
        WASM_TARGET,
        if dev { "debug" } else { "release" }
    );
    run_cmd(
        "wasm-bindgen",
        &[
            wasm.as_str(),
            "--target",
            "web",
            "--out-dir",
            "dist/background",
            "--no-typescript",
        ],
    )?;

    println!("✅ Wasm bundles in {}/", DIST);
    Ok(())
}

fn package() -> Result<()> {
    let config = ConfigFile::load(CONFIG_PATH)?;
    println!("📦 Packaging extension into {}/", DIST);

    let manifest = json!({
        "manifest_version": 3,
        "name": "SolConnect",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Connect a Solana wallet to your browser",
        "permissions": ["storage", "tabs", "notifications"],
        "background": {
            "service_worker": "background.js",
            "type": "module"
        },
        "action": {
            "default_popup": "popup.html"
        },
        "content_scripts": [{
            "matches": ["<all_urls>"],
            "js": ["content.js"]
        }],
        "externally_connectable": {
            "matches": config.urls.match_patterns()
        },
        "web_accessible_resources": [{
            "resources": ["pkg/*"],
            "matches": ["<all_urls>"]
        }],
        "icons": {
            "128": "icons/icon128.png"
        }
    });
    write_file(
        "manifest.json",
        &serde_json::to_string_pretty(&manifest).context("Failed to encode manifest")?,
    )?;

    write_file("background.js", BACKGROUND_JS)?;
    write_file("content.js", CONTENT_JS)?;
    write_file("popup.html", &html_shell("SolConnect", "popup.js"))?;
    write_file("popup.js", &entry_module("launch_popup"))?;
    write_file(
        "wallet-connect.html",
        &html_shell("Connect your wallet", "wallet-connect.js"),
    )?;
    write_file("wallet-connect.js", &entry_module("launch_connect_page"))?;

    println!("✅ Load {}/ as an unpacked extension", DIST);
    Ok(())
}

fn check_config(path: &str) -> Result<()> {
    let config = ConfigFile::load(path)?;
    println!("✅ {} is valid", path);
    println!("   production:        {}", config.urls.production);
    println!("   alternate host:    {}", config.urls.alternate_host);
    println!("   local development: {}", config.urls.local_development);
    println!(
        "   welcome bonus: {}, gift card: {}",
        config.rewards.welcome_bonus, config.rewards.gift_card_points
    );
    println!(
        "   bridge poll: every {}ms for {}ms",
        config.bridge.poll_interval_ms, config.bridge.poll_window_ms
    );
    Ok(())
}

fn test() -> Result<()> {
    println!("🧪 Running core tests...");
    run_cmd("cargo", &["test", "-p", "solconnect-core"])?;
    Ok(())
}

fn clippy() -> Result<()> {
    println!("🔍 Running clippy on core and xtask (warnings as errors)...");
    run_cmd(
        "cargo",
        &[
            "clippy",
            "-p",
            "solconnect-core",
            "-p",
            "xtask",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )?;

    println!("🔍 Running clippy on the extension (wasm target)...");
    run_cmd(
        "cargo",
        &[
            "clippy",
            "-p",
            "solconnect-extension",
            "--target",
            WASM_TARGET,
            "--",
            "-D",
            "warnings",
        ],
    )?;
    Ok(())
}

fn clean() -> Result<()> {
    println!("🧹 Removing {}/...", DIST);
    if Path::new(DIST).exists() {
        fs::remove_dir_all(DIST).context("Failed to remove dist directory")?;
    }
    Ok(())
}

// Helper functions
fn run_cmd(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to run: {} {}", program, args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("Command failed: {} {}", program, args.join(" "));
    }

    Ok(())
}

fn write_file(name: &str, content: &str) -> Result<()> {
    let path = Path::new(DIST).join(name);
    fs::create_dir_all(DIST).context("Failed to create dist directory")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("   wrote {}", path.display());
    Ok(())
}

// Extension pages may not run inline scripts, so each shell gets a module
fn html_shell(title: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
</head>
<body>
  <div id="main"></div>
  <script type="module" src="{script}"></script>
</body>
</html>
"#
    )
}

fn entry_module(entry: &str) -> String {
    format!(
        r#"import init, {{ {entry} }} from "./pkg/solconnect_extension.js";

init().then(() => {entry}());
"#
    )
}

// Listeners register synchronously; service workers reject top-level await.
const BACKGROUND_JS: &str = r#"import init, { init_background, handle_install, handle_message } from "./background/background.js";

const ready = init().then(() => init_background());

chrome.runtime.onInstalled.addListener(() => {
  ready.then(() => handle_install());
});

chrome.runtime.onMessage.addListener((message, _sender, sendResponse) => {
  ready.then(() => handle_message(message, false)).then(sendResponse);
  return true;
});

chrome.runtime.onMessageExternal.addListener((message, _sender, sendResponse) => {
  ready.then(() => handle_message(message, true)).then(sendResponse);
  return true;
});
"#;

const CONTENT_JS: &str = r#"(async () => {
  const src = chrome.runtime.getURL("pkg/solconnect_extension.js");
  const wasm = await import(src);
  await wasm.default();
  wasm.start_content_script();
})();
"#;
