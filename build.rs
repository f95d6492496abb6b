//! Build script for spotcollect.
//!
//! Copies `.env.example` into the local data directory
//! (`dirs::data_local_dir()/spotcollect`), next to the `.env` the binary
//! loads at startup, so a fresh install has a configuration template in the
//! expected location.

use std::{env, fs, path::PathBuf};

/// Copies the configuration template. A missing template only produces a
/// cargo warning; directory or copy failures fail the build.
///
/// Destination per platform:
/// - Linux: `~/.local/share/spotcollect/.env.example`
/// - macOS: `~/Library/Application Support/spotcollect/.env.example`
/// - Windows: `%LOCALAPPDATA%/spotcollect/.env.example`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("spotcollect");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
