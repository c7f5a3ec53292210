//! Build script for storefront crate.
//!
//! Hashes the stylesheet so templates can link `main.css?v={hash}` and the
//! browser refetches it only when it changes.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    hash_css();
}

/// Hash main.css and expose the first 8 hex characters as `CSS_HASH`.
fn hash_css() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=CSS_HASH=dev");
        return;
    };
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");

    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = match fs::read(&css_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read main.css: {e}");
            println!("cargo:rustc-env=CSS_HASH=dev");
            return;
        }
    };

    let digest = Sha256::digest(&content);
    let short_hash: String = digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect();

    println!("cargo:rustc-env=CSS_HASH={short_hash}");
}
