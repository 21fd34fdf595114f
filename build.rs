//! Build script for labconv
//!
//! Increments build number on each recompilation and embeds build metadata.

use std::fs;
use std::path::Path;

fn main() {
    // Only rerun when src/ files change
    println!("cargo:rerun-if-changed=src");

    // Counter persisted between builds
    let build_number_path = Path::new("build_number.txt");

    // A missing or unreadable counter restarts at 0
    let current_build: u64 = if build_number_path.exists() {
        fs::read_to_string(build_number_path)
            .unwrap_or_else(|_| "0".to_string())
            .trim()
            .parse()
            .unwrap_or(0)
    } else {
        0
    };

    let new_build = current_build + 1;

    // Persist the bumped counter for the next build
    fs::write(build_number_path, new_build.to_string())
        .expect("Failed to write build number file");

    // UTC compile time in ISO 8601
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    // Read back in build_info.rs via option_env!
    println!("cargo:rustc-env=LABCONV_BUILD_NUMBER={}", new_build);
    println!("cargo:rustc-env=LABCONV_BUILD_TIMESTAMP={}", timestamp);
}
