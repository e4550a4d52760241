//! Build script for detecting system dependencies and providing installation guidance.
//!
//! Checks for OpenCV (via pkg-config) and reports how ONNX Runtime will be
//! provided. Missing libraries only produce warnings; the linker has the final say.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Check for pkg-config first, OpenCV discovery relies on it
    let have_pkg_config = check_pkg_config();

    if have_pkg_config {
        check_opencv();
    }

    check_onnx_runtime();

    // Print detected environment
    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn pkg_config_version(package: &str) -> Option<String> {
    let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    match pkg_config_version("opencv4").or_else(|| pkg_config_version("opencv")) {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }
}

fn check_onnx_runtime() {
    println!("cargo:rerun-if-env-changed=ORT_LIB_LOCATION");
    println!("cargo:rerun-if-env-changed=ORT_PREFER_DYNAMIC_LINK");

    match env::var("ORT_LIB_LOCATION") {
        Ok(location) => println!("cargo:warning=Using ONNX Runtime from {location}"),
        Err(_) if env::var("ORT_PREFER_DYNAMIC_LINK").is_ok() => {
            println!("cargo:warning=ORT_PREFER_DYNAMIC_LINK without ORT_LIB_LOCATION; ONNX Runtime must be on the system library path");
        }
        // Prebuilt binaries are downloaded by the ort crate
        Err(_) => {}
    }
}

fn check_pkg_config() -> bool {
    let output = Command::new("pkg-config").arg("--version").output();

    match output {
        Ok(output) if output.status.success() => true,
        _ => {
            println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
            false
        }
    }
}
