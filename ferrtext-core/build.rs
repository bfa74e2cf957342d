use flate2::read::GzDecoder;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Archive;

const PDFIUM_BASE_URL: &str =
    "https://github.com/bblanchon/pdfium-binaries/releases/download/chromium/6721";

const PDFIUM_LIB_PATH_ENV_NAME: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Opt-out for offline builds.
const SKIP_DOWNLOAD_ENV_NAME: &str = "FERRTEXT_SKIP_PDFIUM_DOWNLOAD";

fn archive_name() -> Option<String> {
    let target_os = env::var("CARGO_CFG_TARGET_OS").ok()?;
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").ok()?;

    let platform = match target_os.as_str() {
        "macos" => "mac",
        "linux" => "linux",
        "windows" => "win",
        _ => return None,
    };
    let arch = match target_arch.as_str() {
        "aarch64" => "arm64",
        "x86_64" => "x64",
        "x86" => "x86",
        "arm" if platform == "linux" => "arm",
        _ => return None,
    };

    Some(format!("pdfium-{platform}-{arch}.tgz"))
}

fn workspace_lib_dir() -> Result<PathBuf, String> {
    let manifest_dir = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR")
            .map_err(|e| format!("Failed to get CARGO_MANIFEST_DIR: {}", e))?,
    );
    manifest_dir
        .parent()
        .map(|p| p.join("lib"))
        .ok_or_else(|| String::from("Failed to find parent directory of CARGO_MANIFEST_DIR"))
}

fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn download(url: &str, target: &Path) -> Result<(), String> {
    let response = reqwest::blocking::get(url)
        .map_err(|e| format!("Failed to download pdfium library: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("HTTP status {} for {}", response.status(), url));
    }

    let bytes = response
        .bytes()
        .map_err(|e| format!("Failed to get response bytes: {}", e))?;
    fs::write(target, &bytes).map_err(|e| format!("Failed to write pdfium archive: {}", e))
}

fn unpack(archive: &Path, into: &Path) -> Result<(), String> {
    let file = File::open(archive).map_err(|e| format!("Failed to open tarball file: {}", e))?;
    Archive::new(GzDecoder::new(file))
        .unpack(into)
        .map_err(|e| format!("Failed to extract pdfium library: {}", e))
}

fn provision(lib_dir: &Path) -> Result<(), String> {
    let name = archive_name().ok_or_else(|| String::from("no prebuilt pdfium for this target"))?;
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|e| e.to_string())?);
    let unpack_dir = out_dir.join("pdfium");
    fs::create_dir_all(&unpack_dir).map_err(|e| format!("Failed to create pdfium directory: {}", e))?;

    let archive = out_dir.join("pdfium.tgz");
    download(&format!("{PDFIUM_BASE_URL}/{name}"), &archive)?;
    unpack(&archive, &unpack_dir)?;

    fs::remove_dir_all(lib_dir).ok();
    fs::rename(unpack_dir.join("lib"), lib_dir)
        .map_err(|e| format!("Failed to move library to workspace: {}", e))
}

/// Places a prebuilt pdfium in `<workspace>/lib` unless one is already
/// available. A failure only produces a warning: pdfium is bound at runtime.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={PDFIUM_LIB_PATH_ENV_NAME}");
    println!("cargo:rerun-if-env-changed={SKIP_DOWNLOAD_ENV_NAME}");

    if env::var_os(PDFIUM_LIB_PATH_ENV_NAME).is_some() || env::var_os(SKIP_DOWNLOAD_ENV_NAME).is_some() {
        return;
    }

    let lib_dir = match workspace_lib_dir() {
        Ok(dir) => dir,
        Err(err) => {
            println!("cargo:warning={err}");
            return;
        }
    };
    if is_populated(&lib_dir) {
        return;
    }

    if let Err(err) = provision(&lib_dir) {
        println!("cargo:warning=pdfium was not downloaded ({err}); set {PDFIUM_LIB_PATH_ENV_NAME} at runtime");
    }
}
