use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-env-changed=VOSK_LIB_DIR");
    println!("cargo:rerun-if-env-changed=VOSK_LIB_PATH");

    // libvosk is only linked when the streaming decoder is compiled in.
    if env::var_os("CARGO_FEATURE_VOSK_STT").is_none() {
        return;
    }

    if let Ok(lib_path) = env::var("VOSK_LIB_PATH") {
        let path = PathBuf::from(lib_path);
        if let Some(dir) = path.parent() {
            println!("cargo:rustc-link-search=native={}", dir.display());
        }
    }

    if let Ok(lib_dir) = env::var("VOSK_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", lib_dir);
    }

    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        let local_dir = PathBuf::from(manifest_dir).join("libs").join("vosk");
        if local_dir.exists() {
            println!("cargo:rustc-link-search=native={}", local_dir.display());
        }
    }
}
