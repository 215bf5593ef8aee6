fn main() {
    // Shown in the startup log line and `--version` banner.
    let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");
    println!("cargo:rustc-env=BUILD_DATE={}", stamp);
    println!("cargo:rerun-if-changed=build.rs");
}
