// GeigerTelemetry - Build Script

fn main() {
    // ESP-IDF environment setup, only when the hardware half is built.
    // Cargo exposes enabled features here as CARGO_FEATURE_* env vars.
    if std::env::var("CARGO_FEATURE_ESP32").is_ok() {
        embuild::espidf::sysenv::output();
    }

    let version = env!("CARGO_PKG_VERSION");
    println!("cargo:rustc-env=VERSION_STRING=GeigerTelemetry v{}", version);
}
