fn main() {
    println!("cargo:rerun-if-changed=profiles/device.json");

    // Host builds (tests, fuzzing) have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
