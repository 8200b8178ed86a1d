fn main() {
    // ESP-IDF link arguments are only needed for the on-target build; host
    // builds (simulator, tests) skip embuild entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
