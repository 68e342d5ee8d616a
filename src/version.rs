/// Release version, taken from `APP_VERSION` at build time when set and from
/// the crate version otherwise.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
