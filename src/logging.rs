use log::LevelFilter;

pub const LOG_TAG: &str = "DeviceParts";

/// Initialize logging: logcat on Android, stderr elsewhere.
#[cfg(target_os = "android")]
pub fn init(verbose: bool) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(level(verbose))
            .with_tag(LOG_TAG),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init(verbose: bool) {
    // RUST_LOG still wins when set.
    let _ = env_logger::Builder::new()
        .filter_level(level(verbose))
        .parse_default_env()
        .format_target(false)
        .try_init();
    log::debug!("{}: logging to stderr", LOG_TAG);
}

fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
