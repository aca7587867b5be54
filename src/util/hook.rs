use tracing::error;

/// Records panics in the log file before the default report is printed.
pub fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!(panic = %panic_info, "panic");
        hook(panic_info);
    }));
}
