use std::panic;

/// Route panics through `tracing` before the default hook runs
///
/// A panicking task is torn down by tokio while the process keeps serving, so
/// the log line is the only trace the failure leaves behind.
pub fn install_panic_logger() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        tracing::error!(location = %location, panic = %payload, "Uncaught panic");
        default_hook(info);
    }));
}
