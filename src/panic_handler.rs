use std::io::{self, Write};
use std::panic;

/// Install the process panic hook.
///
/// Debug builds get `better_panic` backtraces; release builds write a
/// `human_panic` crash report instead of dumping a backtrace on the user.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!(
            human_panic::Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        );
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("Panic: {panic_info}");
        flush_output();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Make sure partial CLI output is not lost when we abort
pub fn flush_output() {
    let _ = io::stdout().flush();
    let _ = writeln!(io::stderr());
}
