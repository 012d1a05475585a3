//! `log` backend that writes to the browser console on wasm and to stderr
//! everywhere else.

use log::{LevelFilter, Log, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());

        #[cfg(target_arch = "wasm32")]
        {
            use log::Level;

            let value = wasm_bindgen::JsValue::from_str(&line);
            match record.level() {
                Level::Error => web_sys::console::error_1(&value),
                Level::Warn => web_sys::console::warn_1(&value),
                Level::Info => web_sys::console::info_1(&value),
                Level::Debug | Level::Trace => web_sys::console::log_1(&value),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            eprintln!("{line}");
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. Returns `false` if another logger already owns
/// the `log` facade (a second call is harmless).
pub fn install(level: LevelFilter) -> bool {
    match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(level);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected_quietly() {
        let _ = install(LevelFilter::Warn);
        assert!(!install(LevelFilter::Warn));
    }
}
