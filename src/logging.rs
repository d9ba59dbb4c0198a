pub use log::Level;

/// Console-backed logger for browser builds. Host applications install it
/// once at startup:
/// `logging::wasm::init(logging::wasm::Config::default().prefer_target())`.
pub mod wasm {
	pub struct Config {
		level: log::LevelFilter,
		prefer_target: bool,
	}

	impl Default for Config {
		fn default() -> Self {
			Self {
				level: log::LevelFilter::Debug,
				prefer_target: false,
			}
		}
	}

	impl Config {
		pub fn level(mut self, level: log::LevelFilter) -> Self {
			self.level = level;
			self
		}

		/// Label lines with the statement's target instead of its module
		/// path, so owners read as `[auth]` rather than a full crate path.
		pub fn prefer_target(mut self) -> Self {
			self.prefer_target = true;
			self
		}
	}

	struct Console {
		config: Config,
	}

	impl log::Log for Console {
		fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
			metadata.level() <= self.config.level
		}

		fn log(&self, record: &log::Record<'_>) {
			if !self.enabled(record.metadata()) {
				return;
			}
			let origin = match self.config.prefer_target && !record.target().is_empty() {
				true => record.target(),
				false => record.module_path().unwrap_or("unknown"),
			};
			let line = wasm_bindgen::JsValue::from_str(&format!("[{origin}] {}", record.args()));
			match record.level() {
				log::Level::Error => web_sys::console::error_1(&line),
				log::Level::Warn => web_sys::console::warn_1(&line),
				log::Level::Info => web_sys::console::info_1(&line),
				log::Level::Debug => web_sys::console::log_1(&line),
				log::Level::Trace => web_sys::console::debug_1(&line),
			}
		}

		fn flush(&self) {}
	}

	pub fn init(config: Config) {
		let level = config.level;
		if log::set_boxed_logger(Box::new(Console { config })).is_ok() {
			log::set_max_level(level);
		}
	}
}
