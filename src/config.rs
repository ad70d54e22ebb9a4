use crate::error::{Error, Result};
use crate::executor::PanicStrategy;

const MIN_STACK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,

    /// Finalize the outcome as soon as every task has finished.
    pub auto_close: bool,
    pub overall_progress: bool,
    pub panic_strategy: PanicStrategy,

    #[cfg(feature = "telemetry")]
    pub enable_telemetry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name_prefix: "veda-task".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            auto_close: true,
            overall_progress: false,
            panic_strategy: PanicStrategy::default(),

            #[cfg(feature = "telemetry")]
            enable_telemetry: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(Error::config(format!(
                    "stack_size too small ({} < {})",
                    size, MIN_STACK_SIZE
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn default_stack_size(mut self) -> Self {
        self.config.stack_size = None;
        self
    }

    pub fn auto_close(mut self, enable: bool) -> Self {
        self.config.auto_close = enable;
        self
    }

    pub fn overall_progress(mut self, enable: bool) -> Self {
        self.config.overall_progress = enable;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    #[cfg(feature = "telemetry")]
    pub fn enable_telemetry(mut self, enable: bool) -> Self {
        self.config.enable_telemetry = enable;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
