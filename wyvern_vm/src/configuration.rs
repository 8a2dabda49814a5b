use std::time::Duration;

/// VM runtime configuration.
///
/// Bounds the scheduler's fairness (slice budget), the collection cadence
/// (tick interval), the server tick timeout and the listen port.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Bytecodes a fiber may execute per slice before yielding.
    pub slice_budget: usize,
    /// Scheduler ticks between collection cycles.
    pub gc_interval_ticks: u64,
    /// Bounded wait of one server tick.
    pub tick_timeout: Duration,
    /// TCP listen port.
    pub listen_port: u16,
}

impl Default for Configuration {
    /// Creates a default configuration.
    /// This sets:
    /// - `slice_budget` to 1000 bytecodes
    /// - `gc_interval_ticks` to 128 ticks
    /// - `tick_timeout` to 20 milliseconds
    /// - `listen_port` to 4242
    fn default() -> Self {
        Self {
            slice_budget: 1000,
            gc_interval_ticks: 128,
            tick_timeout: Duration::from_millis(20),
            listen_port: 4242,
        }
    }
}

/// Builder for [`Configuration`].
#[derive(Clone, Debug, Default)]
pub struct ConfigurationBuilder {
    configuration: Configuration,
}

impl ConfigurationBuilder {
    /// Create a builder seeded with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-slice bytecode budget.
    #[must_use]
    pub fn slice_budget(mut self, slice_budget: usize) -> Self {
        self.configuration.slice_budget = slice_budget;
        self
    }

    /// Set the number of ticks between collection cycles.
    #[must_use]
    pub fn gc_interval_ticks(mut self, gc_interval_ticks: u64) -> Self {
        self.configuration.gc_interval_ticks = gc_interval_ticks;
        self
    }

    /// Set the bounded wait of one server tick.
    #[must_use]
    pub fn tick_timeout(mut self, tick_timeout: Duration) -> Self {
        self.configuration.tick_timeout = tick_timeout;
        self
    }

    /// Set the TCP listen port.
    #[must_use]
    pub fn listen_port(mut self, listen_port: u16) -> Self {
        self.configuration.listen_port = listen_port;
        self
    }

    /// Finish the configuration.
    #[must_use]
    pub fn build(self) -> Configuration {
        self.configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let configuration = Configuration::default();
        assert_eq!(1000, configuration.slice_budget);
        assert_eq!(128, configuration.gc_interval_ticks);
        assert_eq!(Duration::from_millis(20), configuration.tick_timeout);
        assert_eq!(4242, configuration.listen_port);
    }

    #[test]
    fn test_builder_overrides() {
        let configuration = ConfigurationBuilder::new()
            .slice_budget(10)
            .gc_interval_ticks(4)
            .listen_port(4000)
            .build();
        assert_eq!(10, configuration.slice_budget);
        assert_eq!(4, configuration.gc_interval_ticks);
        assert_eq!(4000, configuration.listen_port);
    }
}
