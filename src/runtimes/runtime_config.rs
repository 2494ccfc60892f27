use crate::event_bus::{EventBus, EventSink, MemorySink, StdOutSink};

/// Execution settings carried by a compiled app.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Maximum nodes in flight per superstep; `None` means the host's
    /// available parallelism.
    pub concurrency_limit: Option<usize>,
    /// Event bus layout built per run.
    pub event_bus: EventBusConfig,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new(concurrency_limit: Option<usize>) -> Self {
        Self {
            concurrency_limit,
            event_bus: EventBusConfig::default(),
        }
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, concurrency_limit: Option<usize>) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    #[must_use]
    pub fn with_stdout_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_stdout_only())
    }

    #[must_use]
    pub fn with_memory_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_memory_sink())
    }
}

/// Sink kinds the runtime can construct on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
}

/// Declarative event bus layout; an [`EventBus`] is built from it per run.
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl EventBusConfig {
    #[must_use]
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self::new(vec![SinkConfig::StdOut])
    }

    #[must_use]
    pub fn with_memory_sink() -> Self {
        Self::new(vec![SinkConfig::StdOut, SinkConfig::Memory])
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    /// Materialize an event bus with the configured sinks.
    pub fn build_event_bus(&self) -> EventBus {
        let sinks: Vec<Box<dyn EventSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink::default()) as Box<dyn EventSink>,
                SinkConfig::Memory => Box::new(MemorySink::new()) as Box<dyn EventSink>,
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}
