// Adapters - External system implementations

pub mod direct_backend;
pub mod http_source;
pub mod memory;
pub mod simulated;
pub mod stream_backend;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use direct_backend::DirectBackend;
pub use http_source::HttpDurationSource;
pub use memory::{
    MemoryTrimStore, RecordingNotifier, RecordingSessionListener, StaticAssetLoader,
    StaticDurationSource,
};
pub use simulated::{SimulatedBackendFactory, SimulatedCaptureDevice, SimulatedMedia};
pub use stream_backend::ManagedStreamBackend;
pub use toml_config::{EngineConfig, TomlConfigAdapter};
pub use tracing_log::{init_tracing, TracingLogAdapter};
