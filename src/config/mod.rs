mod settings;

pub use settings::{LogFormat, LoggingConfig, RoomConfig, ServerConfig, Settings, WebSocketConfig};
