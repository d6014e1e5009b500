mod settings;

pub use settings::{AttachConfig, CaptureConfig, Config, RestoreConfig, TomlConfig, EXAMPLE_CONFIG};
