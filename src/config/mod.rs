mod settings;

pub use settings::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DESTINATION_NAME, DestinationConfig, LogConfig, Settings,
    SourceConfig, WorkspaceCredential, load_settings, load_settings_from,
};
