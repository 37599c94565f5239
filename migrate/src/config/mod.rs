mod connection;
mod settings;

pub use connection::ConnectionConfig;
pub use settings::MigrationSettings;
