use tracing_subscriber::EnvFilter;

use zova::app;
use zova::settings::SettingsStore;

/// Terminal entry point.
///
/// Logs go to stderr so the transcript on stdout stays readable.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_store = SettingsStore::load();
    tracing::debug!(path = %settings_store.config_path().display(), "settings loaded");

    if let Err(error) = app::run(settings_store.settings()).await {
        tracing::error!(error = %error, "chat session failed");
        std::process::exit(1);
    }
}
