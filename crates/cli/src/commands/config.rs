use claimdesk_core::config::{AppConfig, LoadOptions, LogFormat};

pub fn run(load_options: LoadOptions) -> String {
    match AppConfig::load(load_options) {
        Ok(config) => render(&config),
        Err(error) => format!("config error: {error}"),
    }
}

fn render(config: &AppConfig) -> String {
    let token_state = if config.auth.token.is_some() { "set (redacted)" } else { "unset" };
    let format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };

    [
        format!("api.base_url = {}", config.api.base_url),
        format!("api.timeout_secs = {}", config.api.timeout_secs),
        format!("auth.token = {token_state}"),
        format!("search.debounce_ms = {}", config.search.debounce_ms),
        format!("logging.level = {}", config.logging.level),
        format!("logging.format = {format}"),
    ]
    .join("\n")
}
