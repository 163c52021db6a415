use reqwest::Url;

use crate::app_config::{AppConfig, Environment, HomeView};
use crate::feature::LngLat;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(var, "must be a finite number".to_string()))
        }
    };

    let api_base_url = require("FRUITFALL_API_BASE_URL")?;
    let parsed = Url::parse(&api_base_url).map_err(|e| {
        invalid(
            "FRUITFALL_API_BASE_URL",
            format!("'{api_base_url}' is not a valid URL: {e}"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(
            "FRUITFALL_API_BASE_URL",
            format!("expected an http(s) URL, got scheme '{}'", parsed.scheme()),
        ));
    }

    let env = parse_environment(&or_default("FRUITFALL_ENV", "development"))?;
    let log_level = or_default("FRUITFALL_LOG_LEVEL", "info");
    let user_agent = or_default("FRUITFALL_USER_AGENT", "fruitfall/0.1 (map-client)");
    let connect_timeout_secs = parse_u64("FRUITFALL_CONNECT_TIMEOUT_SECS", "10")?;

    let cluster_max_zoom = or_default("FRUITFALL_CLUSTER_MAX_ZOOM", "14")
        .parse::<u8>()
        .map_err(|e| invalid("FRUITFALL_CLUSTER_MAX_ZOOM", e.to_string()))?;
    // Zoom levels are packed into 5 bits of a cluster id.
    if cluster_max_zoom > 30 {
        return Err(invalid(
            "FRUITFALL_CLUSTER_MAX_ZOOM",
            format!("must be at most 30, got {cluster_max_zoom}"),
        ));
    }

    let cluster_radius = parse_u32("FRUITFALL_CLUSTER_RADIUS", "50")?;
    if cluster_radius == 0 {
        return Err(invalid(
            "FRUITFALL_CLUSTER_RADIUS",
            "must be greater than zero".to_string(),
        ));
    }

    let load_poll_interval_ms = parse_u64("FRUITFALL_LOAD_POLL_INTERVAL_MS", "1000")?;
    if load_poll_interval_ms == 0 {
        return Err(invalid(
            "FRUITFALL_LOAD_POLL_INTERVAL_MS",
            "must be greater than zero".to_string(),
        ));
    }

    let default_home = HomeView::default();
    let center = match lookup("FRUITFALL_HOME_CENTER") {
        Ok(raw) => parse_lng_lat(&raw).map_err(|reason| invalid("FRUITFALL_HOME_CENTER", reason))?,
        Err(_) => default_home.center,
    };
    let zoom = parse_f64("FRUITFALL_HOME_ZOOM", "5")?;

    Ok(AppConfig {
        env,
        log_level,
        api_base_url,
        user_agent,
        connect_timeout_secs,
        cluster_max_zoom,
        cluster_radius,
        load_poll_interval_ms,
        home_view: HomeView { center, zoom },
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FRUITFALL_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse `"lon,lat"` into a position, rejecting out-of-range values.
fn parse_lng_lat(raw: &str) -> Result<LngLat, String> {
    let (lng, lat) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected 'lon,lat', got '{raw}'"))?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("coordinates out of range: {lng},{lat}"));
    }
    Ok(LngLat::new(lng, lat))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
