use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
}

impl Config {
    /// `profile_override` (the CLI flag) wins over the PROFILE variable.
    pub fn from_env_with(profile_override: Option<String>) -> Self {
        let profile = profile_override
            .or_else(|| env::var("PROFILE").ok())
            .unwrap_or_else(|| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://librarium.db?mode=rwc".to_string()
            } else {
                format!("sqlite://librarium_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn cli_profile_override_selects_the_database_file() {
        let config = Config::from_env_with(Some("demo".to_string()));
        assert_eq!(config.profile, "demo");
        assert!(config.database_url.contains("librarium_demo.db"));
    }
}
