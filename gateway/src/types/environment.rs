//! Environment configuration for different deployment stages.

use std::env;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Production environment.
    Production,
    /// Staging environment.
    Staging,
    /// Development environment.
    Development,
}

/// Application configuration, loaded once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    stage: Stage,
    port: u16,
    disable_auth: bool,
    enable_resource_acl: bool,
}

impl Environment {
    /// Builds the environment from process environment variables.
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` is set to anything other than `production`, `staging` or
    /// `development`, or if `PORT` is set but isn't a valid `u16`.
    #[must_use]
    pub fn from_env() -> Self {
        let stage = match env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "production" => Stage::Production,
            "staging" => Stage::Staging,
            "development" => Stage::Development,
            other => panic!("Invalid environment: {other}"),
        };

        let port = env::var("PORT")
            .ok()
            .map_or(8000, |p| p.parse().expect("PORT must be a valid u16"));

        let disable_auth = env::var("DISABLE_AUTH").is_ok_and(|v| v == "true" || v == "1");
        let enable_resource_acl = env::var("ENABLE_RESOURCE_ACL").is_none_or(|v| v != "false" && v != "0");

        Self { stage, port, disable_auth, enable_resource_acl }
    }

    /// Whether to show `/docs` and `/openapi.json`.
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self.stage, Stage::Development | Stage::Staging)
    }

    /// Whether auth is disabled. When set, the bearer token is taken as the caller's
    /// username directly and granted the admin role, bypassing the store lookup. Dev
    /// convenience only; never set in production.
    #[must_use]
    pub const fn disable_auth(&self) -> bool {
        self.disable_auth
    }

    /// Whether per-resource ACL checks (topic/subscription ACLs, beyond role checks)
    /// are enforced.
    #[must_use]
    pub const fn enable_resource_acl(&self) -> bool {
        self.enable_resource_acl
    }

    /// TCP port to bind the HTTP server to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}
