use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()))
    }

    /// Anything that is not recognisably production falls back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is unset or does not parse.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_environment() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("PROD"), Environment::Production);
        assert_eq!(Environment::parse(" Production "), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for environment in [Environment::Development, Environment::Production] {
            assert_eq!(Environment::parse(environment.as_str()), environment);
        }
    }

    #[test]
    #[serial]
    fn test_env_or_falls_back_on_garbage() {
        unsafe {
            env::set_var("COMMON_TEST_PORT", "not-a-number");
        }
        assert_eq!(env_or("COMMON_TEST_PORT", 5000u16), 5000);

        unsafe {
            env::set_var("COMMON_TEST_PORT", "8081");
        }
        assert_eq!(env_or("COMMON_TEST_PORT", 5000u16), 8081);

        unsafe {
            env::remove_var("COMMON_TEST_PORT");
        }
        assert_eq!(env_or("COMMON_TEST_PORT", 5000u16), 5000);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_to_development() {
        unsafe {
            env::remove_var("ENVIRONMENT");
        }
        assert_eq!(Environment::from_env(), Environment::Development);

        unsafe {
            env::set_var("ENVIRONMENT", "production");
        }
        assert_eq!(Environment::from_env(), Environment::Production);

        unsafe {
            env::remove_var("ENVIRONMENT");
        }
    }
}
