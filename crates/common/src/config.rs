use std::env;
use std::str::FromStr;

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
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean switch: `1`, `true`, `yes` and `on` (any case) enable it.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // SAFETY (for the env mutations below): every test touching the process
    // environment is #[serial], so no other test thread reads it concurrently.

    #[test]
    #[serial]
    fn environment_defaults_to_development() {
        unsafe { env::remove_var("ENVIRONMENT") };
        assert_eq!(Environment::from_env(), Environment::Development);
    }

    #[test]
    #[serial]
    fn environment_accepts_prod_shorthand() {
        unsafe { env::set_var("ENVIRONMENT", "PROD") };
        assert_eq!(Environment::from_env(), Environment::Production);
        assert_eq!(Environment::from_env().as_str(), "production");
        unsafe { env::remove_var("ENVIRONMENT") };
    }

    #[test]
    #[serial]
    fn env_or_falls_back_on_garbage() {
        unsafe { env::set_var("COMMON_TEST_NUMBER", "not-a-number") };
        assert_eq!(env_or("COMMON_TEST_NUMBER", 7u32), 7);

        unsafe { env::set_var("COMMON_TEST_NUMBER", " 42 ") };
        assert_eq!(env_or("COMMON_TEST_NUMBER", 7u32), 42);

        unsafe { env::remove_var("COMMON_TEST_NUMBER") };
        assert_eq!(env_or("COMMON_TEST_NUMBER", 7u32), 7);
    }

    #[test]
    #[serial]
    fn env_flag_parses_common_spellings() {
        unsafe { env::set_var("COMMON_TEST_FLAG", "Yes") };
        assert!(env_flag("COMMON_TEST_FLAG", false));

        unsafe { env::set_var("COMMON_TEST_FLAG", "0") };
        assert!(!env_flag("COMMON_TEST_FLAG", true));

        unsafe { env::remove_var("COMMON_TEST_FLAG") };
        assert!(env_flag("COMMON_TEST_FLAG", true));
    }
}
