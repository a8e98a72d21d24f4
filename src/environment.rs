use strum::{Display, EnumString};

/// Deployment environment, selects `config/<environment>.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub fn config_file(self) -> String {
        format!("config/{self}")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_environment_parses_snake_case_names() {
        assert_eq!(
            Environment::from_str("production").ok(),
            Some(Environment::Production)
        );
        assert!(Environment::from_str("staging").is_err());
    }

    #[test]
    fn test_config_file_follows_environment_name() {
        assert_eq!(Environment::Test.config_file(), "config/test");
    }
}
