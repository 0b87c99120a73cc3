use crate::config::ConfigError;
use std::env;
use std::str::FromStr;

/// Read a variable, treating unset and blank values alike
pub fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_optional(key).unwrap_or_else(|| default.to_string())
}

pub fn get_env_required(key: &str, hint: &str) -> Result<String, ConfigError> {
    get_env_optional(key).ok_or_else(|| ConfigError::missing_env_var(key, hint))
}

/// Parse a variable with `FromStr`, falling back to `default` when unset.
///
/// `field` names the config field in the resulting error, `expected`
/// describes the accepted values.
pub fn parse_env<T: FromStr>(
    key: &str,
    field: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match get_env_optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::invalid_value(field, raw, expected)),
    }
}

/// Parse a boolean flag; accepts true/false, 1/0, yes/no, on/off
pub fn parse_env_bool(key: &str, field: &str, default: bool) -> Result<bool, ConfigError> {
    match get_env_optional(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid_value(field, raw, "true or false")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_blank_values_fall_back_to_default() {
        env::set_var("INKPOST_TEST_BLANK", "   ");
        assert_eq!(get_env_or_default("INKPOST_TEST_BLANK", "fallback"), "fallback");
        assert!(get_env_optional("INKPOST_TEST_BLANK").is_none());
        env::remove_var("INKPOST_TEST_BLANK");
    }

    #[test]
    #[serial]
    fn test_parse_env_reports_field_and_value() {
        env::set_var("INKPOST_TEST_PORT", "eighty");
        let err = parse_env::<u16>("INKPOST_TEST_PORT", "port", 3000, "valid port number")
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { field, value, .. } => {
                assert_eq!(field, "port");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        env::set_var("INKPOST_TEST_PORT", "8080");
        assert_eq!(
            parse_env::<u16>("INKPOST_TEST_PORT", "port", 3000, "valid port number").unwrap(),
            8080
        );
        env::remove_var("INKPOST_TEST_PORT");
        assert_eq!(
            parse_env::<u16>("INKPOST_TEST_PORT", "port", 3000, "valid port number").unwrap(),
            3000
        );
    }

    #[test]
    #[serial]
    fn test_parse_env_bool_variants() {
        for (raw, expected) in [("yes", true), ("ON", true), ("0", false), ("false", false)] {
            env::set_var("INKPOST_TEST_FLAG", raw);
            assert_eq!(parse_env_bool("INKPOST_TEST_FLAG", "flag", !expected).unwrap(), expected);
        }
        env::set_var("INKPOST_TEST_FLAG", "maybe");
        assert!(parse_env_bool("INKPOST_TEST_FLAG", "flag", false).is_err());
        env::remove_var("INKPOST_TEST_FLAG");
    }

    #[test]
    #[serial]
    fn test_required_variable() {
        env::remove_var("INKPOST_TEST_REQUIRED");
        assert!(matches!(
            get_env_required("INKPOST_TEST_REQUIRED", "set it"),
            Err(ConfigError::MissingEnvVar { .. })
        ));
        env::set_var("INKPOST_TEST_REQUIRED", "value");
        assert_eq!(get_env_required("INKPOST_TEST_REQUIRED", "set it").unwrap(), "value");
        env::remove_var("INKPOST_TEST_REQUIRED");
    }
}
