use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Index range order when harvesting by range
/// - Reporting year sanity
/// - Non-empty downloads directory and portal URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.portal.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "portal.base_url cannot be empty".to_string(),
        ));
    }

    if config.portal.year < 2015 {
        return Err(ConfigError::ValidationError(format!(
            "portal.year {} predates the portal",
            config.portal.year
        )));
    }

    if config.batch.downloads_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "batch.downloads_dir cannot be empty".to_string(),
        ));
    }

    // The range only matters when neither an organization nor a list is
    // configured.
    if config.batch.organization.is_none()
        && config.batch.organization_list.is_none()
        && config.batch.from > config.batch.to
    {
        return Err(ConfigError::ValidationError(format!(
            "batch.from ({}) must not exceed batch.to ({})",
            config.batch.from, config.batch.to
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_inverted_range_fails() {
        let mut config = Config::default();
        config.batch.from = 10;
        config.batch.to = 2;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_inverted_range_ignored_with_explicit_organization() {
        let mut config = Config::default();
        config.batch.from = 10;
        config.batch.to = 2;
        config.batch.organization = Some("OrgX".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_ancient_year_fails() {
        let mut config = Config::default();
        config.portal.year = 1999;
        assert!(validate_config(&config).is_err());
    }
}
