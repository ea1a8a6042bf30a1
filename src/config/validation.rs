use crate::config::types::{Config, FetchConfig, MirrorConfig, UserAgentConfig};
use crate::ConfigError;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_mirror_config(&config.mirror)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the mirror section: seed, scope prefixes, content root
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", config.seed_url, e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "seed-url must use HTTP or HTTPS, got '{}'",
            config.seed_url
        )));
    }

    if config.scope_prefixes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one scope prefix is required".to_string(),
        ));
    }

    for prefix in &config.scope_prefixes {
        let parsed = Url::parse(prefix).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid scope prefix '{}': {}", prefix, e))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Scope prefix '{}' must use HTTP or HTTPS",
                prefix
            )));
        }
    }

    if !config
        .scope_prefixes
        .iter()
        .any(|prefix| config.seed_url.starts_with(prefix))
    {
        return Err(ConfigError::Validation(format!(
            "seed-url '{}' is outside every configured scope prefix",
            config.seed_url
        )));
    }

    if config.content_root.is_empty() {
        return Err(ConfigError::Validation(
            "content-root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch limits
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_redirects < 1 || config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be between 1 and 50, got {}",
            config.max_redirects
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if !config.name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "user-agent name must contain only alphanumeric characters and hyphens, got '{}'",
            config.name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    Ok(())
}

/// Resolves the configured content root against a boundary directory
///
/// The resolved root must lie within the boundary; resolution to a path
/// outside it is a fatal configuration error raised before any I/O
/// occurs. The check is lexical (`..` components are folded without
/// touching the filesystem) so it runs even when the root does not exist
/// yet.
///
/// # Arguments
///
/// * `content_root` - The configured content root (relative or absolute)
/// * `boundary` - The directory writes must stay within
pub fn resolve_content_root(content_root: &str, boundary: &Path) -> Result<PathBuf, ConfigError> {
    let configured = Path::new(content_root);
    let joined = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        boundary.join(configured)
    };

    let resolved = fold_dot_segments(&joined);

    if !resolved.starts_with(boundary) {
        return Err(ConfigError::BoundaryViolation {
            root: resolved.display().to_string(),
            boundary: boundary.display().to_string(),
        });
    }

    Ok(resolved)
}

/// Folds `.` and `..` components without filesystem access
fn fold_dot_segments(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}
