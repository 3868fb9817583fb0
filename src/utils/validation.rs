use crate::utils::error::{RankError, Result};
use std::net::SocketAddr;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(RankError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_socket_addr(field_name: &str, addr: &str) -> Result<SocketAddr> {
    addr.parse::<SocketAddr>()
        .map_err(|e| RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: addr.to_string(),
            reason: format!("Invalid socket address: {}", e),
        })
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_strictly_increasing(field_name: &str, values: &[u32]) -> Result<()> {
    if values.first() == Some(&0) {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "0".to_string(),
            reason: "Values must be positive".to_string(),
        });
    }
    if let Some(pair) = values.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(RankError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{:?}", pair),
            reason: "Values must be strictly increasing".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RankError::ValidationError {
            message: format!("'{}' cannot be empty or whitespace-only", field_name),
        });
    }
    Ok(())
}

pub fn validate_max_length(field_name: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(RankError::ValidationError {
            message: format!("'{}' must be at most {} characters", field_name, max),
        });
    }
    Ok(())
}

/// 只做基本格式檢查，不驗證網域
pub fn validate_email(field_name: &str, email: &str) -> Result<()> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || trimmed.contains(char::is_whitespace) {
        return Err(RankError::ValidationError {
            message: format!("'{}' is not a valid email address: {}", field_name, email),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("server", "https://example.com").is_ok());
        assert!(validate_url("server", "http://127.0.0.1:3001").is_ok());
        assert!(validate_url("server", "").is_err());
        assert!(validate_url("server", "invalid-url").is_err());
        assert!(validate_url("server", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_socket_addr() {
        assert!(validate_socket_addr("server.bind", "127.0.0.1:3001").is_ok());
        assert!(validate_socket_addr("server.bind", "localhost").is_err());
    }

    #[test]
    fn test_validate_strictly_increasing() {
        assert!(validate_strictly_increasing("ranking.milestones", &[10, 25, 50, 100]).is_ok());
        assert!(validate_strictly_increasing("ranking.milestones", &[]).is_ok());
        assert!(validate_strictly_increasing("ranking.milestones", &[10, 10]).is_err());
        assert!(validate_strictly_increasing("ranking.milestones", &[0, 5]).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("email", "test@test.com").is_ok());
        assert!(validate_email("email", "no-at-sign").is_err());
        assert!(validate_email("email", "a@localhost").is_err());
        assert!(validate_email("email", "a b@test.com").is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("title", "Calculus I").is_ok());
        assert!(validate_non_empty_string("title", "   ").is_err());
    }
}
