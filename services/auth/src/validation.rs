//! Input validation utilities

use common::rbac::Role;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::RegisterRequest;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() {
            has_special = true;
        }
    }

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    if !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Validate a registration request, including that every role name is known
pub fn validate_registration(request: &RegisterRequest) -> Result<(), String> {
    validate_username(&request.username)?;
    validate_email(&request.email)?;
    validate_password(&request.password)?;

    if request.roles.is_empty() {
        return Err("At least one role is required".to_string());
    }

    for role in &request.roles {
        role.parse::<Role>().map_err(|e| e.to_string())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(roles: &[&str]) -> RegisterRequest {
        RegisterRequest {
            username: "maria_gomez".to_string(),
            email: "maria@example.com".to_string(),
            password: "Sup3r$ecret".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("maria_gomez").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert_eq!(
            validate_username("maria gomez"),
            Err("Username can only contain letters, numbers, and underscores".to_string())
        );
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("maria@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("maria@").is_err());
        assert!(validate_email("maria.example.com").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Sup3r$ecret").is_ok());
        assert!(validate_password("Sh0rt!").is_err());
        assert_eq!(
            validate_password("sup3r$ecret"),
            Err("Password must contain at least one uppercase letter".to_string())
        );
        assert_eq!(
            validate_password("SUP3R$ECRET"),
            Err("Password must contain at least one lowercase letter".to_string())
        );
        assert_eq!(
            validate_password("Super$ecret"),
            Err("Password must contain at least one digit".to_string())
        );
        assert_eq!(
            validate_password("Sup3rSecret"),
            Err("Password must contain at least one special character".to_string())
        );
    }

    #[test]
    fn test_registration_requires_known_roles() {
        assert!(validate_registration(&request(&["entrepreneur"])).is_ok());
        assert_eq!(
            validate_registration(&request(&[])),
            Err("At least one role is required".to_string())
        );
        assert_eq!(
            validate_registration(&request(&["volunteer", "root"])),
            Err("Unknown role: root".to_string())
        );
    }
}
