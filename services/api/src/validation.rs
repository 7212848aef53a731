//! Input validation for fair payloads

use crate::models::fair::{CreateFairRequest, UpdateFairRequest};

/// Largest capacity whose stand codes stay within `A01`..`Z10`
pub const MAX_STAND_CAPACITY: u32 = 26 * 10;

/// Validate fair name
///
/// The length limit applies to the name as stored, surrounding whitespace included.
pub fn validate_fair_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Fair name is required".to_string());
    }

    if name.chars().count() > 150 {
        return Err("Fair name must be at most 150 characters long".to_string());
    }

    Ok(())
}

/// Validate location
pub fn validate_location(location: &str) -> Result<(), String> {
    if location.chars().count() > 255 {
        return Err("Location must be at most 255 characters long".to_string());
    }

    Ok(())
}

/// Validate stand capacity
pub fn validate_stand_capacity(capacity: u32) -> Result<(), String> {
    if capacity > MAX_STAND_CAPACITY {
        return Err(format!(
            "Stand capacity must be at most {}",
            MAX_STAND_CAPACITY
        ));
    }

    Ok(())
}

/// Validate a fair creation payload
pub fn validate_create_fair(payload: &CreateFairRequest) -> Result<(), String> {
    validate_fair_name(&payload.name)?;
    validate_location(&payload.location)?;
    validate_stand_capacity(payload.stand_capacity)
}

/// Validate a fair update payload
pub fn validate_update_fair(payload: &UpdateFairRequest) -> Result<(), String> {
    if let Some(name) = &payload.name {
        validate_fair_name(name)?;
    }

    if let Some(location) = &payload.location {
        validate_location(location)?;
    }

    if let Some(capacity) = payload.stand_capacity {
        validate_stand_capacity(capacity)?;
    }

    Ok(())
}
