//! Client-side registration checks.
//!
//! These run before any network call. The backend enforces the same rules,
//! so passing here does not guarantee acceptance.

use chrono::{Datelike, NaiveDate};

use crate::error::{SessionError, SessionResult};
use crate::models::Registration;

pub const MINIMUM_AGE: u32 = 13;

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;
const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 100;

/// Whole years between `birth` and `today`. Zero if `birth` is in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Age used for the policy: derived from the date of birth when present.
pub fn effective_age(registration: &Registration, today: NaiveDate) -> Option<u32> {
    registration
        .date_of_birth
        .map(|dob| age_on(dob, today))
        .or(registration.age)
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> SessionResult<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(SessionError::PolicyViolation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Validate a registration and return the age to send to the backend.
pub fn check_registration(registration: &Registration, today: NaiveDate) -> SessionResult<u32> {
    let age = effective_age(registration, today).ok_or_else(|| {
        SessionError::PolicyViolation("Please provide your date of birth".to_string())
    })?;
    if age < MINIMUM_AGE {
        return Err(SessionError::PolicyViolation(format!(
            "You must be at least {} years old to register",
            MINIMUM_AGE
        )));
    }

    check_len("Name", &registration.name, NAME_MIN_LEN, NAME_MAX_LEN)?;
    check_len("Last name", &registration.last_name, NAME_MIN_LEN, NAME_MAX_LEN)?;

    check_email(&registration.email)?;

    check_password(&registration.password)?;

    Ok(age)
}

pub fn check_password(password: &str) -> SessionResult<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(SessionError::PolicyViolation(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

pub fn check_email(email: &str) -> SessionResult<()> {
    if looks_like_email(email.trim()) {
        Ok(())
    } else {
        Err(SessionError::PolicyViolation("Email must be valid".to_string()))
    }
}

/// Profile edits carry the same minimum age as registration.
pub fn check_birth_date(birth: NaiveDate, today: NaiveDate) -> SessionResult<u32> {
    let age = age_on(birth, today);
    if age < MINIMUM_AGE {
        return Err(SessionError::PolicyViolation(format!(
            "You must be at least {} years old",
            MINIMUM_AGE
        )));
    }
    Ok(age)
}
