use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        repo_types::Role,
    },
    error::FieldError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").unwrap();
    // leading '+', 1-4 digit country code, 6-14 digit subscriber number
    static ref PHONE_RE: Regex = Regex::new(r"^\+\d{1,4}\d{6,14}$").unwrap();
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Signup input after every check passed. Email is normalized, names trimmed.
#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

fn non_empty_trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Runs every signup check and reports all failures at once.
pub fn validate_signup(req: SignupRequest) -> Result<ValidSignup, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Invalid email format"));
    }

    let password = req.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if req.confirm_password.as_deref() != Some(password.as_str()) {
        errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
    }

    let role = match req.role.as_deref() {
        None => Some(Role::User),
        Some(r) => r.parse::<Role>().ok(),
    };
    if role.is_none() {
        errors.push(FieldError::new("role", "Role must be \"user\" or \"admin\""));
    }

    let first_name = non_empty_trimmed(&req.first_name);
    if first_name.is_none() {
        errors.push(FieldError::new("firstName", "First name is required"));
    }
    let last_name = non_empty_trimmed(&req.last_name);
    if last_name.is_none() {
        errors.push(FieldError::new("lastName", "Last name is required"));
    }

    let phone_number = req.phone_number.unwrap_or_default();
    if !is_valid_phone(&phone_number) {
        errors.push(FieldError::new(
            "phoneNumber",
            "Phone number must include country code (e.g., +12025550123)",
        ));
    }

    match (role, first_name, last_name) {
        (Some(role), Some(first_name), Some(last_name)) if errors.is_empty() => Ok(ValidSignup {
            email,
            password,
            role,
            first_name,
            last_name,
            phone_number,
        }),
        _ => Err(errors),
    }
}

/// Returns the normalized email and the password.
pub fn validate_login(req: LoginRequest) -> Result<(String, String), Vec<FieldError>> {
    let mut errors = Vec::new();
    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Invalid email format"));
    }
    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if errors.is_empty() {
        Ok((email, password))
    } else {
        Err(errors)
    }
}
