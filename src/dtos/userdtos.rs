use std::borrow::Cow;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::usermodel::{ProfileUpdate, User, UserRole};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SignUpDto {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    pub role: UserRole,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: String,
}

pub(crate) fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone_regex = regex::Regex::new(r"^(\+?[0-9]{1,3}[- ]?)?[0-9]{3}[- ]?[0-9]{3}[- ]?[0-9]{4}$")
        .map_err(|_| ValidationError::new("Invalid phone regex"))?;

    if !phone_regex.is_match(phone) {
        let mut error = ValidationError::new("invalid_phone");
        error.message = Some(Cow::from(
            "Phone number must be in a valid format (e.g., +1234567890 or 123-456-7890)",
        ));
        return Err(error);
    }
    Ok(())
}

pub(crate) fn validate_non_negative(amount: &BigDecimal) -> Result<(), ValidationError> {
    if amount < &BigDecimal::zero() {
        let mut error = ValidationError::new("negative_amount");
        error.message = Some(Cow::from("Amount cannot be negative"));
        return Err(error);
    }
    Ok(())
}

/// Editable profile fields. Role is not among them.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(length(max = 200))]
    pub location: Option<String>,

    #[validate(length(max = 2000, message = "Bio must not be more than 2000 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 50, message = "At most 50 skills"))]
    pub skills: Option<Vec<String>>,

    #[validate(custom = "validate_non_negative")]
    pub hourly_rate: Option<BigDecimal>,

    #[validate(length(max = 200))]
    pub company_name: Option<String>,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
}

impl From<UpdateProfileDto> for ProfileUpdate {
    fn from(dto: UpdateProfileDto) -> Self {
        ProfileUpdate {
            full_name: dto.full_name,
            phone: dto.phone,
            location: dto.location,
            bio: dto.bio,
            skills: dto.skills.map(|skills| {
                skills
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            hourly_rate: dto.hourly_rate,
            company_name: dto.company_name,
            website: dto.website,
            resume_url: None,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<BigDecimal>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub resume_url: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            email: user.email.to_owned(),
            full_name: user.full_name.to_owned(),
            role: user.role.to_str().to_string(),
            phone: user.phone.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            skills: user.skills.clone(),
            hourly_rate: user.hourly_rate.clone(),
            company_name: user.company_name.clone(),
            website: user.website.clone(),
            resume_url: user.resume_url.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub redirect_to: String,
    pub user: FilterUserDto,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
