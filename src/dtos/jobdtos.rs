use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::userdtos::validate_non_negative;
use crate::models::jobmodel::{JobUpdate, NewJob};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobDto {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 10000, message = "Description must be at least 10 characters"))]
    pub description: String,

    #[validate(custom = "validate_non_negative")]
    pub budget_min: Option<BigDecimal>,

    #[validate(custom = "validate_non_negative")]
    pub budget_max: Option<BigDecimal>,

    #[validate(length(max = 100))]
    pub timeline: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(length(max = 30, message = "At most 30 skills"))]
    pub required_skills: Vec<String>,
}

impl CreateJobDto {
    pub fn into_new_job(self, client_id: Uuid) -> NewJob {
        NewJob {
            client_id,
            title: self.title.trim().to_string(),
            description: self.description,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            timeline: self.timeline,
            category: self.category,
            required_skills: self.required_skills,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateJobDto {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, max = 10000))]
    pub description: Option<String>,

    #[validate(custom = "validate_non_negative")]
    pub budget_min: Option<BigDecimal>,

    #[validate(custom = "validate_non_negative")]
    pub budget_max: Option<BigDecimal>,

    #[validate(length(max = 100))]
    pub timeline: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 30))]
    pub required_skills: Option<Vec<String>>,
}

impl From<UpdateJobDto> for JobUpdate {
    fn from(dto: UpdateJobDto) -> Self {
        JobUpdate {
            title: dto.title,
            description: dto.description,
            budget_min: dto.budget_min,
            budget_max: dto.budget_max,
            timeline: dto.timeline,
            category: dto.category,
            required_skills: dto.required_skills,
        }
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Default)]
pub struct JobQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
    pub category: Option<String>,
}
