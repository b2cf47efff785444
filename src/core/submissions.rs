use crate::domain::model::{RatingSubmission, ReportPayload};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_max_length, validate_non_empty_string, validate_range, Validate,
};

pub const MAX_FEEDBACK_CHARS: usize = 1000;
pub const MAX_REPORT_DETAILS_CHARS: usize = 2000;

impl RatingSubmission {
    pub fn new(stars: u8, feedback: Option<String>, public: bool) -> Self {
        let feedback = feedback
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            stars,
            feedback,
            public,
        }
    }
}

impl Validate for RatingSubmission {
    fn validate(&self) -> Result<()> {
        validate_range("stars", self.stars, 1, 5)?;
        if let Some(feedback) = &self.feedback {
            validate_max_length("feedback", feedback, MAX_FEEDBACK_CHARS)?;
        }
        Ok(())
    }
}

impl Validate for ReportPayload {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("target id", self.target.id())?;
        validate_non_empty_string("reason", &self.reason)?;
        if let Some(details) = &self.details {
            validate_max_length("details", details, MAX_REPORT_DETAILS_CHARS)?;
        }
        Ok(())
    }
}
