use serde::{Deserialize, Serialize};

/// Smallest coverage amount the underwriting backends accept.
pub const MINIMUM_COVERAGE: u64 = 1_000;

/// Monthly premium rate used for the pre-submission estimate.
pub const ESTIMATED_PREMIUM_RATE: f64 = 0.0025;

/// Applicant details collected by the wizard. Frozen once a submission starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInput {
    pub full_name: String,
    pub national_id: String,
    pub coverage_amount: u64,
}

impl ApplicationInput {
    pub fn new(
        full_name: impl Into<String>,
        national_id: impl Into<String>,
        coverage_amount: u64,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            national_id: national_id.into(),
            coverage_amount,
        }
    }

    /// Prefilled applicant the wizard opens with.
    pub fn demo() -> Self {
        Self::new("John Doe", "1111", 100_000)
    }

    /// Builds an input from raw form fields, coercing the coverage text to an integer.
    pub fn from_form(
        full_name: &str,
        national_id: &str,
        coverage: &str,
    ) -> Result<Self, ValidationError> {
        let coverage_amount = coverage
            .trim()
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidCoverage(coverage.trim().to_string()))?;

        let input = Self::new(full_name.trim(), national_id.trim(), coverage_amount);
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.national_id.trim().is_empty() {
            return Err(ValidationError::MissingNationalId);
        }
        if self.coverage_amount < MINIMUM_COVERAGE {
            return Err(ValidationError::CoverageBelowMinimum {
                amount: self.coverage_amount,
                minimum: MINIMUM_COVERAGE,
            });
        }
        Ok(())
    }

    pub fn estimated_premium(&self) -> f64 {
        estimated_premium(self.coverage_amount)
    }
}

/// Local validation failure that blocks a submission before anything is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("full name is required")]
    MissingName,
    #[error("national ID is required")]
    MissingNationalId,
    #[error("coverage amount {amount} is below the minimum of {minimum}")]
    CoverageBelowMinimum { amount: u64, minimum: u64 },
    #[error("coverage amount '{0}' is not a whole number")]
    InvalidCoverage(String),
}

/// Coverage tier offered on the coverage screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoveragePreset {
    pub amount: u64,
    pub label: &'static str,
    pub description: &'static str,
}

pub const COVERAGE_PRESETS: [CoveragePreset; 4] = [
    CoveragePreset {
        amount: 50_000,
        label: "$50K",
        description: "Basic Protection",
    },
    CoveragePreset {
        amount: 100_000,
        label: "$100K",
        description: "Standard Coverage",
    },
    CoveragePreset {
        amount: 250_000,
        label: "$250K",
        description: "Premium Plan",
    },
    CoveragePreset {
        amount: 500_000,
        label: "$500K",
        description: "Elite Coverage",
    },
];

pub fn preset_for(amount: u64) -> Option<&'static CoveragePreset> {
    COVERAGE_PRESETS.iter().find(|preset| preset.amount == amount)
}

/// Display-only estimate; the collaborator's quoted premium is authoritative.
pub fn estimated_premium(coverage_amount: u64) -> f64 {
    coverage_amount as f64 * ESTIMATED_PREMIUM_RATE
}
