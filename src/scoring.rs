//! Scoring data contract.
//!
//! Capture does not compute scores; a scorer plugs in behind the
//! `LeadScorer` trait and its output is persisted as a `LeadScore`
//! with the tier derived from the overall value.

use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{LeadRecord, LeadScore, LeadTier};

/// Upper bound of each component score.
pub const MAX_COMPONENT_SCORE: i32 = 25;

/// The four component scores a scorer produces, each in [0,25].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreComponents {
    pub completeness: i32,
    pub engagement: i32,
    pub readiness: i32,
    pub source_quality: i32,
}

impl ScoreComponents {
    /// Validates the component ranges.
    pub fn validate(&self) -> Result<(), AppError> {
        let components = [
            ("completeness", self.completeness),
            ("engagement", self.engagement),
            ("readiness", self.readiness),
            ("sourceQuality", self.source_quality),
        ];
        for (name, value) in components {
            if !(0..=MAX_COMPONENT_SCORE).contains(&value) {
                return Err(AppError::Internal(format!(
                    "Score component {} out of range: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Overall score, the sum of the four components. In [0,100] when
    /// the components are valid.
    pub fn overall(&self) -> i32 {
        self.completeness + self.engagement + self.readiness + self.source_quality
    }
}

/// Pluggable lead scorer. Implementations inspect the lead and its
/// attributions and return component scores.
pub trait LeadScorer {
    fn score(&self, record: &LeadRecord) -> ScoreComponents;
}

/// Builds a persistable `LeadScore` from validated components,
/// deriving the tier from the overall value.
pub fn build_score(lead_id: Uuid, components: ScoreComponents) -> Result<LeadScore, AppError> {
    components.validate()?;
    let overall = components.overall();

    Ok(LeadScore {
        id: Uuid::new_v4(),
        lead_id,
        overall_score: overall,
        tier: LeadTier::from_overall(overall as u8),
        completeness_score: components.completeness,
        engagement_score: components.engagement,
        readiness_score: components.readiness,
        source_quality_score: components.source_quality,
        calculated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_is_the_component_sum() {
        let components = ScoreComponents {
            completeness: 20,
            engagement: 15,
            readiness: 25,
            source_quality: 10,
        };
        assert_eq!(components.overall(), 70);
    }

    #[test]
    fn build_score_derives_tier() {
        let lead_id = Uuid::new_v4();
        let score = build_score(
            lead_id,
            ScoreComponents {
                completeness: 25,
                engagement: 20,
                readiness: 20,
                source_quality: 15,
            },
        )
        .unwrap();

        assert_eq!(score.lead_id, lead_id);
        assert_eq!(score.overall_score, 80);
        assert_eq!(score.tier, LeadTier::Hot);
    }

    #[test]
    fn out_of_range_component_is_rejected() {
        let too_high = ScoreComponents {
            completeness: 26,
            engagement: 0,
            readiness: 0,
            source_quality: 0,
        };
        assert!(too_high.validate().is_err());

        let negative = ScoreComponents {
            completeness: 0,
            engagement: -1,
            readiness: 0,
            source_quality: 0,
        };
        assert!(build_score(Uuid::new_v4(), negative).is_err());
    }

    #[test]
    fn zero_components_are_cold() {
        let score = build_score(
            Uuid::new_v4(),
            ScoreComponents {
                completeness: 0,
                engagement: 0,
                readiness: 0,
                source_quality: 0,
            },
        )
        .unwrap();
        assert_eq!(score.overall_score, 0);
        assert_eq!(score.tier, LeadTier::Cold);
    }
}
