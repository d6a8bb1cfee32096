use serde::{Deserialize, Serialize};

use super::company::Industry;
use crate::constants::stock::{TREND_STRONG, TREND_WEAK, VOLUME_MAX_VALUE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDirection {
    Positive,
    Negative,
}

impl EffectDirection {
    pub fn sign(self) -> f64 {
        match self {
            EffectDirection::Positive => 1.0,
            EffectDirection::Negative => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStrength {
    Strong,
    Weak,
}

/// An exogenous shock felt by every stock of one industry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEffect {
    pub industry: Industry,
    pub direction: EffectDirection,
    pub strength: EffectStrength,
}

impl PriceEffect {
    pub fn new(industry: Industry, direction: EffectDirection, strength: EffectStrength) -> Self {
        Self {
            industry,
            direction,
            strength,
        }
    }

    /// Volume band a shocked stock draws from
    pub fn volume_band(&self) -> (f64, f64) {
        match self.strength {
            EffectStrength::Strong => (VOLUME_MAX_VALUE / 2.0, VOLUME_MAX_VALUE),
            EffectStrength::Weak => (VOLUME_MAX_VALUE / 3.0, VOLUME_MAX_VALUE / 2.0),
        }
    }

    /// Unsigned trend magnitude band; the direction supplies the sign
    pub fn trend_band(&self) -> (f64, f64) {
        match self.strength {
            EffectStrength::Strong => (TREND_STRONG, 1.0),
            EffectStrength::Weak => (TREND_WEAK, TREND_STRONG),
        }
    }
}
