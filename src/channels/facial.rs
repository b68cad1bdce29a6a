use std::collections::{BTreeMap, BTreeSet};

use super::interpolation::lerp;
use super::scheduler::Channel;
use crate::agent::config::FaceConfig;
use crate::rig::FacialActuator;

/// Action-unit weights keyed by lower-case id (`au12`).
pub type AuWeights = BTreeMap<String, f64>;

const WEIGHT_EPSILON: f64 = 1e-6;

/// Requested action-unit values, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacsRequest {
    pub values: BTreeMap<String, f64>,
}

pub struct FacialChannel {
    actuator: Box<dyn FacialActuator>,
    weight_max: f64,
    registry: BTreeSet<String>,
    weights: AuWeights,
}

impl FacialChannel {
    pub fn new(actuator: Box<dyn FacialActuator>, config: &FaceConfig) -> Self {
        Self {
            actuator,
            weight_max: config.weight_max,
            registry: config
                .action_units
                .iter()
                .map(|au| au.to_ascii_lowercase())
                .collect(),
            weights: AuWeights::new(),
        }
    }

    pub fn knows(&self, action_unit: &str) -> bool {
        self.registry.contains(&action_unit.to_ascii_lowercase())
    }

    pub fn weight(&self, action_unit: &str) -> f64 {
        self.weights.get(action_unit).copied().unwrap_or(0.0)
    }
}

impl Channel for FacialChannel {
    type State = AuWeights;
    type Request = FacsRequest;

    fn name(&self) -> &'static str {
        "facs"
    }

    fn current(&self) -> AuWeights {
        self.weights.clone()
    }

    fn target(&self, current: &AuWeights, request: &FacsRequest) -> AuWeights {
        let mut target = current.clone();
        for (id, value) in &request.values {
            let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
            target.insert(id.to_ascii_lowercase(), value * self.weight_max);
        }
        target
    }

    fn differs(&self, from: &AuWeights, to: &AuWeights) -> bool {
        to.iter().any(|(id, weight)| {
            let before = from.get(id).copied().unwrap_or(0.0);
            (before - weight).abs() > WEIGHT_EPSILON
        })
    }

    fn interpolate(&self, from: &AuWeights, to: &AuWeights, fraction: f64) -> AuWeights {
        to.iter()
            .map(|(id, weight)| {
                let before = from.get(id).copied().unwrap_or(0.0);
                (id.clone(), lerp(before, *weight, fraction))
            })
            .collect()
    }

    fn apply(&mut self, state: &AuWeights) {
        for (id, weight) in state {
            let changed = self
                .weights
                .get(id)
                .map_or(true, |before| (before - weight).abs() > f64::EPSILON);
            if changed {
                self.actuator.set_action_unit_weight(id, *weight);
                self.weights.insert(id.clone(), *weight);
            }
        }
    }
}
