//! Records of fired reactions, kept for observers.

use crate::ids::ParticleID;
use crate::world::Particle;

/// Snapshot of one fired reaction: when it happened and which particles went
/// in and came out.
#[derive(Debug, Clone)]
pub struct ReactionInfo {
    time: f64,
    reactants: Vec<(ParticleID, Particle)>,
    products: Vec<(ParticleID, Particle)>,
}

impl ReactionInfo {
    pub fn degradation(time: f64, pid: ParticleID, p: Particle) -> Self {
        Self {
            time,
            reactants: vec![(pid, p)],
            products: Vec::new(),
        }
    }

    pub fn unimolecular(
        time: f64,
        reactant: (ParticleID, Particle),
        product: (ParticleID, Particle),
    ) -> Self {
        Self {
            time,
            reactants: vec![reactant],
            products: vec![product],
        }
    }

    pub fn unbinding(
        time: f64,
        reactant: (ParticleID, Particle),
        products: [(ParticleID, Particle); 2],
    ) -> Self {
        Self {
            time,
            reactants: vec![reactant],
            products: products.to_vec(),
        }
    }

    pub fn binding(
        time: f64,
        reactants: [(ParticleID, Particle); 2],
        product: (ParticleID, Particle),
    ) -> Self {
        Self {
            time,
            reactants: reactants.to_vec(),
            products: vec![product],
        }
    }

    pub fn exchange(
        time: f64,
        reactants: [(ParticleID, Particle); 2],
        products: [(ParticleID, Particle); 2],
    ) -> Self {
        Self {
            time,
            reactants: reactants.to_vec(),
            products: products.to_vec(),
        }
    }

    pub fn birth(time: f64, product: (ParticleID, Particle)) -> Self {
        Self {
            time,
            reactants: Vec::new(),
            products: vec![product],
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn reactants(&self) -> &[(ParticleID, Particle)] {
        &self.reactants
    }

    pub fn products(&self) -> &[(ParticleID, Particle)] {
        &self.products
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geometry::Vector3;
    use crate::model::Species;

    #[test]
    fn test_degradation_record() {
        let p = Particle::new(Species::new("A"), Vector3::zero(), 0.005, 1e-12);
        let info = ReactionInfo::degradation(1.5, ParticleID(0), p);
        assert_eq!(info.time(), 1.5);
        assert_eq!(info.reactants().len(), 1);
        assert!(info.products().is_empty());
    }
}
