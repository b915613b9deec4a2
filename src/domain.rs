//! Domain variants: the unit of scheduling.
//!
//! A domain owns its shells and particles by id only; the registries resolve
//! them. One scheduled event exists per live domain.

use crate::common::geometry::Vector3;
use crate::ids::{ParticleID, ShellID};
use crate::model::ReactionRule;
use crate::world::Particle;

/// What a single domain will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleEventKind {
    Escape,
    Reaction,
    Unknown,
}

/// One particle protected by one shell.
#[derive(Debug, Clone)]
pub struct Single {
    pub kind: SingleEventKind,
    pub begin_time: f64,
    pub dt: f64,
    pub particle_id: ParticleID,
    pub particle: Particle,
    pub shell_id: ShellID,
}

/// What a pair domain will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairEventKind {
    /// The centre of mass reaches its disc rim.
    ComEscape,
    /// The inter-particle vector reaches contact or its outer rim.
    IpvEvent,
    /// A monomolecular channel of one of the two fires first.
    SingleReaction,
    Unknown,
}

/// Two particles sharing one circular shell, evolved as centre of mass plus
/// inter-particle vector.
#[derive(Debug, Clone)]
pub struct Pair {
    pub kind: PairEventKind,
    pub begin_time: f64,
    pub dt: f64,
    pub shell_id: ShellID,
    pub particle_ids: [ParticleID; 2],
    pub particles: [Particle; 2],
    /// Inter-particle vector at creation, in the first particle's face plane.
    pub ipv: Vector3,
    pub len_ipv: f64,
    /// Radius of the centre-of-mass disc.
    pub a_com: f64,
    /// Outer rim of the inter-particle annulus.
    pub a_ipv: f64,
}

impl Pair {
    pub fn sigma(&self) -> f64 {
        self.particles[0].radius + self.particles[1].radius
    }

    pub fn d_tot(&self) -> f64 {
        self.particles[0].d + self.particles[1].d
    }

    pub fn d_com(&self) -> f64 {
        let d12 = self.d_tot();
        if d12 > 0.0 {
            self.particles[0].d * self.particles[1].d / d12
        } else {
            0.0
        }
    }
}

/// N particles and N shells advanced by Brownian-dynamics microsteps.
#[derive(Debug, Clone)]
pub struct Multi {
    pub begin_time: f64,
    pub dt: f64,
    pub particle_ids: Vec<ParticleID>,
    pub shell_ids: Vec<ShellID>,
}

impl Multi {
    pub fn new(begin_time: f64, dt: f64) -> Self {
        Self {
            begin_time,
            dt,
            particle_ids: Vec::new(),
            shell_ids: Vec::new(),
        }
    }

    pub fn add_particle(&mut self, pid: ParticleID) {
        if !self.particle_ids.contains(&pid) {
            self.particle_ids.push(pid);
        }
    }

    pub fn add_shell(&mut self, sid: ShellID) {
        if !self.shell_ids.contains(&sid) {
            self.shell_ids.push(sid);
        }
    }
}

/// A zeroth-order rule waiting to inject a particle.
#[derive(Debug, Clone)]
pub struct Birth {
    pub rule: ReactionRule,
}

/// Tagged domain variant.
#[derive(Debug, Clone)]
pub enum Domain {
    Single(Single),
    Pair(Pair),
    Multi(Multi),
    Birth(Birth),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Single,
    Pair,
    Multi,
    Birth,
}

impl Domain {
    pub fn kind(&self) -> DomainKind {
        match self {
            Domain::Single(_) => DomainKind::Single,
            Domain::Pair(_) => DomainKind::Pair,
            Domain::Multi(_) => DomainKind::Multi,
            Domain::Birth(_) => DomainKind::Birth,
        }
    }

    pub fn shell_ids(&self) -> Vec<ShellID> {
        match self {
            Domain::Single(d) => vec![d.shell_id],
            Domain::Pair(d) => vec![d.shell_id],
            Domain::Multi(d) => d.shell_ids.clone(),
            Domain::Birth(_) => Vec::new(),
        }
    }

    pub fn particle_ids(&self) -> Vec<ParticleID> {
        match self {
            Domain::Single(d) => vec![d.particle_id],
            Domain::Pair(d) => d.particle_ids.to_vec(),
            Domain::Multi(d) => d.particle_ids.clone(),
            Domain::Birth(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Species;

    #[test]
    fn test_pair_decomposition_coefficients() {
        let p1 = Particle::new(Species::new("A"), Vector3::zero(), 0.01, 2.0);
        let p2 = Particle::new(Species::new("B"), Vector3::zero(), 0.02, 6.0);
        let pair = Pair {
            kind: PairEventKind::Unknown,
            begin_time: 0.0,
            dt: 0.0,
            shell_id: ShellID(0),
            particle_ids: [ParticleID(0), ParticleID(1)],
            particles: [p1, p2],
            ipv: Vector3::new(0.1, 0.0, 0.0),
            len_ipv: 0.1,
            a_com: 0.1,
            a_ipv: 0.2,
        };
        assert_eq!(pair.sigma(), 0.03);
        assert_eq!(pair.d_tot(), 8.0);
        assert_eq!(pair.d_com(), 1.5);
    }

    #[test]
    fn test_multi_ignores_duplicates() {
        let mut m = Multi::new(0.0, 0.1);
        m.add_particle(ParticleID(3));
        m.add_particle(ParticleID(3));
        m.add_shell(ShellID(5));
        m.add_shell(ShellID(5));
        assert_eq!(m.particle_ids.len(), 1);
        assert_eq!(m.shell_ids.len(), 1);
    }
}
