//! Persistent particle store with face assignments.

use std::collections::BTreeMap;

use crate::common::geometry::Vector3;
use crate::error::{Result, SgfrdError};
use crate::ids::{FaceID, ParticleID, SerialGen};
use crate::model::Species;
use crate::polygon::{Polygon, SurfacePosition};

/// A point-like particle constrained to the surface.
#[derive(Debug, Clone)]
pub struct Particle {
    pub species: Species,
    pub position: Vector3,
    pub radius: f64,
    pub d: f64,
}

impl Particle {
    pub fn new(species: Species, position: Vector3, radius: f64, d: f64) -> Self {
        Self {
            species,
            position,
            radius,
            d,
        }
    }

    pub fn surface_position(&self, fid: FaceID) -> SurfacePosition {
        SurfacePosition::new(self.position, fid)
    }
}

/// The particle world: id allocation and the position-and-species store.
#[derive(Debug, Default)]
pub struct World {
    particles: BTreeMap<ParticleID, (Particle, FaceID)>,
    idgen: SerialGen,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Insert a particle unless it overlaps an existing one.
    pub fn create_particle(
        &mut self,
        polygon: &Polygon,
        p: Particle,
        fid: FaceID,
    ) -> Option<ParticleID> {
        let pos = p.surface_position(fid);
        for (q, qfid) in self.particles.values() {
            let d = polygon.distance(&pos, &q.surface_position(*qfid));
            if d < p.radius + q.radius {
                return None;
            }
        }
        let pid = self.idgen.particle_id();
        self.particles.insert(pid, (p, fid));
        Some(pid)
    }

    pub fn get_particle(&self, pid: ParticleID) -> Result<(&Particle, FaceID)> {
        self.particles
            .get(&pid)
            .map(|(p, f)| (p, *f))
            .ok_or(SgfrdError::MissingParticle(pid))
    }

    pub fn get_face_id(&self, pid: ParticleID) -> Result<FaceID> {
        Ok(self.get_particle(pid)?.1)
    }

    pub fn update_particle(&mut self, pid: ParticleID, p: Particle, fid: FaceID) -> Result<()> {
        match self.particles.get_mut(&pid) {
            Some(slot) => {
                *slot = (p, fid);
                Ok(())
            }
            None => Err(SgfrdError::MissingParticle(pid)),
        }
    }

    pub fn remove_particle(&mut self, pid: ParticleID) -> Result<Particle> {
        self.particles
            .remove(&pid)
            .map(|(p, _)| p)
            .ok_or(SgfrdError::MissingParticle(pid))
    }

    /// All particles, ordered by id.
    pub fn list_particles(&self) -> Vec<(ParticleID, Particle, FaceID)> {
        self.particles
            .iter()
            .map(|(pid, (p, fid))| (*pid, p.clone(), *fid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Polygon, World) {
        (Polygon::flat_unit_square(1.0), World::new())
    }

    fn particle_at(x: f64, y: f64, radius: f64) -> Particle {
        Particle::new(Species::new("A"), Vector3::new(x, y, 0.0), radius, 1e-12)
    }

    #[test]
    fn test_create_and_lookup() {
        let (poly, mut world) = setup();
        let pid = world
            .create_particle(&poly, particle_at(0.6, 0.2, 0.01), FaceID(0))
            .unwrap();
        let (p, fid) = world.get_particle(pid).unwrap();
        assert_eq!(fid, FaceID(0));
        assert_eq!(p.position.x, 0.6);
    }

    #[test]
    fn test_overlapping_create_is_refused() {
        let (poly, mut world) = setup();
        world
            .create_particle(&poly, particle_at(0.6, 0.2, 0.05), FaceID(0))
            .unwrap();
        assert!(world
            .create_particle(&poly, particle_at(0.62, 0.2, 0.05), FaceID(0))
            .is_none());
        assert_eq!(world.num_particles(), 1);
    }

    #[test]
    fn test_remove_twice_fails() {
        let (poly, mut world) = setup();
        let pid = world
            .create_particle(&poly, particle_at(0.6, 0.2, 0.01), FaceID(0))
            .unwrap();
        assert!(world.remove_particle(pid).is_ok());
        assert!(world.remove_particle(pid).is_err());
    }

    #[test]
    fn test_listing_is_sorted() {
        let (poly, mut world) = setup();
        let a = world
            .create_particle(&poly, particle_at(0.2, 0.1, 0.01), FaceID(0))
            .unwrap();
        let b = world
            .create_particle(&poly, particle_at(0.8, 0.4, 0.01), FaceID(0))
            .unwrap();
        let listed: Vec<_> = world.list_particles().iter().map(|e| e.0).collect();
        assert_eq!(listed, vec![a, b]);
    }
}
