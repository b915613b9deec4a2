//! The burst protocol: terminating domains early and re-queueing their
//! particles under closely fitted shells.

use log::debug;

use crate::domain::{Domain, DomainKind};
use crate::error::{Result, SgfrdError};
use crate::ids::{DomainID, FaceID};
use crate::polygon::SurfacePosition;
use crate::world::Particle;

use super::single::PidParticleFace;
use super::SgfrdSimulator;

impl SgfrdSimulator {
    /// Terminate a domain at `tm`: propagate its particles to their state at
    /// that time and free its shells. The domain's event must already be out
    /// of the scheduler.
    pub(crate) fn burst_domain(&mut self, dom: Domain, tm: f64) -> Result<Vec<PidParticleFace>> {
        match dom {
            Domain::Single(s) => {
                let shell = self.shells.get(s.shell_id)?.clone();
                let result = self.propagate_single(&shell, &s, tm)?;
                self.shells.remove(s.shell_id)?;
                Ok(vec![result])
            }
            Domain::Pair(pr) => {
                let results = self.propagate_pair(&pr, tm)?;
                self.shells.remove(pr.shell_id)?;
                Ok(results.to_vec())
            }
            Domain::Multi(m) => {
                // Multis are not advanced analytically; dissolve in place.
                for sid in &m.shell_ids {
                    self.shells.remove(*sid)?;
                }
                let mut out = Vec::new();
                for pid in &m.particle_ids {
                    let (p, fid) = self.world.get_particle(*pid)?;
                    out.push((*pid, p.clone(), fid));
                }
                Ok(out)
            }
            Domain::Birth(_) => Ok(Vec::new()),
        }
    }

    /// After a reaction proposes a particle at a new position, clear the
    /// neighbourhood: burst every intruding non-multi domain and re-queue its
    /// particles under closely fitted shells. Returns whether the proposed
    /// particle ends up overlap-free.
    pub(crate) fn burst_and_shrink_overlaps(
        &mut self,
        p: &Particle,
        fid: FaceID,
        excluded: DomainID,
    ) -> Result<bool> {
        let tm = self.time;
        let pos = p.surface_position(fid);
        let intruders = self.get_intrusive_domains(&pos, p.radius);
        debug!("burst_and_shrink_overlaps: {} intruders", intruders.len());

        let mut no_overlap = true;
        for (did, _) in intruders {
            if did == excluded {
                continue;
            }
            if let Some(dom) = self.scheduler.get(did) {
                if dom.kind() == DomainKind::Multi {
                    continue;
                }
            }
            let dom = self
                .scheduler
                .remove(did)
                .ok_or(SgfrdError::MissingEvent(did))?;
            for (pid_, p_, fid_) in self.burst_domain(dom, tm)? {
                let dist = self
                    .polygon
                    .distance(&pos, &p_.surface_position(fid_));
                no_overlap = no_overlap && dist > p.radius + p_.radius;
                self.create_closely_fitted_domain(pid_, &p_, fid_)?;
            }
        }
        Ok(no_overlap)
    }

    /// Burst every non-multi intruder and return the resulting domains with
    /// their distance from `ref_pos`, sorted ascending. The distance is
    /// measured to each particle's future minimum shell, so that a shell
    /// sized against it always leaves the neighbour room to rebuild.
    /// Multis pass through untouched.
    pub(crate) fn burst_and_shrink_non_multis(
        &mut self,
        ref_pos: &SurfacePosition,
        intruders: Vec<(DomainID, f64)>,
    ) -> Result<Vec<(DomainID, f64)>> {
        let tm = self.time;
        let mut out: Vec<(DomainID, f64)> = Vec::new();
        for (did, dist) in intruders {
            let kind = self
                .scheduler
                .get(did)
                .map(|d| d.kind())
                .ok_or(SgfrdError::MissingEvent(did))?;
            if kind == DomainKind::Multi {
                out.push((did, dist));
                continue;
            }
            let dom = self
                .scheduler
                .remove(did)
                .ok_or(SgfrdError::MissingEvent(did))?;
            for (pid_, p_, fid_) in self.burst_domain(dom, tm)? {
                let d = self
                    .polygon
                    .distance(ref_pos, &p_.surface_position(fid_))
                    - self.min_circular_shell_radius(&p_);
                let ndid = self.create_closely_fitted_domain(pid_, &p_, fid_)?;
                out.push((ndid, d));
            }
        }
        out.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        Ok(out)
    }
}
