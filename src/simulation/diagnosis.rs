//! Integrity checker: a no-side-effect audit of particles, shells and
//! domain assignments.

use std::collections::HashMap;

use log::error;

use crate::domain::Domain;
use crate::ids::{ParticleID, ShellID};
use crate::shell::Shell;

use super::SgfrdSimulator;

impl SgfrdSimulator {
    /// Verify every kernel invariant; report violations through `log` and
    /// return whether the state is sound.
    pub fn diagnosis(&self) -> bool {
        let mut sound = true;
        let tol = self.config.tolerance;
        let particles = self.world.list_particles();

        // No two particles may overlap.
        for (i, (pid, p, fid)) in particles.iter().enumerate() {
            for (qid, q, qfid) in particles.iter().skip(i + 1) {
                let d = self
                    .polygon
                    .distance(&p.surface_position(*fid), &q.surface_position(*qfid));
                if d < p.radius + q.radius - tol {
                    sound = false;
                    error!(
                        "particles {} and {} overlap: distance {} < {}",
                        pid,
                        qid,
                        d,
                        p.radius + q.radius
                    );
                }
            }
        }

        // Shells of distinct domains may not overlap.
        let shells: Vec<(ShellID, &Shell)> = self.shells.list_shells().collect();
        for (i, (sid, sh)) in shells.iter().enumerate() {
            for (tid, th) in shells.iter().skip(i + 1) {
                if sh.domain_id() == th.domain_id() {
                    continue;
                }
                let d = self.polygon.distance(
                    &sh.reference_position(&self.polygon),
                    &th.reference_position(&self.polygon),
                );
                if d < sh.size() + th.size() - tol {
                    sound = false;
                    error!(
                        "shells {} and {} of different domains overlap: {} < {}",
                        sid,
                        tid,
                        d,
                        sh.size() + th.size()
                    );
                }
            }
        }

        // Every particle and shell belongs to exactly one domain, and every
        // domain's particles sit inside its shells.
        let mut particle_owner: HashMap<ParticleID, usize> = HashMap::new();
        let mut shell_owner: HashMap<ShellID, usize> = HashMap::new();
        for (eid, _t, domain) in self.scheduler.iter() {
            for pid in domain.particle_ids() {
                *particle_owner.entry(pid).or_insert(0) += 1;
            }
            for sid in domain.shell_ids() {
                *shell_owner.entry(sid).or_insert(0) += 1;
            }

            match domain {
                Domain::Single(s) => {
                    sound &= self.check_contained(eid, s.particle_id, &[s.shell_id]);
                }
                Domain::Pair(pr) => {
                    for pid in pr.particle_ids {
                        sound &= self.check_contained(eid, pid, &[pr.shell_id]);
                    }
                }
                Domain::Multi(m) => {
                    for pid in &m.particle_ids {
                        sound &= self.check_contained(eid, *pid, &m.shell_ids);
                    }
                }
                Domain::Birth(_) => {}
            }
        }

        for (pid, _, _) in &particles {
            match particle_owner.get(pid) {
                Some(1) => {}
                Some(n) => {
                    sound = false;
                    error!("particle {} is assigned to {} domains", pid, n);
                }
                None => {
                    sound = false;
                    error!("particle {} is not assigned to any domain", pid);
                }
            }
        }
        for (sid, sh) in &shells {
            match shell_owner.get(sid) {
                Some(1) => {}
                Some(n) => {
                    sound = false;
                    error!("shell {} is assigned to {} domains", sid, n);
                }
                None => {
                    sound = false;
                    error!(
                        "shell {} is not assigned to any domain (it claims {})",
                        sid,
                        sh.domain_id()
                    );
                }
            }
        }
        for pid in particle_owner.keys() {
            if !particles.iter().any(|(q, _, _)| q == pid) {
                sound = false;
                error!("a domain references particle {} which is gone", pid);
            }
        }
        for sid in shell_owner.keys() {
            if self.shells.get(*sid).is_err() {
                sound = false;
                error!("a domain references shell {} which is gone", sid);
            }
        }

        sound
    }

    fn check_contained(
        &self,
        eid: crate::ids::EventID,
        pid: ParticleID,
        shell_ids: &[ShellID],
    ) -> bool {
        let tol = self.config.tolerance;
        let (p, fid) = match self.world.get_particle(pid) {
            Ok(x) => x,
            Err(_) => return false,
        };
        let pos = p.surface_position(fid);
        let inside = shell_ids.iter().any(|sid| match self.shells.get(*sid) {
            Ok(sh) => sh.distance_to(&self.polygon, &pos) + p.radius <= tol.max(1e-9),
            Err(_) => false,
        });
        if !inside {
            error!("particle {} is outside every shell of domain {}", pid, eid);
        }
        inside
    }
}
