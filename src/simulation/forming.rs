//! Shell construction: sizing singles against their neighbours, forming
//! pairs, and coalescing crowded regions into multis.

use log::debug;

use crate::domain::{Domain, DomainKind, Multi};
use crate::error::{Result, SgfrdError};
use crate::ids::{DomainID, FaceID, ParticleID, ShellID};
use crate::shell::Shell;
use crate::world::Particle;

use super::{Formed, SgfrdSimulator, UNOWNED};

impl SgfrdSimulator {
    /// Try to build a circular single for a particle whose geometric
    /// neighbourhood admits one. On failure the burst-shrunk intruder list
    /// is handed back for pair or multi formation.
    pub(crate) fn form_single_circular_event(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
        max_circle: f64,
    ) -> Result<Formed> {
        let min_circle = self.min_circular_shell_radius(p);
        let mergin = self.config.single_circular_shell_mergin;
        let pos = p.surface_position(fid);

        let intrusive = self.get_intrusive_domains(&pos, max_circle);
        debug!("forming circular single: {} intruders", intrusive.len());
        if intrusive.is_empty() {
            let did = self.create_single_circular_domain(pid, p, fid, max_circle * mergin)?;
            return Ok(Ok(did));
        }

        // Intruders are sorted: the first one past the minimum circle bounds
        // the achievable size, everything closer must be burst away.
        let mut dist_to_max_intruder = max_circle;
        let mut min_shell_intruder = Vec::new();
        for (did, d) in &intrusive {
            if *d <= min_circle {
                min_shell_intruder.push((*did, *d));
            } else {
                dist_to_max_intruder = dist_to_max_intruder.min(*d);
                break;
            }
        }

        if min_shell_intruder.is_empty() {
            let size = dist_to_max_intruder.min(max_circle) * mergin;
            let did = self.create_single_circular_domain(pid, p, fid, size)?;
            return Ok(Ok(did));
        }

        let shrinked = self.burst_and_shrink_non_multis(&pos, min_shell_intruder)?;
        let front = shrinked.first().map(|&(_, d)| d);
        match front {
            Some(d) if d > min_circle => {
                let size = dist_to_max_intruder.min(d) * mergin;
                let did = self.create_single_circular_domain(pid, p, fid, size)?;
                Ok(Ok(did))
            }
            None => {
                let size = dist_to_max_intruder.min(max_circle) * mergin;
                let did = self.create_single_circular_domain(pid, p, fid, size)?;
                Ok(Ok(did))
            }
            Some(_) => Ok(Err(shrinked)),
        }
    }

    /// The conical analogue, around the nearest vertex.
    pub(crate) fn form_single_conical_event(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
    ) -> Result<Formed> {
        let pos = p.surface_position(fid);
        let (vid, vdist) = self.polygon.nearest_vertex(&pos);
        let min_cone = (p.radius + vdist) * self.config.single_conical_shell_factor;
        let max_cone = self.polygon.max_cone_size(vid);
        let mergin = self.config.single_conical_shell_mergin;
        debug!("forming conical single: min {}, max {}", min_cone, max_cone);

        // Even the full fan cannot protect the particle analytically; leave
        // it to Brownian dynamics.
        if max_cone * mergin <= (p.radius + vdist) * 1.0001 {
            return Ok(Err(Vec::new()));
        }

        let vpos = self.polygon.vertex_position(vid);
        let intrusive = self.get_intrusive_domains(&vpos, max_cone);
        if intrusive.is_empty() {
            let did = self.create_single_conical_domain(pid, p, vid, max_cone * mergin)?;
            return Ok(Ok(did));
        }

        let mut dist_to_max_intruder = max_cone;
        let mut min_shell_intruder = Vec::new();
        for (did, d) in &intrusive {
            if *d <= min_cone {
                min_shell_intruder.push((*did, *d));
            } else {
                dist_to_max_intruder = dist_to_max_intruder.min(*d);
                break;
            }
        }

        if min_shell_intruder.is_empty() {
            let size = dist_to_max_intruder.min(max_cone) * mergin;
            if size <= (p.radius + vdist) * 1.0001 {
                return Ok(Err(Vec::new()));
            }
            let did = self.create_single_conical_domain(pid, p, vid, size)?;
            return Ok(Ok(did));
        }

        let shrinked = self.burst_and_shrink_non_multis(&vpos, min_shell_intruder)?;
        let front = shrinked.first().map(|&(_, d)| d);
        match front {
            Some(d) if d > min_cone => {
                let size = dist_to_max_intruder.min(d) * mergin;
                if size <= (p.radius + vdist) * 1.0001 {
                    return Ok(Err(shrinked));
                }
                let did = self.create_single_conical_domain(pid, p, vid, size)?;
                Ok(Ok(did))
            }
            _ => Ok(Err(shrinked)),
        }
    }

    /// Try to pair the particle with the nearest intruder. `None` sends the
    /// caller on to multi formation.
    pub(crate) fn form_pair(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
        intruders: &[(DomainID, f64)],
    ) -> Result<Option<DomainID>> {
        let (nearest_did, _) = match intruders.first() {
            Some(x) => *x,
            None => return Ok(None),
        };
        let partner_dom = match self.scheduler.get(nearest_did) {
            Some(Domain::Single(s)) => s.clone(),
            _ => {
                debug!("nearest intruder is not a single; cannot form pair");
                return Ok(None);
            }
        };
        let partner_id = partner_dom.particle_id;
        let partner_sid = partner_dom.shell_id;
        let (partner, partner_fid) = {
            let (q, qfid) = self.world.get_particle(partner_id)?;
            (q.clone(), qfid)
        };

        let (r1, r2) = (p.radius, partner.radius);
        let (d1, d2) = (p.d, partner.d);
        let d12 = d1 + d2;
        if d12 <= 0.0 {
            return Ok(None);
        }

        let pos_p = p.surface_position(fid);
        let pos_partner = partner.surface_position(partner_fid);
        let ipv = self.polygon.direction(&pos_p, &pos_partner);
        let len_ipv = ipv.length();
        let sh_minim = (len_ipv * d1 / d12 + r1).max(len_ipv * d2 / d12 + r2)
            * self.config.pair_shell_factor;

        let mut pos_com = pos_p;
        self.polygon.travel(&mut pos_com, ipv * (d1 / d12), 2);

        let mut max_dist = self.polygon.max_circle_size(&pos_com);
        for (did, _) in &intruders[1..] {
            let intruder_dom = match self.scheduler.get(*did) {
                Some(Domain::Single(s)) => s.clone(),
                _ => continue,
            };
            let (ip, ifid) = {
                let (q, qfid) = self.world.get_particle(intruder_dom.particle_id)?;
                (q.clone(), qfid)
            };
            let d_to_sh = self
                .polygon
                .distance(&pos_com, &ip.surface_position(ifid))
                - self.min_circular_shell_radius(&ip);
            if d_to_sh < sh_minim {
                debug!("min-pair intruder remains; multi should be formed");
                return Ok(None);
            }
            max_dist = max_dist.min(d_to_sh);
        }

        let mut pair_shell_size = max_dist;
        for (sid, d) in self
            .shells
            .list_shells_within_radius(&self.polygon, &pos_com, max_dist)
        {
            if sid == partner_sid {
                continue;
            }
            pair_shell_size = pair_shell_size.min(d);
        }

        if pair_shell_size < sh_minim {
            debug!(
                "pair shell {} below minimum {}; multi should be formed",
                pair_shell_size, sh_minim
            );
            return Ok(None);
        }

        let size = pair_shell_size * self.config.single_circular_shell_mergin;
        if size - r1.max(r2) - len_ipv <= 0.0 {
            return Ok(None);
        }

        self.shells.remove(partner_sid)?;
        self.scheduler
            .remove(nearest_did)
            .ok_or(SgfrdError::MissingEvent(nearest_did))?;

        let sid = self.shell_idgen.shell_id();
        self.shells.add(
            sid,
            Shell::circular(size, pos_com.position, pos_com.face, UNOWNED),
        )?;
        let did = self.create_pair_domain(
            sid,
            size,
            (pid, p.clone()),
            (partner_id, partner),
            ipv,
            len_ipv,
        )?;
        Ok(Some(did))
    }

    /// Minimum circular shell wrapped around a particle, unowned until the
    /// enclosing domain exists.
    fn create_minimum_shell(
        &mut self,
        p: &Particle,
        fid: FaceID,
    ) -> Result<ShellID> {
        let sid = self.shell_idgen.shell_id();
        let size = self.min_circular_shell_radius(p);
        self.shells
            .add(sid, Shell::circular(size, p.position, fid, UNOWNED))?;
        Ok(sid)
    }

    fn merge_multi_into(&mut self, source: Multi, target: &mut Multi) {
        for pid in source.particle_ids {
            target.add_particle(pid);
        }
        for sid in source.shell_ids {
            target.add_shell(sid);
        }
    }

    fn absorb_single_into(&mut self, did: DomainID, multi: &mut Multi) -> Result<()> {
        let single = match self
            .scheduler
            .remove(did)
            .ok_or(SgfrdError::MissingEvent(did))?
        {
            Domain::Single(s) => s,
            _ => return Err(SgfrdError::Inconsistent("absorbing a non-single".into())),
        };
        let min_size = self.min_circular_shell_radius(&single.particle);
        let shell = self.shells.get_mut(single.shell_id)?;
        shell.set_size(min_size);
        shell.set_domain_id(UNOWNED);
        multi.add_particle(single.particle_id);
        multi.add_shell(single.shell_id);
        debug!("absorbed single {} into a multi", did);
        Ok(())
    }

    /// Coalesce the particle and the listed intruders into one multi domain,
    /// then grow it until no further domain intrudes on its shells.
    pub(crate) fn form_multi(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
        intruders: Vec<(DomainID, f64)>,
    ) -> Result<DomainID> {
        let mut queue = intruders;
        let mut fresh = true;
        let mut fire_time = self.time;

        let mut multi = match queue.first().copied() {
            Some((first_did, _))
                if self.scheduler.get(first_did).map(|d| d.kind()) == Some(DomainKind::Multi) =>
            {
                fire_time = self
                    .scheduler
                    .time_of(first_did)
                    .ok_or(SgfrdError::MissingEvent(first_did))?;
                fresh = false;
                queue.remove(0);
                match self.scheduler.remove(first_did) {
                    Some(Domain::Multi(m)) => m,
                    _ => return Err(SgfrdError::MissingEvent(first_did)),
                }
            }
            _ => Multi::new(self.time, 0.0),
        };

        let new_shell_radius = self.min_circular_shell_radius(p);
        let minsh = self.create_minimum_shell(p, fid)?;
        multi.add_particle(pid);
        multi.add_shell(minsh);

        for (did, dist) in queue {
            if !self.scheduler.contains(did) {
                continue;
            }
            if dist >= new_shell_radius {
                continue;
            }
            match self.scheduler.get(did).map(|d| d.kind()) {
                Some(DomainKind::Multi) => {
                    let source = match self.scheduler.remove(did) {
                        Some(Domain::Multi(m)) => m,
                        _ => unreachable!("kind checked above"),
                    };
                    self.merge_multi_into(source, &mut multi);
                }
                Some(DomainKind::Pair) => return Err(SgfrdError::PairInMulti),
                Some(DomainKind::Single) => self.absorb_single_into(did, &mut multi)?,
                _ => continue,
            }
        }

        self.add_to_multi(&mut multi)?;

        if fresh {
            let mut step_scale = f64::INFINITY;
            for mpid in &multi.particle_ids {
                let (mp, _) = self.world.get_particle(*mpid)?;
                if mp.d > 0.0 {
                    step_scale = step_scale.min(mp.radius * mp.radius / mp.d);
                }
            }
            multi.begin_time = self.time;
            multi.dt = if step_scale.is_finite() {
                self.config.bd_step_count as f64 * self.config.bd_dt_factor * step_scale
            } else {
                f64::INFINITY
            };
            fire_time = self.time + multi.dt;
        }

        let formed = self.scheduler.add(Domain::Multi(multi.clone()), fire_time);
        for sid in &multi.shell_ids {
            self.shells.get_mut(*sid)?.set_domain_id(formed);
        }
        debug!(
            "multi {} formed with {} particles",
            formed,
            multi.particle_ids.len()
        );
        Ok(formed)
    }

    /// Grow a multi to a fixed point: scan its shells for intruders, merge
    /// multis, burst the rest, absorb what lands close, re-queue the rest
    /// under tight shells. An explicit worklist bounds the recursion.
    fn add_to_multi(&mut self, multi: &mut Multi) -> Result<()> {
        let tm = self.time;
        loop {
            let mut changed = false;
            for sid in multi.shell_ids.clone() {
                let shell = self.shells.get(sid)?.clone();
                let sh_pos = shell.reference_position(&self.polygon);
                let intrusive = self.get_intrusive_domains_excluding(
                    &sh_pos,
                    shell.size(),
                    &multi.shell_ids,
                );
                for (did, _) in intrusive {
                    if !self.scheduler.contains(did) {
                        continue;
                    }
                    match self.scheduler.get(did).map(|d| d.kind()) {
                        Some(DomainKind::Multi) => {
                            let source = match self.scheduler.remove(did) {
                                Some(Domain::Multi(m)) => m,
                                _ => unreachable!("kind checked above"),
                            };
                            self.merge_multi_into(source, multi);
                            changed = true;
                        }
                        Some(DomainKind::Birth) | None => continue,
                        _ => {
                            let dom = self
                                .scheduler
                                .remove(did)
                                .ok_or(SgfrdError::MissingEvent(did))?;
                            for (pid_, p_, fid_) in self.burst_domain(dom, tm)? {
                                let d = self
                                    .polygon
                                    .distance(&sh_pos, &p_.surface_position(fid_))
                                    - shell.size()
                                    - p_.radius;
                                if d < self.min_circular_shell_radius(&p_) {
                                    let msid = self.create_minimum_shell(&p_, fid_)?;
                                    multi.add_particle(pid_);
                                    multi.add_shell(msid);
                                    changed = true;
                                } else {
                                    self.create_closely_fitted_domain(pid_, &p_, fid_)?;
                                }
                            }
                        }
                    }
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }
}
