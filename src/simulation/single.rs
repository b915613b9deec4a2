//! Propagation, escape and monomolecular reactions of single domains.

use log::{debug, warn};

use crate::domain::{Single, SingleEventKind};
use crate::error::{Result, SgfrdError};
use crate::gf::{GreensFunction2DAbsSym, GreensFunction2DRefWedgeAbs};
use crate::ids::{DomainID, FaceID, ParticleID};
use crate::model::ReactionRule;
use crate::polygon::SurfacePosition;
use crate::reaction::ReactionInfo;
use crate::shell::{CircularShell, ConicalShell, Shell};
use crate::world::Particle;

use super::SgfrdSimulator;

pub(crate) type PidParticleFace = (ParticleID, Particle, FaceID);

impl SgfrdSimulator {
    /// Move the particle of a single domain to its state at `tm`, drawing
    /// the radius from the shell's Green's function.
    pub(crate) fn propagate_single(
        &mut self,
        shell: &Shell,
        dom: &Single,
        tm: f64,
    ) -> Result<PidParticleFace> {
        match shell {
            Shell::Circular(sh) => self.propagate_single_circular(sh, dom, tm),
            Shell::Conical(sh) => self.propagate_single_conical(sh, dom, tm),
        }
    }

    fn propagate_single_circular(
        &mut self,
        sh: &CircularShell,
        dom: &Single,
        tm: f64,
    ) -> Result<PidParticleFace> {
        let mut p = dom.particle.clone();
        let pid = dom.particle_id;
        let fid = self.world.get_face_id(pid)?;

        let gf = GreensFunction2DAbsSym::new(p.d, sh.size - p.radius);
        let del_t = tm - dom.begin_time;
        let u = self.uniform();
        let r = gf.draw_r(u, del_t);
        let theta = self.uniform() * 2.0 * std::f64::consts::PI;

        self.displace_on_face(&mut p, pid, fid, r, theta)
    }

    fn propagate_single_conical(
        &mut self,
        sh: &ConicalShell,
        dom: &Single,
        tm: f64,
    ) -> Result<PidParticleFace> {
        let mut p = dom.particle.clone();
        let pid = dom.particle_id;
        let fid = self.world.get_face_id(pid)?;

        let r_max = sh.size - p.radius;
        let gf = GreensFunction2DRefWedgeAbs::new(
            p.d,
            p.position.distance_to(&sh.apex),
            r_max,
            sh.apex_angle,
        );
        let del_t = tm - dom.begin_time;
        let u = self.uniform();
        let r = gf.draw_r(u, del_t);
        let u = self.uniform();
        let theta = gf.draw_theta(u, r, del_t);

        let state = self
            .polygon
            .roll(&p.surface_position(fid), sh.vertex, r, theta);
        p.position = state.position;
        self.world.update_particle(pid, p.clone(), state.face)?;
        Ok((pid, p, state.face))
    }

    /// Escape: the boundary hit resolved exactly at the shell rim.
    pub(crate) fn escape_single(&mut self, shell: &Shell, dom: &Single) -> Result<PidParticleFace> {
        match shell {
            Shell::Circular(sh) => self.escape_single_circular(sh, dom),
            Shell::Conical(sh) => self.escape_single_conical(sh, dom),
        }
    }

    fn escape_single_circular(
        &mut self,
        sh: &CircularShell,
        dom: &Single,
    ) -> Result<PidParticleFace> {
        let mut p = dom.particle.clone();
        let pid = dom.particle_id;
        let fid = self.world.get_face_id(pid)?;

        if sh.size == p.radius {
            // Closely fitted shell; the particle has nowhere to go.
            return Ok((pid, p, fid));
        }

        let r = sh.size - p.radius;
        let theta = self.uniform() * 2.0 * std::f64::consts::PI;
        self.displace_on_face(&mut p, pid, fid, r, theta)
    }

    fn escape_single_conical(
        &mut self,
        sh: &ConicalShell,
        dom: &Single,
    ) -> Result<PidParticleFace> {
        let mut p = dom.particle.clone();
        let pid = dom.particle_id;
        let fid = self.world.get_face_id(pid)?;

        let r = sh.size - p.radius;
        let gf = GreensFunction2DRefWedgeAbs::new(
            p.d,
            p.position.distance_to(&sh.apex),
            r,
            sh.apex_angle,
        );
        let u = self.uniform();
        let theta = gf.draw_theta(u, r, dom.dt);

        let state = self
            .polygon
            .roll(&p.surface_position(fid), sh.vertex, r, theta);
        p.position = state.position;
        self.world.update_particle(pid, p.clone(), state.face)?;
        Ok((pid, p, state.face))
    }

    /// Carry a particle a distance `r` at angle `theta` within its face,
    /// crossing up to two edges.
    fn displace_on_face(
        &mut self,
        p: &mut Particle,
        pid: ParticleID,
        fid: FaceID,
        r: f64,
        theta: f64,
    ) -> Result<PidParticleFace> {
        let direction = self.face_direction(fid, theta);
        let mut state = p.surface_position(fid);
        let hops = self.polygon.travel(&mut state, direction * r, 2);
        if hops == 0 {
            warn!("moving on face: precision lost");
        }
        p.position = state.position;
        self.world.update_particle(pid, p.clone(), state.face)?;
        Ok((pid, p.clone(), state.face))
    }

    pub(crate) fn fire_single(&mut self, dom: Single, did: DomainID) -> Result<()> {
        let sid = dom.shell_id;
        match dom.kind {
            SingleEventKind::Escape => {
                let shell = self.shells.get(sid)?.clone();
                let (pid, p, fid) = self.escape_single(&shell, &dom)?;
                self.shells.remove(sid)?;
                self.create_event(pid, &p, fid)?;
                Ok(())
            }
            SingleEventKind::Reaction => {
                let shell = self.shells.get(sid)?.clone();
                let results = self.reaction_single(&shell, &dom, did)?;
                self.shells.remove(sid)?;
                for (pid, p, fid) in results {
                    debug!("requeueing {} after reaction", pid);
                    self.create_closely_fitted_domain(pid, &p, fid)?;
                }
                Ok(())
            }
            SingleEventKind::Unknown => Err(SgfrdError::UnknownEventKind),
        }
    }

    /// Propagate to the current time, then try a monomolecular reaction.
    /// The shell is still registered while this runs.
    pub(crate) fn reaction_single(
        &mut self,
        shell: &Shell,
        dom: &Single,
        did: DomainID,
    ) -> Result<Vec<PidParticleFace>> {
        let (pid, p, fid) = self.propagate_single(shell, dom, self.time)?;
        self.attempt_reaction_single(shell, did, pid, p, fid)
    }

    pub(crate) fn attempt_reaction_single(
        &mut self,
        shell: &Shell,
        did: DomainID,
        pid: ParticleID,
        p: Particle,
        fid: FaceID,
    ) -> Result<Vec<PidParticleFace>> {
        let rules: Vec<ReactionRule> = self
            .model
            .query_reaction_rules(&p.species)
            .into_iter()
            .cloned()
            .collect();
        if rules.is_empty() {
            return Ok(vec![(pid, p, fid)]);
        }
        let rule = match self.determine_reaction_rule(&rules) {
            Some(rule) => rule,
            None => return Ok(vec![(pid, p, fid)]),
        };

        match rule.products().len() {
            0 => {
                debug!("degradation of {}", pid);
                self.world.remove_particle(pid)?;
                self.last_reactions.push((
                    rule.clone(),
                    ReactionInfo::degradation(self.time, pid, p),
                ));
                Ok(Vec::new())
            }
            1 => self.attempt_reaction_1_to_1(&rule, shell, did, pid, p, fid),
            2 => self.attempt_reaction_1_to_2(&rule, shell, did, pid, p, fid),
            n => Err(SgfrdError::UnsupportedRule { products: n }),
        }
    }

    fn attempt_reaction_1_to_1(
        &mut self,
        rule: &ReactionRule,
        shell: &Shell,
        did: DomainID,
        pid: ParticleID,
        p: Particle,
        fid: FaceID,
    ) -> Result<Vec<PidParticleFace>> {
        let species_new = self.model.apply_species_attributes(&rule.products()[0]);
        let info = self.model.molecule_info(&species_new);
        let p_new = Particle::new(species_new, p.position, info.radius, info.d);

        let pos = p_new.surface_position(fid);
        if !self.particle_inside_shell(shell, &pos, p_new.radius) {
            // The product pokes out of the shell; the volume must be cleared.
            let no_overlap = self.burst_and_shrink_overlaps(&p_new, fid, did)?;
            if !no_overlap {
                debug!("1->1 rejected: no space for the product");
                return Ok(vec![(pid, p, fid)]);
            }
        }

        self.last_reactions.push((
            rule.clone(),
            ReactionInfo::unimolecular(self.time, (pid, p), (pid, p_new.clone())),
        ));
        self.world.update_particle(pid, p_new.clone(), fid)?;
        Ok(vec![(pid, p_new, fid)])
    }

    fn attempt_reaction_1_to_2(
        &mut self,
        rule: &ReactionRule,
        shell: &Shell,
        did: DomainID,
        pid: ParticleID,
        p: Particle,
        fid: FaceID,
    ) -> Result<Vec<PidParticleFace>> {
        let sp1 = self.model.apply_species_attributes(&rule.products()[0]);
        let sp2 = self.model.apply_species_attributes(&rule.products()[1]);
        let mol1 = self.model.molecule_info(&sp1);
        let mol2 = self.model.molecule_info(&sp2);

        let (r1, r2) = (mol1.radius, mol2.radius);
        let r12 = r1 + r2;
        let mut separation = r12 * self.config.minimum_separation_factor;

        let mut placed: Option<(SurfacePosition, SurfacePosition)> = None;
        let mut rejected = false;
        for _ in 0..self.config.split_retry_count {
            let theta = self.uniform() * 2.0 * std::f64::consts::PI;
            let ipv = self.face_direction(fid, theta) * (r12 + separation);

            let mut pos1 = SurfacePosition::new(p.position, fid);
            let mut pos2 = SurfacePosition::new(p.position, fid);
            if self.polygon.travel(&mut pos1, ipv * (r1 / r12), 100) == 0 {
                warn!("splitting products: precision lost");
            }
            if self.polygon.travel(&mut pos2, ipv * (-r2 / r12), 100) == 0 {
                warn!("splitting products: precision lost");
            }

            // The two products must not overlap each other.
            if self.polygon.distance(&pos1, &pos2) <= r12 {
                separation *= 2.0;
                continue;
            }

            let mut clear = true;
            for (pos, radius) in [(&pos1, r1), (&pos2, r2)] {
                if !self.particle_inside_shell(shell, pos, radius) {
                    let probe = Particle::new(p.species.clone(), pos.position, radius, 0.0);
                    if !self.burst_and_shrink_overlaps(&probe, pos.face, did)? {
                        clear = false;
                        break;
                    }
                }
            }
            if clear {
                placed = Some((pos1, pos2));
            } else {
                rejected = true;
            }
            break;
        }

        let (pos1, pos2) = match (placed, rejected) {
            (Some(pair), _) => pair,
            _ => {
                debug!("1->2 rejected: no space for the products");
                return Ok(vec![(pid, p, fid)]);
            }
        };

        let p1 = Particle::new(sp1, pos1.position, r1, mol1.d);
        let p2 = Particle::new(sp2, pos2.position, r2, mol2.d);

        self.world.update_particle(pid, p1.clone(), pos1.face)?;
        let pid2 = match self
            .world
            .create_particle(&self.polygon, p2.clone(), pos2.face)
        {
            Some(pid2) => pid2,
            None => {
                // Somebody still occupies the site; revert the first product.
                self.world.update_particle(pid, p.clone(), fid)?;
                debug!("1->2 rejected: second product placement failed");
                return Ok(vec![(pid, p, fid)]);
            }
        };

        self.last_reactions.push((
            rule.clone(),
            ReactionInfo::unbinding(
                self.time,
                (pid, p),
                [(pid, p1.clone()), (pid2, p2.clone())],
            ),
        ));
        debug!("1->2 succeeded: {} -> {}, {}", pid, pid, pid2);
        Ok(vec![(pid, p1, pos1.face), (pid2, p2, pos2.face)])
    }
}
