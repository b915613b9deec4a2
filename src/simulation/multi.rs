//! Brownian-dynamics stepping of multi domains over their horizon.

use log::{debug, warn};

use crate::common::rng::gaussian;
use crate::domain::Multi;
use crate::error::Result;
use crate::ids::{DomainID, FaceID, ParticleID};
use crate::model::ReactionRule;
use crate::polygon::SurfacePosition;
use crate::reaction::ReactionInfo;
use crate::world::Particle;

use super::SgfrdSimulator;

impl SgfrdSimulator {
    /// Advance a multi by BD microsteps until its horizon or the first
    /// reaction, then dissolve it into closely fitted singles.
    pub(crate) fn fire_multi(&mut self, multi: Multi, _did: DomainID) -> Result<()> {
        let steps = self.config.bd_step_count;
        let dt_step = if multi.dt.is_finite() && steps > 0 {
            multi.dt / steps as f64
        } else {
            0.0
        };

        if dt_step > 0.0 {
            'horizon: for _ in 0..steps {
                for pid in multi.particle_ids.clone() {
                    let (p, fid) = match self.world.get_particle(pid) {
                        Ok((p, fid)) => (p.clone(), fid),
                        Err(_) => continue,
                    };

                    // Monomolecular channels fire as Poisson processes.
                    let k_tot = self.monomolecular_rate(&p.species);
                    if k_tot > 0.0 && self.uniform() < k_tot * dt_step {
                        self.multi_attempt_monomolecular(&multi, pid, p, fid)?;
                        break 'horizon;
                    }

                    // Gaussian step in the face plane, carried along the
                    // surface, rejected on overlap or on leaving the shells.
                    if p.d > 0.0 {
                        let sd = (2.0 * p.d * dt_step).sqrt();
                        let tri = self.polygon.triangle_at(fid);
                        let e1 = tri.represent().normalize();
                        let e2 = tri.normal().cross(&e1);
                        let disp = e1 * gaussian(&mut self.rng, sd)
                            + e2 * gaussian(&mut self.rng, sd);
                        let mut state = p.surface_position(fid);
                        if self.polygon.travel(&mut state, disp, 100) == 0 {
                            warn!("moving on face by BD: precision lost");
                        }
                        if self.multi_move_allowed(&multi, pid, &state, p.radius) {
                            let mut moved = p.clone();
                            moved.position = state.position;
                            self.world.update_particle(pid, moved, state.face)?;
                        }
                    }

                    if self.multi_attempt_bimolecular(&multi, pid, dt_step)? {
                        break 'horizon;
                    }
                }
            }
        }

        // Dissolve: free the shells, re-queue every survivor tightly. The
        // tight domains fire at the current time and rebuild properly.
        for sid in &multi.shell_ids {
            self.shells.remove(*sid)?;
        }
        for pid in multi.particle_ids {
            if let Ok((p, fid)) = self.world.get_particle(pid).map(|(p, f)| (p.clone(), f)) {
                self.create_closely_fitted_domain(pid, &p, fid)?;
            }
        }
        Ok(())
    }

    /// A move is allowed if the particle stays within the multi's shell
    /// union and overlaps nobody.
    fn multi_move_allowed(
        &self,
        multi: &Multi,
        pid: ParticleID,
        state: &SurfacePosition,
        radius: f64,
    ) -> bool {
        let contained = multi.shell_ids.iter().any(|sid| {
            self.shells
                .get(*sid)
                .map(|sh| self.particle_inside_shell(sh, state, radius))
                .unwrap_or(false)
        });
        if !contained {
            return false;
        }
        for (qid, q, qfid) in self.world.list_particles() {
            if qid == pid {
                continue;
            }
            let d = self.polygon.distance(state, &q.surface_position(qfid));
            if d < radius + q.radius {
                return false;
            }
        }
        true
    }

    fn position_clear_for(
        &self,
        multi: &Multi,
        pos: &SurfacePosition,
        radius: f64,
        ignore: &[ParticleID],
    ) -> bool {
        let contained = multi.shell_ids.iter().any(|sid| {
            self.shells
                .get(*sid)
                .map(|sh| self.particle_inside_shell(sh, pos, radius))
                .unwrap_or(false)
        });
        if !contained {
            return false;
        }
        for (qid, q, qfid) in self.world.list_particles() {
            if ignore.contains(&qid) {
                continue;
            }
            if self.polygon.distance(pos, &q.surface_position(qfid)) < radius + q.radius {
                return false;
            }
        }
        true
    }

    /// Monomolecular firing inside a multi. Placement failures skip the
    /// reaction and keep the reactant.
    pub(crate) fn multi_attempt_monomolecular(
        &mut self,
        multi: &Multi,
        pid: ParticleID,
        p: Particle,
        fid: FaceID,
    ) -> Result<()> {
        let rules: Vec<ReactionRule> = self
            .model
            .query_reaction_rules(&p.species)
            .into_iter()
            .cloned()
            .collect();
        let rule = match self.determine_reaction_rule(&rules) {
            Some(rule) => rule,
            None => return Ok(()),
        };

        match rule.products().len() {
            0 => {
                self.world.remove_particle(pid)?;
                self.last_reactions
                    .push((rule, ReactionInfo::degradation(self.time, pid, p)));
                Ok(())
            }
            1 => {
                let species = self.model.apply_species_attributes(&rule.products()[0]);
                let info = self.model.molecule_info(&species);
                let p_new = Particle::new(species, p.position, info.radius, info.d);
                let pos = p_new.surface_position(fid);
                if !self.position_clear_for(multi, &pos, p_new.radius, &[pid]) {
                    debug!("1->1 in multi rejected: no space");
                    return Ok(());
                }
                self.last_reactions.push((
                    rule,
                    ReactionInfo::unimolecular(self.time, (pid, p), (pid, p_new.clone())),
                ));
                self.world.update_particle(pid, p_new, fid)?;
                Ok(())
            }
            2 => {
                let sp1 = self.model.apply_species_attributes(&rule.products()[0]);
                let sp2 = self.model.apply_species_attributes(&rule.products()[1]);
                let mol1 = self.model.molecule_info(&sp1);
                let mol2 = self.model.molecule_info(&sp2);
                let r12 = mol1.radius + mol2.radius;
                let mut separation = r12 * self.config.minimum_separation_factor;

                for _ in 0..self.config.split_retry_count {
                    let theta = self.uniform() * 2.0 * std::f64::consts::PI;
                    let ipv = self.face_direction(fid, theta) * (r12 + separation);
                    let mut pos1 = SurfacePosition::new(p.position, fid);
                    let mut pos2 = SurfacePosition::new(p.position, fid);
                    self.polygon.travel(&mut pos1, ipv * (mol1.radius / r12), 100);
                    self.polygon.travel(&mut pos2, ipv * (-mol2.radius / r12), 100);

                    if self.polygon.distance(&pos1, &pos2) <= r12 {
                        separation *= 2.0;
                        continue;
                    }
                    if !self.position_clear_for(multi, &pos1, mol1.radius, &[pid])
                        || !self.position_clear_for(multi, &pos2, mol2.radius, &[pid])
                    {
                        debug!("1->2 in multi rejected: no space");
                        return Ok(());
                    }

                    let p1 = Particle::new(sp1, pos1.position, mol1.radius, mol1.d);
                    let p2 = Particle::new(sp2, pos2.position, mol2.radius, mol2.d);
                    self.world.update_particle(pid, p1.clone(), pos1.face)?;
                    let pid2 = match self
                        .world
                        .create_particle(&self.polygon, p2.clone(), pos2.face)
                    {
                        Some(pid2) => pid2,
                        None => {
                            self.world.update_particle(pid, p.clone(), fid)?;
                            return Ok(());
                        }
                    };
                    self.last_reactions.push((
                        rule,
                        ReactionInfo::unbinding(
                            self.time,
                            (pid, p),
                            [(pid, p1), (pid2, p2.clone())],
                        ),
                    ));
                    self.create_closely_fitted_domain(pid2, &p2, pos2.face)?;
                    return Ok(());
                }
                debug!("1->2 in multi rejected: separation never achieved");
                Ok(())
            }
            n => Err(crate::error::SgfrdError::UnsupportedRule { products: n }),
        }
    }

    /// Contact-ring bimolecular attempt for one particle against its multi
    /// companions. Returns whether a reaction fired.
    fn multi_attempt_bimolecular(
        &mut self,
        multi: &Multi,
        pid: ParticleID,
        dt_step: f64,
    ) -> Result<bool> {
        let (p, fid) = match self.world.get_particle(pid) {
            Ok((p, fid)) => (p.clone(), fid),
            Err(_) => return Ok(false),
        };
        let pos = p.surface_position(fid);
        let lambda = self.config.reaction_length_factor;

        for qid in multi.particle_ids.clone() {
            if qid == pid {
                continue;
            }
            let (q, qfid) = match self.world.get_particle(qid) {
                Ok((q, qfid)) => (q.clone(), qfid),
                Err(_) => continue,
            };
            let sigma = p.radius + q.radius;
            let d = self.polygon.distance(&pos, &q.surface_position(qfid));
            if d > sigma * (1.0 + lambda) {
                continue;
            }

            let rules: Vec<ReactionRule> = self
                .model
                .query_reaction_rules_pair(&p.species, &q.species)
                .into_iter()
                .cloned()
                .collect();
            if rules.is_empty() {
                continue;
            }
            let k_tot: f64 = rules.iter().map(|r| r.rate()).sum();
            // Acceptance over the contact ring area swept by dt_step.
            let ring = std::f64::consts::PI * sigma * sigma * ((1.0 + lambda).powi(2) - 1.0);
            let p_acc = (k_tot * dt_step / ring).min(1.0);
            if self.uniform() >= p_acc {
                continue;
            }

            let rule = match self.determine_reaction_rule(&rules) {
                Some(rule) => rule,
                None => continue,
            };
            match rule.products().len() {
                1 => {
                    // Product at the D-weighted point between the reactants.
                    let d12 = p.d + q.d;
                    let frac = if d12 > 0.0 { p.d / d12 } else { 0.5 };
                    let dir = self.polygon.direction(&pos, &q.surface_position(qfid));
                    let mut prod_pos = pos;
                    self.polygon.travel(&mut prod_pos, dir * frac, 100);

                    let species = self.model.apply_species_attributes(&rule.products()[0]);
                    let info = self.model.molecule_info(&species);
                    if !self.position_clear_for(multi, &prod_pos, info.radius, &[pid, qid]) {
                        debug!("2->1 in multi rejected: no space");
                        continue;
                    }

                    let product = Particle::new(species, prod_pos.position, info.radius, info.d);
                    self.world.remove_particle(pid)?;
                    self.world.remove_particle(qid)?;
                    let new_pid = match self
                        .world
                        .create_particle(&self.polygon, product.clone(), prod_pos.face)
                    {
                        Some(new_pid) => new_pid,
                        None => {
                            return Err(crate::error::SgfrdError::Inconsistent(
                                "2->1 product placement failed in multi".into(),
                            ))
                        }
                    };
                    self.last_reactions.push((
                        rule,
                        ReactionInfo::binding(
                            self.time,
                            [(pid, p), (qid, q)],
                            (new_pid, product.clone()),
                        ),
                    ));
                    self.create_closely_fitted_domain(new_pid, &product, prod_pos.face)?;
                    debug!("2->1 in multi: {}, {} -> {}", pid, qid, new_pid);
                    return Ok(true);
                }
                2 => {
                    // Exchange in place, each product on its reactant's
                    // side; push apart only if the products outgrow the
                    // old contact.
                    let products = rule.products();
                    let aligned = rule.reactants().first() == Some(&p.species);
                    let (sp_p, sp_q) = if aligned {
                        (products[0].clone(), products[1].clone())
                    } else {
                        (products[1].clone(), products[0].clone())
                    };
                    let sp_p = self.model.apply_species_attributes(&sp_p);
                    let sp_q = self.model.apply_species_attributes(&sp_q);
                    let mol_p = self.model.molecule_info(&sp_p);
                    let mol_q = self.model.molecule_info(&sp_q);
                    let sigma_new = mol_p.radius + mol_q.radius;

                    let pos_p = pos;
                    let mut pos_q = q.surface_position(qfid);
                    if self.polygon.distance(&pos_p, &pos_q) <= sigma_new {
                        let dir = self.polygon.direction(&pos_p, &pos_q);
                        let len = dir.length().max(1e-300);
                        let span =
                            sigma_new * (1.0 + 2.0 * self.config.minimum_separation_factor);
                        pos_q = pos_p;
                        self.polygon.travel(&mut pos_q, dir * (span / len), 100);
                    }
                    if self.polygon.distance(&pos_p, &pos_q) <= sigma_new
                        || !self.position_clear_for(multi, &pos_p, mol_p.radius, &[pid, qid])
                        || !self.position_clear_for(multi, &pos_q, mol_q.radius, &[pid, qid])
                    {
                        debug!("2->2 in multi rejected: no space");
                        continue;
                    }

                    let new_p = Particle::new(sp_p, pos_p.position, mol_p.radius, mol_p.d);
                    let new_q = Particle::new(sp_q, pos_q.position, mol_q.radius, mol_q.d);
                    self.world.update_particle(pid, new_p.clone(), pos_p.face)?;
                    self.world.update_particle(qid, new_q.clone(), pos_q.face)?;
                    self.last_reactions.push((
                        rule,
                        ReactionInfo::exchange(
                            self.time,
                            [(pid, p), (qid, q)],
                            [(pid, new_p), (qid, new_q)],
                        ),
                    ));
                    debug!("2->2 in multi: {}, {}", pid, qid);
                    return Ok(true);
                }
                n => {
                    return Err(crate::error::SgfrdError::UnsupportedRule { products: n });
                }
            }
        }
        Ok(false)
    }
}
