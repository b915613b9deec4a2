//! Pair domains: centre-of-mass / inter-particle-vector decomposition.

use log::{debug, warn};

use crate::common::geometry::{rotate, Vector3};
use crate::common::rng::{exponential_time, gaussian};
use crate::domain::{Domain, Pair, PairEventKind};
use crate::error::{Result, SgfrdError};
use crate::gf::{GreensFunction2DAbsSym, GreensFunction2DRadAbs};
use crate::ids::{DomainID, ParticleID, ShellID};
use crate::model::ReactionRule;
use crate::polygon::SurfacePosition;
use crate::reaction::ReactionInfo;
use crate::world::Particle;

use super::single::PidParticleFace;
use super::SgfrdSimulator;

impl SgfrdSimulator {
    /// Build the pair domain inside an already-registered shell and draw its
    /// next event.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_pair_domain(
        &mut self,
        shell_id: ShellID,
        shell_size: f64,
        first: (ParticleID, Particle),
        second: (ParticleID, Particle),
        ipv: Vector3,
        len_ipv: f64,
    ) -> Result<DomainID> {
        let (pid1, p1) = first;
        let (pid2, p2) = second;
        let sigma = p1.radius + p2.radius;
        let d12 = p1.d + p2.d;
        let d_com = if d12 > 0.0 { p1.d * p2.d / d12 } else { 0.0 };

        let max_r = p1.radius.max(p2.radius);
        let free = shell_size - max_r;
        let slack = free - len_ipv;
        debug_assert!(slack > 0.0, "pair shell too small for its ipv");
        let a_ipv = len_ipv + slack * 0.5;
        let a_com = slack * 0.5;

        let u = self.uniform();
        let t_com = GreensFunction2DAbsSym::new(d_com, a_com).draw_time(u);
        let u = self.uniform();
        let t_ipv = GreensFunction2DRadAbs::new(d12, len_ipv, sigma, a_ipv).draw_time(u);
        let k_mono =
            self.monomolecular_rate(&p1.species) + self.monomolecular_rate(&p2.species);
        let t_single = exponential_time(&mut self.rng, k_mono);

        let (kind, dt) = if t_com <= t_ipv && t_com <= t_single {
            (PairEventKind::ComEscape, t_com)
        } else if t_ipv <= t_single {
            (PairEventKind::IpvEvent, t_ipv)
        } else {
            (PairEventKind::SingleReaction, t_single)
        };

        let pair = Pair {
            kind,
            begin_time: self.time,
            dt,
            shell_id,
            particle_ids: [pid1, pid2],
            particles: [p1, p2],
            ipv,
            len_ipv,
            a_com,
            a_ipv,
        };
        let did = self.scheduler.add(Domain::Pair(pair), self.time + dt);
        self.shells.get_mut(shell_id)?.set_domain_id(did);
        debug!("pair {} formed (shell {}, size {})", did, shell_id, shell_size);
        Ok(did)
    }

    /// Turn a (com radius, ipv radius) draw into two particle positions and
    /// write them back to the world.
    fn resolve_pair(
        &mut self,
        pair: &Pair,
        r_com: f64,
        r_ipv: f64,
        del_t: f64,
    ) -> Result<(PidParticleFace, PidParticleFace)> {
        let [mut p1, mut p2] = pair.particles.clone();
        let [pid1, pid2] = pair.particle_ids;
        let fid1 = self.world.get_face_id(pid1)?;
        let d12 = pair.d_tot();
        let frac1 = if d12 > 0.0 { p1.d / d12 } else { 0.5 };
        let frac2 = 1.0 - frac1;

        // Centre of mass at creation, then its displacement.
        let mut com = SurfacePosition::new(p1.position, fid1);
        self.polygon.travel(&mut com, pair.ipv * frac1, 2);
        if r_com > 0.0 {
            let theta = self.uniform() * 2.0 * std::f64::consts::PI;
            let dir = self.face_direction(com.face, theta);
            if self.polygon.travel(&mut com, dir * r_com, 2) == 0 {
                warn!("pair com displacement: precision lost");
            }
        }

        // Evolve the ipv direction in the com's face plane.
        let n = self.polygon.triangle_at(com.face).normal();
        let mut base = pair.ipv - n * pair.ipv.dot(&n);
        if base.length() < 1e-300 {
            base = self.polygon.triangle_at(com.face).represent();
        }
        let base = base.normalize();
        let r_mean = (0.5 * (pair.len_ipv + r_ipv)).max(1e-300);
        let sd = (2.0 * d12 * del_t.max(0.0)).sqrt() / r_mean;
        let dtheta = gaussian(&mut self.rng, sd);
        let ipv_dir = rotate(dtheta, &n, &base);

        let mut pos1 = com;
        if self.polygon.travel(&mut pos1, ipv_dir * (-frac1 * r_ipv), 2) == 0 {
            warn!("pair member displacement: precision lost");
        }
        let mut pos2 = com;
        if self.polygon.travel(&mut pos2, ipv_dir * (frac2 * r_ipv), 2) == 0 {
            warn!("pair member displacement: precision lost");
        }

        // Contact is resolved by the reaction path, never by placement.
        let sigma = pair.sigma();
        if self.polygon.distance(&pos1, &pos2) <= sigma {
            let push = sigma * (1.0 + 2.0 * self.config.minimum_separation_factor);
            pos2 = pos1;
            self.polygon.travel(&mut pos2, ipv_dir * push, 2);
        }

        p1.position = pos1.position;
        p2.position = pos2.position;
        self.world.update_particle(pid1, p1.clone(), pos1.face)?;
        self.world.update_particle(pid2, p2.clone(), pos2.face)?;
        Ok(((pid1, p1, pos1.face), (pid2, p2, pos2.face)))
    }

    /// Propagate a pair to an arbitrary time before its own event (burst).
    pub(crate) fn propagate_pair(
        &mut self,
        pair: &Pair,
        tm: f64,
    ) -> Result<[PidParticleFace; 2]> {
        let del_t = tm - pair.begin_time;
        let u = self.uniform();
        let r_com = GreensFunction2DAbsSym::new(pair.d_com(), pair.a_com).draw_r(u, del_t);
        let u = self.uniform();
        let r_ipv = GreensFunction2DRadAbs::new(
            pair.d_tot(),
            pair.len_ipv,
            pair.sigma(),
            pair.a_ipv,
        )
        .draw_r(u, del_t);
        let (a, b) = self.resolve_pair(pair, r_com, r_ipv, del_t)?;
        Ok([a, b])
    }

    pub(crate) fn fire_pair(&mut self, pair: Pair, did: DomainID) -> Result<()> {
        match pair.kind {
            PairEventKind::ComEscape => {
                let u = self.uniform();
                let r_ipv = GreensFunction2DRadAbs::new(
                    pair.d_tot(),
                    pair.len_ipv,
                    pair.sigma(),
                    pair.a_ipv,
                )
                .draw_r(u, pair.dt);
                let (a, b) = self.resolve_pair(&pair, pair.a_com, r_ipv, pair.dt)?;
                self.shells.remove(pair.shell_id)?;
                for (pid, p, fid) in [a, b] {
                    self.create_closely_fitted_domain(pid, &p, fid)?;
                }
                Ok(())
            }
            PairEventKind::IpvEvent => self.fire_pair_ipv(pair, did),
            PairEventKind::SingleReaction => self.fire_pair_single_reaction(pair, did),
            PairEventKind::Unknown => Err(SgfrdError::UnknownEventKind),
        }
    }

    /// The inter-particle vector left its annulus: either the two met at
    /// contact (reaction) or they drifted apart (escape). The harmonic
    /// splitting decides which rim was hit, and a finite intrinsic rate
    /// turns part of the contact hits back into escapes.
    fn fire_pair_ipv(&mut self, pair: Pair, did: DomainID) -> Result<()> {
        let gf_ipv = GreensFunction2DRadAbs::new(
            pair.d_tot(),
            pair.len_ipv,
            pair.sigma(),
            pair.a_ipv,
        );
        let rules: Vec<ReactionRule> = self
            .model
            .query_reaction_rules_pair(&pair.particles[0].species, &pair.particles[1].species)
            .into_iter()
            .cloned()
            .collect();

        let mut react = false;
        if !rules.is_empty() {
            let k_tot: f64 = rules.iter().map(|r| r.rate()).sum();
            let k_diff =
                2.0 * std::f64::consts::PI * pair.d_tot() / (pair.a_ipv / pair.sigma()).ln();
            let p_contact = gf_ipv.leave_sigma_probability();
            let p_accept = p_contact * k_tot / (k_tot + k_diff);
            react = self.uniform() < p_accept;
        }

        if react {
            self.attempt_pair_reaction(&pair, did, &rules)
        } else {
            let u = self.uniform();
            let r_com =
                GreensFunction2DAbsSym::new(pair.d_com(), pair.a_com).draw_r(u, pair.dt);
            let (a, b) = self.resolve_pair(&pair, r_com, pair.a_ipv, pair.dt)?;
            self.shells.remove(pair.shell_id)?;
            for (pid, p, fid) in [a, b] {
                self.create_closely_fitted_domain(pid, &p, fid)?;
            }
            Ok(())
        }
    }

    /// The contact was reached and the intrinsic rate accepted: draw the
    /// rule and run the matching bimolecular kernel.
    fn attempt_pair_reaction(
        &mut self,
        pair: &Pair,
        did: DomainID,
        rules: &[ReactionRule],
    ) -> Result<()> {
        let rule = match self.determine_reaction_rule(rules) {
            Some(rule) => rule,
            None => return Err(SgfrdError::Inconsistent("pair reaction without rule".into())),
        };
        match rule.products().len() {
            1 => self.pair_reaction_2_to_1(pair, did, &rule),
            2 => self.pair_reaction_2_to_2(pair, did, &rule),
            n => Err(SgfrdError::UnsupportedRule { products: n }),
        }
    }

    fn pair_reaction_2_to_1(
        &mut self,
        pair: &Pair,
        did: DomainID,
        rule: &ReactionRule,
    ) -> Result<()> {
        let [p1, p2] = pair.particles.clone();
        let [pid1, pid2] = pair.particle_ids;
        let fid1 = self.world.get_face_id(pid1)?;
        let d12 = pair.d_tot();
        let frac1 = if d12 > 0.0 { p1.d / d12 } else { 0.5 };

        // The product appears at the centre of mass at firing time.
        let mut com = SurfacePosition::new(p1.position, fid1);
        self.polygon.travel(&mut com, pair.ipv * frac1, 2);
        let u = self.uniform();
        let r_com = GreensFunction2DAbsSym::new(pair.d_com(), pair.a_com).draw_r(u, pair.dt);
        if r_com > 0.0 {
            let theta = self.uniform() * 2.0 * std::f64::consts::PI;
            let dir = self.face_direction(com.face, theta);
            self.polygon.travel(&mut com, dir * r_com, 2);
        }

        let species = self.model.apply_species_attributes(&rule.products()[0]);
        let info = self.model.molecule_info(&species);
        let product = Particle::new(species, com.position, info.radius, info.d);

        // Clear the neighbourhood for the product.
        if !self.burst_and_shrink_overlaps(&product, com.face, did)? {
            debug!("2->1 rejected: no space at the com; resolving as escape");
            let (a, b) = self.resolve_pair(pair, r_com, pair.a_ipv, pair.dt)?;
            self.shells.remove(pair.shell_id)?;
            for (pid, p, fid) in [a, b] {
                self.create_closely_fitted_domain(pid, &p, fid)?;
            }
            return Ok(());
        }
        // Make sure nothing but the reactants occupies the site.
        for (qid, q, qfid) in self.world.list_particles() {
            if qid == pid1 || qid == pid2 {
                continue;
            }
            let d = self
                .polygon
                .distance(&com, &q.surface_position(qfid));
            if d < product.radius + q.radius {
                debug!("2->1 rejected: site still occupied; resolving as escape");
                let (a, b) = self.resolve_pair(pair, r_com, pair.a_ipv, pair.dt)?;
                self.shells.remove(pair.shell_id)?;
                for (pid, p, fid) in [a, b] {
                    self.create_closely_fitted_domain(pid, &p, fid)?;
                }
                return Ok(());
            }
        }

        self.world.remove_particle(pid1)?;
        self.world.remove_particle(pid2)?;
        let new_pid = self
            .world
            .create_particle(&self.polygon, product.clone(), com.face)
            .ok_or_else(|| SgfrdError::Inconsistent("2->1 product placement failed".into()))?;

        self.last_reactions.push((
            rule.clone(),
            ReactionInfo::binding(
                self.time,
                [(pid1, p1), (pid2, p2)],
                (new_pid, product.clone()),
            ),
        ));
        self.shells.remove(pair.shell_id)?;
        self.create_closely_fitted_domain(new_pid, &product, com.face)?;
        debug!("2->1 succeeded: {}, {} -> {}", pid1, pid2, new_pid);
        Ok(())
    }

    /// Exchange at contact: both reactants turn into products, re-placed
    /// about the centre of mass with the same retry protocol as a 1 -> 2
    /// split. Placement failure rejects the reaction and the pair resolves
    /// as an escape.
    fn pair_reaction_2_to_2(
        &mut self,
        pair: &Pair,
        did: DomainID,
        rule: &ReactionRule,
    ) -> Result<()> {
        let [p1, p2] = pair.particles.clone();
        let [pid1, pid2] = pair.particle_ids;
        let fid1 = self.world.get_face_id(pid1)?;
        let d12 = pair.d_tot();
        let frac1 = if d12 > 0.0 { p1.d / d12 } else { 0.5 };

        // Keep each product on its own reactant's side of the axis.
        let products = rule.products();
        let aligned = rule.reactants().first() == Some(&p1.species);
        let (sp_first, sp_second) = if aligned {
            (products[0].clone(), products[1].clone())
        } else {
            (products[1].clone(), products[0].clone())
        };
        let sp_first = self.model.apply_species_attributes(&sp_first);
        let sp_second = self.model.apply_species_attributes(&sp_second);
        let mol_first = self.model.molecule_info(&sp_first);
        let mol_second = self.model.molecule_info(&sp_second);
        let sigma_new = mol_first.radius + mol_second.radius;

        // Centre of mass at firing time.
        let mut com = SurfacePosition::new(p1.position, fid1);
        self.polygon.travel(&mut com, pair.ipv * frac1, 2);
        let u = self.uniform();
        let r_com = GreensFunction2DAbsSym::new(pair.d_com(), pair.a_com).draw_r(u, pair.dt);
        if r_com > 0.0 {
            let theta = self.uniform() * 2.0 * std::f64::consts::PI;
            let dir = self.face_direction(com.face, theta);
            self.polygon.travel(&mut com, dir * r_com, 2);
        }

        let n = self.polygon.triangle_at(com.face).normal();
        let mut base = pair.ipv - n * pair.ipv.dot(&n);
        if base.length() < 1e-300 {
            base = self.polygon.triangle_at(com.face).represent();
        }
        let base = base.normalize();
        let d_new = mol_first.d + mol_second.d;
        let fr_first = if d_new > 0.0 { mol_first.d / d_new } else { 0.5 };

        let shell = self.shells.get(pair.shell_id)?.clone();
        let mut separation = sigma_new * self.config.minimum_separation_factor;
        let mut placed = None;
        for _ in 0..self.config.split_retry_count {
            let span = sigma_new + separation;
            let mut pos_first = com;
            if self
                .polygon
                .travel(&mut pos_first, base * (-fr_first * span), 100)
                == 0
            {
                warn!("exchange placement: precision lost");
            }
            let mut pos_second = com;
            if self
                .polygon
                .travel(&mut pos_second, base * ((1.0 - fr_first) * span), 100)
                == 0
            {
                warn!("exchange placement: precision lost");
            }

            if self.polygon.distance(&pos_first, &pos_second) <= sigma_new {
                separation *= 2.0;
                continue;
            }

            let mut clear = true;
            for (pos, radius) in [
                (&pos_first, mol_first.radius),
                (&pos_second, mol_second.radius),
            ] {
                if !self.particle_inside_shell(&shell, pos, radius) {
                    let probe = Particle::new(p1.species.clone(), pos.position, radius, 0.0);
                    if !self.burst_and_shrink_overlaps(&probe, pos.face, did)? {
                        clear = false;
                        break;
                    }
                }
            }
            if clear {
                placed = Some((pos_first, pos_second));
            }
            break;
        }

        let (pos_first, pos_second) = match placed {
            Some(positions) => positions,
            None => {
                debug!("2->2 rejected: no space for the products; resolving as escape");
                let (a, b) = self.resolve_pair(pair, r_com, pair.a_ipv, pair.dt)?;
                self.shells.remove(pair.shell_id)?;
                for (pid, p, fid) in [a, b] {
                    self.create_closely_fitted_domain(pid, &p, fid)?;
                }
                return Ok(());
            }
        };

        let new_first = Particle::new(
            sp_first,
            pos_first.position,
            mol_first.radius,
            mol_first.d,
        );
        let new_second = Particle::new(
            sp_second,
            pos_second.position,
            mol_second.radius,
            mol_second.d,
        );
        self.world
            .update_particle(pid1, new_first.clone(), pos_first.face)?;
        self.world
            .update_particle(pid2, new_second.clone(), pos_second.face)?;
        self.last_reactions.push((
            rule.clone(),
            ReactionInfo::exchange(
                self.time,
                [(pid1, p1), (pid2, p2)],
                [(pid1, new_first.clone()), (pid2, new_second.clone())],
            ),
        ));
        self.shells.remove(pair.shell_id)?;
        self.create_closely_fitted_domain(pid1, &new_first, pos_first.face)?;
        self.create_closely_fitted_domain(pid2, &new_second, pos_second.face)?;
        debug!("2->2 succeeded: {}, {}", pid1, pid2);
        Ok(())
    }

    /// A monomolecular channel of one pair member fired first: propagate the
    /// pair to now, then run the single-reaction kernel on the drawn member
    /// while the pair shell still protects the volume.
    fn fire_pair_single_reaction(&mut self, pair: Pair, did: DomainID) -> Result<()> {
        let del_t = pair.dt;
        let u = self.uniform();
        let r_com = GreensFunction2DAbsSym::new(pair.d_com(), pair.a_com).draw_r(u, del_t);
        let u = self.uniform();
        let r_ipv = GreensFunction2DRadAbs::new(
            pair.d_tot(),
            pair.len_ipv,
            pair.sigma(),
            pair.a_ipv,
        )
        .draw_r(u, del_t);
        let (a, b) = self.resolve_pair(&pair, r_com, r_ipv, del_t)?;

        let k1 = self.monomolecular_rate(&pair.particles[0].species);
        let k2 = self.monomolecular_rate(&pair.particles[1].species);
        let pick_first = if k1 + k2 > 0.0 {
            self.uniform() < k1 / (k1 + k2)
        } else {
            true
        };
        let ((rpid, rp, rfid), other) = if pick_first { (a, b) } else { (b, a) };

        let shell = self.shells.get(pair.shell_id)?.clone();
        let results = self.attempt_reaction_single(&shell, did, rpid, rp, rfid)?;
        self.shells.remove(pair.shell_id)?;

        for (pid, p, fid) in results {
            self.create_closely_fitted_domain(pid, &p, fid)?;
        }
        let (opid, op, ofid) = other;
        self.create_closely_fitted_domain(opid, &op, ofid)?;
        Ok(())
    }
}
