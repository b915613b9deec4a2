//! The event-driven simulator: state, the step loop, and domain creation.

mod burst;
mod diagnosis;
mod forming;
mod multi;
mod pair;
mod single;

use log::{debug, warn};
use rand_pcg::Pcg64;

use crate::common::geometry::{rotate, Vector3};
use crate::common::rng::{create_rng, exponential_time, uniform_real};
use crate::config::SgfrdConfig;
use crate::domain::{Birth, Domain, Single, SingleEventKind};
use crate::error::{Result, SgfrdError};
use crate::gf::{GreensFunction2DAbsSym, GreensFunction2DRefWedgeAbs};
use crate::ids::{DomainID, FaceID, ParticleID, SerialGen, ShellID, VertexID};
use crate::model::{Model, ReactionRule, Species};
use crate::polygon::{Polygon, SurfacePosition};
use crate::reaction::ReactionInfo;
use crate::scheduler::Scheduler;
use crate::shell::Shell;
use crate::shell_container::ShellContainer;
use crate::world::{Particle, World};

/// Outcome of shell forming: either a registered domain, or the intruder
/// list for the caller to escalate into a pair or multi.
pub(crate) type Formed = std::result::Result<DomainID, Vec<(DomainID, f64)>>;

/// Placeholder written into shells that are re-owned before their final
/// domain id exists; always rewritten before the forming call returns.
pub(crate) const UNOWNED: DomainID = crate::ids::EventID(u64::MAX);

/// Event-driven reaction-diffusion simulator on a triangulated surface.
pub struct SgfrdSimulator {
    pub(crate) polygon: Polygon,
    pub(crate) model: Model,
    pub(crate) world: World,
    pub(crate) shells: ShellContainer,
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: Pcg64,
    pub(crate) config: SgfrdConfig,
    pub(crate) shell_idgen: SerialGen,
    pub(crate) time: f64,
    pub(crate) last_reactions: Vec<(ReactionRule, ReactionInfo)>,
}

impl SgfrdSimulator {
    pub fn new(polygon: Polygon, model: Model, seed: u64) -> Self {
        Self::with_config(polygon, model, seed, SgfrdConfig::default())
    }

    pub fn with_config(polygon: Polygon, model: Model, seed: u64, config: SgfrdConfig) -> Self {
        Self {
            polygon,
            model,
            world: World::new(),
            shells: ShellContainer::new(),
            scheduler: Scheduler::new(),
            rng: create_rng(seed),
            config,
            shell_idgen: SerialGen::new(),
            time: 0.0,
            last_reactions: Vec::new(),
        }
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Reactions fired so far, in firing order.
    pub fn last_reactions(&self) -> &[(ReactionRule, ReactionInfo)] {
        &self.last_reactions
    }

    pub fn num_domains(&self) -> usize {
        self.scheduler.len()
    }

    pub fn num_particles(&self) -> usize {
        self.world.num_particles()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Place a particle of `species` before the run starts, resolving radius
    /// and D through the model.
    pub fn add_particle(
        &mut self,
        species: Species,
        position: Vector3,
        fid: FaceID,
    ) -> Option<ParticleID> {
        let info = self.model.molecule_info(&species);
        let p = Particle::new(species, position, info.radius, info.d);
        self.world.create_particle(&self.polygon, p, fid)
    }

    /// Build a domain for every particle and schedule birth processes.
    pub fn initialize(&mut self) -> Result<()> {
        for (pid, p, fid) in self.world.list_particles() {
            self.create_event(pid, &p, fid)?;
        }
        for rule in self
            .model
            .zeroth_order_rules()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>()
        {
            let dt = exponential_time(&mut self.rng, rule.rate());
            self.scheduler
                .add(Domain::Birth(Birth { rule }), self.time + dt);
        }
        Ok(())
    }

    /// Fire the next event. `Ok(false)` when the queue is exhausted.
    pub fn step(&mut self) -> Result<bool> {
        let (eid, domain, t_fire) = match self.scheduler.pop_next() {
            Some(next) => next,
            None => return Ok(false),
        };
        debug_assert!(t_fire >= self.time, "event time went backwards");
        self.time = t_fire;
        debug!("firing {} at t = {}", eid, t_fire);

        match domain {
            Domain::Single(dom) => self.fire_single(dom, eid)?,
            Domain::Pair(dom) => self.fire_pair(dom, eid)?,
            Domain::Multi(dom) => self.fire_multi(dom, eid)?,
            Domain::Birth(dom) => self.fire_birth(dom, eid)?,
        }
        Ok(true)
    }

    /// Run until the next event would fire past `t_end`.
    pub fn run(&mut self, t_end: f64) -> Result<()> {
        loop {
            match self.scheduler.peek_time() {
                Some(t) if t <= t_end => {
                    self.step()?;
                }
                _ => break,
            }
        }
        self.time = t_end;
        Ok(())
    }

    // ------------------------------------------------------------------
    // shared helpers

    pub(crate) fn uniform(&mut self) -> f64 {
        uniform_real(&mut self.rng)
    }

    pub(crate) fn min_circular_shell_radius(&self, p: &Particle) -> f64 {
        p.radius * self.config.single_circular_shell_factor
    }

    /// Unit direction in the face plane at angle `theta` from the
    /// representative edge.
    pub(crate) fn face_direction(&self, fid: FaceID, theta: f64) -> Vector3 {
        let tri = self.polygon.triangle_at(fid);
        rotate(theta, &tri.normal(), &tri.represent()).normalize()
    }

    /// Summed monomolecular rate for a species.
    pub(crate) fn monomolecular_rate(&self, species: &Species) -> f64 {
        self.model
            .query_reaction_rules(species)
            .iter()
            .map(|r| r.rate())
            .sum()
    }

    /// Pick a rule weighted by rate.
    pub(crate) fn determine_reaction_rule(
        &mut self,
        rules: &[ReactionRule],
    ) -> Option<ReactionRule> {
        let total: f64 = rules.iter().map(|r| r.rate()).sum();
        if total <= 0.0 {
            return None;
        }
        let mut x = self.uniform() * total;
        for rule in rules {
            x -= rule.rate();
            if x <= 0.0 {
                return Some(rule.clone());
            }
        }
        rules.last().cloned()
    }

    /// Does a particle of `radius` at `pos` fit inside the shell?
    pub(crate) fn particle_inside_shell(
        &self,
        shell: &Shell,
        pos: &SurfacePosition,
        radius: f64,
    ) -> bool {
        shell.distance_to(&self.polygon, pos) + radius <= self.config.tolerance
    }

    /// Domains whose shells come within `radius` of `pos`, deduplicated and
    /// sorted by distance to the nearest of their shells.
    pub(crate) fn get_intrusive_domains(
        &self,
        pos: &SurfacePosition,
        radius: f64,
    ) -> Vec<(DomainID, f64)> {
        self.get_intrusive_domains_excluding(pos, radius, &[])
    }

    pub(crate) fn get_intrusive_domains_excluding(
        &self,
        pos: &SurfacePosition,
        radius: f64,
        skip_shells: &[ShellID],
    ) -> Vec<(DomainID, f64)> {
        let mut out: Vec<(DomainID, f64)> = Vec::new();
        for (sid, d) in self
            .shells
            .list_shells_within_radius(&self.polygon, pos, radius)
        {
            if skip_shells.contains(&sid) {
                continue;
            }
            let did = match self.shells.get(sid) {
                Ok(sh) => sh.domain_id(),
                Err(_) => continue,
            };
            if did == UNOWNED {
                continue;
            }
            if !out.iter().any(|(d0, _)| *d0 == did) {
                out.push((did, d));
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // domain construction

    /// Draw what a freshly shelled single will do and when.
    fn draw_single_circular_schedule(
        &mut self,
        p: &Particle,
        shell_size: f64,
    ) -> (SingleEventKind, f64) {
        let a = shell_size - p.radius;
        let gf = GreensFunction2DAbsSym::new(p.d, a);
        let u = self.uniform();
        let t_escape = gf.draw_time(u);
        let k_tot = self.monomolecular_rate(&p.species);
        let t_react = exponential_time(&mut self.rng, k_tot);
        if t_react < t_escape {
            (SingleEventKind::Reaction, t_react)
        } else {
            (SingleEventKind::Escape, t_escape)
        }
    }

    /// Register a circular shell and its single domain.
    pub(crate) fn create_single_circular_domain(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
        size: f64,
    ) -> Result<DomainID> {
        let sid = self.shell_idgen.shell_id();
        let (kind, dt) = self.draw_single_circular_schedule(p, size);
        let domain = Single {
            kind,
            begin_time: self.time,
            dt,
            particle_id: pid,
            particle: p.clone(),
            shell_id: sid,
        };
        let did = self.scheduler.add(Domain::Single(domain), self.time + dt);
        self.shells
            .add(sid, Shell::circular(size, p.position, fid, did))?;
        debug!("single circular {} (shell {}, size {})", did, sid, size);
        Ok(did)
    }

    /// Register a conical shell around `vid` and its single domain.
    pub(crate) fn create_single_conical_domain(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        vid: VertexID,
        size: f64,
    ) -> Result<DomainID> {
        let apex = self.polygon.vertex_at(vid);
        let apex_angle = self.polygon.apex_angle(vid);
        let r0 = p.position.distance_to(&apex);
        let a = size - p.radius;
        let gf = GreensFunction2DRefWedgeAbs::new(p.d, r0, a, apex_angle);
        let u = self.uniform();
        let t_escape = gf.draw_time(u);
        let k_tot = self.monomolecular_rate(&p.species);
        let t_react = exponential_time(&mut self.rng, k_tot);
        let (kind, dt) = if t_react < t_escape {
            (SingleEventKind::Reaction, t_react)
        } else {
            (SingleEventKind::Escape, t_escape)
        };

        let sid = self.shell_idgen.shell_id();
        let domain = Single {
            kind,
            begin_time: self.time,
            dt,
            particle_id: pid,
            particle: p.clone(),
            shell_id: sid,
        };
        let did = self.scheduler.add(Domain::Single(domain), self.time + dt);
        self.shells
            .add(sid, Shell::conical(size, apex, vid, apex_angle, did))?;
        debug!("single conical {} (shell {}, size {})", did, sid, size);
        Ok(did)
    }

    /// Transient domain with a shell fitted to the particle itself; fires
    /// immediately so that `create_event` can rebuild it in turn.
    pub(crate) fn create_closely_fitted_domain(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
    ) -> Result<DomainID> {
        let sid = self.shell_idgen.shell_id();
        let domain = Single {
            kind: SingleEventKind::Escape,
            begin_time: self.time,
            dt: 0.0,
            particle_id: pid,
            particle: p.clone(),
            shell_id: sid,
        };
        let did = self.scheduler.add(Domain::Single(domain), self.time);
        self.shells
            .add(sid, Shell::circular(p.radius, p.position, fid, did))?;
        Ok(did)
    }

    /// Build the appropriate domain for a particle that has none: single
    /// circular, single conical, pair, or multi.
    pub(crate) fn create_event(
        &mut self,
        pid: ParticleID,
        p: &Particle,
        fid: FaceID,
    ) -> Result<DomainID> {
        let pos = p.surface_position(fid);
        let min_circle = self.min_circular_shell_radius(p);
        let max_circle = self.polygon.max_circle_size(&pos);

        if max_circle < min_circle {
            match self.form_single_conical_event(pid, p, fid)? {
                Ok(did) => Ok(did),
                Err(intruders) => self.form_multi(pid, p, fid, intruders),
            }
        } else {
            match self.form_single_circular_event(pid, p, fid, max_circle)? {
                Ok(did) => Ok(did),
                Err(intruders) => {
                    if let Some(did) = self.form_pair(pid, p, fid, &intruders)? {
                        return Ok(did);
                    }
                    self.form_multi(pid, p, fid, intruders)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // birth processes

    fn fire_birth(&mut self, birth: Birth, _did: DomainID) -> Result<()> {
        let rule = birth.rule.clone();
        let species = match rule.products().first() {
            Some(sp) => sp.clone(),
            None => {
                return Err(SgfrdError::Inconsistent(
                    "birth rule without product".into(),
                ))
            }
        };
        let info = self.model.molecule_info(&species);

        let mut spawned = None;
        for _ in 0..50 {
            let (position, fid) = self.sample_surface_point();
            let pos = SurfacePosition::new(position, fid);
            // Stay clear of live shells as well as particles.
            if !self
                .shells
                .list_shells_within_radius(&self.polygon, &pos, info.radius)
                .is_empty()
            {
                continue;
            }
            let p = Particle::new(species.clone(), position, info.radius, info.d);
            if let Some(pid) = self.world.create_particle(&self.polygon, p.clone(), fid) {
                spawned = Some((pid, p, fid));
                break;
            }
        }

        match spawned {
            Some((pid, p, fid)) => {
                self.last_reactions.push((
                    rule.clone(),
                    ReactionInfo::birth(self.time, (pid, p.clone())),
                ));
                self.create_event(pid, &p, fid)?;
            }
            None => warn!("no room for a birth at t = {}; postponed", self.time),
        }

        // Reschedule the channel either way.
        let dt = exponential_time(&mut self.rng, rule.rate());
        self.scheduler
            .add(Domain::Birth(Birth { rule }), self.time + dt);
        Ok(())
    }

    /// Uniform point on the surface, area-weighted over faces.
    fn sample_surface_point(&mut self) -> (Vector3, FaceID) {
        let total: f64 = self.polygon.face_ids().map(|f| self.polygon.area_of(f)).sum();
        let mut x = self.uniform() * total;
        let mut chosen = FaceID(0);
        for fid in self.polygon.face_ids() {
            x -= self.polygon.area_of(fid);
            chosen = fid;
            if x <= 0.0 {
                break;
            }
        }
        let (mut u, mut v) = (self.uniform(), self.uniform());
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        let tri = self.polygon.triangle_at(chosen);
        let p = tri.vertex(0)
            + (tri.vertex(1) - tri.vertex(0)) * u
            + (tri.vertex(2) - tri.vertex(0)) * v;
        (p, chosen)
    }
}

#[cfg(test)]
mod tests;
