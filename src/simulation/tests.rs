//! Scenario tests driving the whole kernel on a flat square surface.

use super::SgfrdSimulator;
use crate::common::geometry::Vector3;
use crate::domain::DomainKind;
use crate::ids::FaceID;
use crate::model::{Model, MoleculeInfo, ReactionRule, Species};
use crate::polygon::Polygon;

fn species(name: &str, radius: f64, d: f64, model: &mut Model) -> Species {
    let sp = Species::new(name);
    model.add_species_attribute(sp.clone(), MoleculeInfo { radius, d });
    sp
}

fn centroid(poly: &Polygon) -> Vector3 {
    poly.centroid_of(FaceID(0))
}

#[test]
fn test_free_single_escape() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    let start = centroid(&poly);

    let mut sim = SgfrdSimulator::new(poly, model, 42);
    let pid = sim.add_particle(a, start, FaceID(0)).unwrap();
    sim.initialize().unwrap();

    let mut fired = 0usize;
    let mut prev_t = 0.0;
    while let Some(t) = sim.scheduler.peek_time() {
        if t > 1.0 {
            break;
        }
        assert!(t >= prev_t, "event times must be non-decreasing");
        prev_t = t;
        sim.step().unwrap();
        fired += 1;
        assert!(fired < 100_000, "runaway event loop");
    }

    assert!(fired > 0, "at least one escape should have fired by t = 1");
    let (p, _) = sim.world().get_particle(pid).unwrap();
    assert!(
        p.position.distance_to(&start) > 0.0,
        "the particle should have moved"
    );
    // Still on the surface.
    assert!(p.position.z.abs() < 1e-9);
    assert!((-1e-9..=1.0 + 1e-9).contains(&p.position.x));
    assert!((-1e-9..=1.0 + 1e-9).contains(&p.position.y));
    assert!(sim.diagnosis());
}

#[test]
fn test_degradation() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    model.add_reaction_rule(ReactionRule::degradation(a.clone(), 10.0));

    let start = centroid(&poly);
    let mut sim = SgfrdSimulator::new(poly, model, 7);
    sim.add_particle(a, start, FaceID(0)).unwrap();
    sim.initialize().unwrap();
    sim.run(2.0).unwrap();

    assert_eq!(sim.num_particles(), 0, "the particle should have degraded");
    assert_eq!(sim.last_reactions().len(), 1);
    let (_, info) = &sim.last_reactions()[0];
    assert_eq!(info.reactants().len(), 1);
    assert!(info.products().is_empty());
    assert!(sim.diagnosis());
}

#[test]
fn test_split_one_to_two() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    let b = species("B", 0.004, 1.0, &mut model);
    let c = species("C", 0.004, 1.0, &mut model);
    // r_B + r_C > r_A: the products genuinely need new room.
    model.add_reaction_rule(ReactionRule::unbinding(a.clone(), (b.clone(), c.clone()), 1000.0));

    let start = centroid(&poly);
    let mut sim = SgfrdSimulator::new(poly, model, 11);
    sim.add_particle(a, start, FaceID(0)).unwrap();
    sim.initialize().unwrap();
    sim.run(0.05).unwrap();

    // On an empty surface the split must succeed.
    assert_eq!(sim.num_particles(), 2);
    let split = sim
        .last_reactions()
        .iter()
        .find(|(_, info)| info.products().len() == 2)
        .expect("an unbinding reaction should have been recorded");
    assert_eq!(split.1.reactants().len(), 1);
    assert!(sim.diagnosis());
}

#[test]
fn test_pair_formation() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);

    // Close enough that neither single can reach its minimum shell: the
    // second create_event must escalate to a pair, not a multi.
    let mut sim = SgfrdSimulator::new(poly, model, 3);
    sim.add_particle(a.clone(), Vector3::new(0.60, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a, Vector3::new(0.612, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();

    let kinds: Vec<DomainKind> = sim.scheduler.iter().map(|(_, _, d)| d.kind()).collect();
    assert!(
        kinds.contains(&DomainKind::Pair),
        "a pair domain should exist, found {kinds:?}"
    );
    assert!(
        !kinds.contains(&DomainKind::Multi),
        "no multi should have formed"
    );
    assert!(sim.diagnosis());
}

#[test]
fn test_three_sigma_separation_stays_single() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);

    // Three contact distances apart both particles can reach their minimum
    // shells, so the sizing rules keep them as independent singles.
    let mut sim = SgfrdSimulator::new(poly, model, 13);
    sim.add_particle(a.clone(), Vector3::new(0.60, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a, Vector3::new(0.63, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();
    // Let the transient tight domains rebuild at t = 0.
    sim.run(0.0).unwrap();

    let kinds: Vec<DomainKind> = sim.scheduler.iter().map(|(_, _, d)| d.kind()).collect();
    assert_eq!(kinds, vec![DomainKind::Single, DomainKind::Single]);
    assert!(sim.diagnosis());
}

#[test]
fn test_exchange_in_pair_stays_sound() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    let b = species("B", 0.005, 1.0, &mut model);
    let c = species("C", 0.005, 1.0, &mut model);
    let d = species("D", 0.005, 1.0, &mut model);
    model.add_reaction_rule(ReactionRule::new(vec![a.clone(), b.clone()], vec![c, d], 100.0));

    let mut sim = SgfrdSimulator::new(poly, model, 17);
    sim.add_particle(a, Vector3::new(0.60, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(b, Vector3::new(0.612, 0.20, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();
    sim.run(0.01).unwrap();

    // Whether or not the exchange fired, the particle count is conserved
    // and every recorded firing is a well-formed two-in-two-out event.
    assert_eq!(sim.num_particles(), 2);
    for (_, info) in sim.last_reactions() {
        assert_eq!(info.reactants().len(), 2);
        assert_eq!(info.products().len(), 2);
    }
    assert!(sim.diagnosis());
}

#[test]
fn test_exchange_in_multi() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    let b = species("B", 0.005, 1.0, &mut model);
    species("C", 0.005, 1.0, &mut model);
    species("D", 0.005, 1.0, &mut model);
    let e = species("E", 0.005, 1.0, &mut model);
    // Rate large enough that the contact-ring acceptance clamps to one.
    model.add_reaction_rule(ReactionRule::new(
        vec![a.clone(), b.clone()],
        vec![Species::new("C"), Species::new("D")],
        1e30,
    ));

    let mut sim = SgfrdSimulator::new(poly, model, 5);
    sim.add_particle(a, Vector3::new(0.600, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(b, Vector3::new(0.6105, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(e, Vector3::new(0.605, 0.2095, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();

    // The three coalesce into one multi; its first horizon must fire the
    // exchange between the touching reactants.
    sim.step().unwrap();

    let mut names: Vec<String> = sim
        .world()
        .list_particles()
        .iter()
        .map(|(_, p, _)| p.species.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["C", "D", "E"]);
    assert_eq!(sim.last_reactions().len(), 1);
    let (_, info) = &sim.last_reactions()[0];
    assert_eq!(info.reactants().len(), 2);
    assert_eq!(info.products().len(), 2);
    assert!(sim.diagnosis());
}

#[test]
fn test_multi_coalescence() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);

    // Three particles mutually close: pairwise distances ~1.1 sigma.
    let mut sim = SgfrdSimulator::new(poly, model, 5);
    sim.add_particle(a.clone(), Vector3::new(0.600, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a.clone(), Vector3::new(0.611, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a, Vector3::new(0.6055, 0.2095, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();

    let multis: Vec<_> = sim
        .scheduler
        .iter()
        .filter_map(|(_, _, d)| match d {
            crate::domain::Domain::Multi(m) => Some(m.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(multis.len(), 1, "all three should share one multi");
    assert_eq!(multis[0].particle_ids.len(), 3);
    assert_eq!(multis[0].shell_ids.len(), 3);
    assert!(sim.diagnosis());
}

#[test]
fn test_multi_advances_and_stays_sound() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);

    let mut sim = SgfrdSimulator::new(poly, model, 5);
    sim.add_particle(a.clone(), Vector3::new(0.600, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a.clone(), Vector3::new(0.611, 0.200, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a, Vector3::new(0.6055, 0.2095, 0.0), FaceID(0))
        .unwrap();
    sim.initialize().unwrap();

    for _ in 0..200 {
        if !sim.step().unwrap() {
            break;
        }
    }
    assert_eq!(sim.num_particles(), 3);
    assert!(sim.diagnosis());
}

#[test]
fn test_determinism_under_seed() {
    let run = || {
        let poly = Polygon::flat_unit_square(1.0);
        let mut model = Model::new();
        let a = species("A", 0.005, 1.0, &mut model);
        let start = centroid(&poly);
        let mut sim = SgfrdSimulator::new(poly, model, 1234);
        let pid = sim.add_particle(a, start, FaceID(0)).unwrap();
        sim.run_after_init(0.3);
        let (p, _) = sim.world().get_particle(pid).unwrap();
        p.position
    };
    let p1 = run();
    let p2 = run();
    assert_eq!(p1, p2, "same seed must give the same trajectory");
}

#[test]
fn test_birth_process_spawns() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);
    model.add_reaction_rule(ReactionRule::birth(a, 50.0));

    let mut sim = SgfrdSimulator::new(poly, model, 9);
    sim.initialize().unwrap();
    sim.run(0.5).unwrap();

    assert!(sim.num_particles() > 0, "births should have spawned particles");
    assert!(sim
        .last_reactions()
        .iter()
        .any(|(_, info)| info.reactants().is_empty()));
    assert!(sim.diagnosis());
}

#[test]
fn test_two_distant_particles_stay_single() {
    let poly = Polygon::flat_unit_square(1.0);
    let mut model = Model::new();
    let a = species("A", 0.005, 1.0, &mut model);

    let mut sim = SgfrdSimulator::new(poly, model, 21);
    sim.add_particle(a.clone(), Vector3::new(0.7, 0.1, 0.0), FaceID(0))
        .unwrap();
    sim.add_particle(a, Vector3::new(0.2, 0.7, 0.0), FaceID(1))
        .unwrap();
    sim.initialize().unwrap();

    let kinds: Vec<DomainKind> = sim.scheduler.iter().map(|(_, _, d)| d.kind()).collect();
    assert_eq!(kinds, vec![DomainKind::Single, DomainKind::Single]);
    assert!(sim.diagnosis());
}

impl SgfrdSimulator {
    /// Test helper: initialize and run, asserting soundness on the way.
    fn run_after_init(&mut self, t_end: f64) {
        self.initialize().unwrap();
        self.run(t_end).unwrap();
    }
}
