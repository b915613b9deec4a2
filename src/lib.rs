//! sgfrd_core - event-driven reaction-diffusion on triangulated surfaces.
//!
//! Particles diffuse on the faces of a polygonal surface. Each particle (or
//! small group) is wrapped in a protective shell and advanced analytically
//! with Green's functions; shells tile the surface without overlap, and a
//! scheduler fires the resulting first-passage events in time order. Crowded
//! neighbourhoods fall back to Brownian-dynamics "multi" domains.

pub mod common;
pub mod config;
pub mod domain;
pub mod error;
pub mod gf;
pub mod ids;
pub mod model;
pub mod polygon;
pub mod reaction;
pub mod scheduler;
pub mod shell;
pub mod shell_container;
pub mod simulation;
pub mod world;

pub use common::geometry::Vector3;
pub use config::SgfrdConfig;
pub use error::SgfrdError;
pub use ids::{DomainID, EventID, FaceID, ParticleID, ShellID, VertexID};
pub use model::{Model, MoleculeInfo, ReactionRule, Species};
pub use polygon::{Polygon, SurfacePosition};
pub use reaction::ReactionInfo;
pub use simulation::SgfrdSimulator;
pub use world::{Particle, World};
