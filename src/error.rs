//! Error types for the simulation kernel.

use thiserror::Error;

use crate::ids::{EventID, ParticleID, ShellID};

/// Hard failures of the kernel. Soft outcomes (rejected placements, pair or
/// multi fallbacks) are encoded in return values, not here.
#[derive(Debug, Error)]
pub enum SgfrdError {
    #[error("particle {0} is not in the world")]
    MissingParticle(ParticleID),

    #[error("shell {0} is not in the container")]
    MissingShell(ShellID),

    #[error("event {0} is not in the scheduler")]
    MissingEvent(EventID),

    #[error("reaction rules with {products} products are not supported")]
    UnsupportedRule { products: usize },

    #[error("domain fired with an unspecified event kind")]
    UnknownEventKind,

    #[error("a pair domain cannot be absorbed into a multi")]
    PairInMulti,

    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, SgfrdError>;
