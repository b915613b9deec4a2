//! Registry of live shells with a per-structure secondary index.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SgfrdError};
use crate::ids::{FaceID, ShellID, VertexID};
use crate::polygon::{Polygon, SurfacePosition};
use crate::shell::Shell;

/// Stores shells keyed by id, indexed by the face (circular) or vertex
/// (conical) they sit on. Queries are linear over the registry; correctness
/// of the distance ordering is what matters at these populations.
#[derive(Debug, Default)]
pub struct ShellContainer {
    shells: BTreeMap<ShellID, Shell>,
    by_face: HashMap<FaceID, Vec<ShellID>>,
    by_vertex: HashMap<VertexID, Vec<ShellID>>,
}

impl ShellContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    fn index_of(&mut self, shell: &Shell) -> &mut Vec<ShellID> {
        match shell {
            Shell::Circular(sh) => self.by_face.entry(sh.face).or_default(),
            Shell::Conical(sh) => self.by_vertex.entry(sh.vertex).or_default(),
        }
    }

    fn unindex(&mut self, sid: ShellID, shell: &Shell) {
        let bucket = match shell {
            Shell::Circular(sh) => self.by_face.get_mut(&sh.face),
            Shell::Conical(sh) => self.by_vertex.get_mut(&sh.vertex),
        };
        if let Some(bucket) = bucket {
            bucket.retain(|&s| s != sid);
        }
    }

    pub fn add(&mut self, sid: ShellID, shell: Shell) -> Result<()> {
        if self.shells.contains_key(&sid) {
            return Err(SgfrdError::Inconsistent(format!(
                "shell {sid} added twice"
            )));
        }
        self.index_of(&shell).push(sid);
        self.shells.insert(sid, shell);
        Ok(())
    }

    /// Replace a stored shell, moving it between index buckets if needed.
    pub fn update(&mut self, sid: ShellID, shell: Shell) -> Result<()> {
        let old = self
            .shells
            .remove(&sid)
            .ok_or(SgfrdError::MissingShell(sid))?;
        self.unindex(sid, &old);
        self.index_of(&shell).push(sid);
        self.shells.insert(sid, shell);
        Ok(())
    }

    pub fn remove(&mut self, sid: ShellID) -> Result<Shell> {
        let shell = self
            .shells
            .remove(&sid)
            .ok_or(SgfrdError::MissingShell(sid))?;
        self.unindex(sid, &shell);
        Ok(shell)
    }

    pub fn get(&self, sid: ShellID) -> Result<&Shell> {
        self.shells.get(&sid).ok_or(SgfrdError::MissingShell(sid))
    }

    pub fn get_mut(&mut self, sid: ShellID) -> Result<&mut Shell> {
        self.shells
            .get_mut(&sid)
            .ok_or(SgfrdError::MissingShell(sid))
    }

    pub fn list_shells(&self) -> impl Iterator<Item = (ShellID, &Shell)> {
        self.shells.iter().map(|(sid, sh)| (*sid, sh))
    }

    /// Shells whose surface lies within `radius` of `pos`, as
    /// `(id, distance-to-surface)` sorted ascending. Ties break by id.
    pub fn list_shells_within_radius(
        &self,
        polygon: &Polygon,
        pos: &SurfacePosition,
        radius: f64,
    ) -> Vec<(ShellID, f64)> {
        let mut found: Vec<(ShellID, f64)> = self
            .shells
            .iter()
            .filter_map(|(sid, sh)| {
                let d = sh.distance_to(polygon, pos);
                (d <= radius).then_some((*sid, d))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geometry::Vector3;
    use crate::ids::EventID;

    fn square() -> Polygon {
        Polygon::flat_unit_square(1.0)
    }

    fn circular(x: f64, y: f64, size: f64, did: u64) -> Shell {
        Shell::circular(size, Vector3::new(x, y, 0.0), FaceID(0), EventID(did))
    }

    #[test]
    fn test_add_remove_roundtrip() {
        let mut c = ShellContainer::new();
        c.add(ShellID(0), circular(0.5, 0.2, 0.1, 0)).unwrap();
        assert_eq!(c.len(), 1);
        assert!(c.add(ShellID(0), circular(0.5, 0.2, 0.1, 0)).is_err());
        c.remove(ShellID(0)).unwrap();
        assert!(c.is_empty());
        assert!(c.remove(ShellID(0)).is_err());
    }

    #[test]
    fn test_within_radius_sorted() {
        let poly = square();
        let mut c = ShellContainer::new();
        c.add(ShellID(0), circular(0.9, 0.05, 0.04, 0)).unwrap();
        c.add(ShellID(1), circular(0.7, 0.1, 0.05, 1)).unwrap();
        c.add(ShellID(2), circular(0.3, 0.05, 0.05, 2)).unwrap();

        let pos = SurfacePosition::new(Vector3::new(0.6, 0.1, 0.0), FaceID(0));
        let hits = c.list_shells_within_radius(&poly, &pos, 0.26);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, ShellID(1));
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn test_update_moves_index_bucket() {
        let poly = square();
        let mut c = ShellContainer::new();
        c.add(ShellID(0), circular(0.6, 0.1, 0.05, 0)).unwrap();
        // Move the shell to the other face.
        let moved = Shell::circular(0.05, Vector3::new(0.2, 0.6, 0.0), FaceID(1), EventID(0));
        c.update(ShellID(0), moved).unwrap();

        let pos = SurfacePosition::new(Vector3::new(0.2, 0.7, 0.0), FaceID(1));
        let hits = c.list_shells_within_radius(&poly, &pos, 0.2);
        assert_eq!(hits.len(), 1);
    }
}
