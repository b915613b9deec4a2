//! Protective shells: a disc on a face or a cone around a vertex.

use crate::common::geometry::Vector3;
use crate::ids::{DomainID, FaceID, VertexID};
use crate::polygon::{Polygon, SurfacePosition};

/// Disc of radius `size` on a face, centred at a surface point.
#[derive(Debug, Clone)]
pub struct CircularShell {
    pub size: f64,
    pub center: Vector3,
    pub face: FaceID,
    pub domain_id: DomainID,
}

/// Cone unfolded around a vertex: `size` is the slant distance from the
/// apex, `apex_angle` the cumulative angle of the vertex.
#[derive(Debug, Clone)]
pub struct ConicalShell {
    pub size: f64,
    pub apex: Vector3,
    pub vertex: VertexID,
    pub apex_angle: f64,
    pub domain_id: DomainID,
}

/// Tagged shell variant. Dispatch happens by `match` at every call site.
#[derive(Debug, Clone)]
pub enum Shell {
    Circular(CircularShell),
    Conical(ConicalShell),
}

impl Shell {
    pub fn circular(size: f64, center: Vector3, face: FaceID, domain_id: DomainID) -> Self {
        Shell::Circular(CircularShell {
            size,
            center,
            face,
            domain_id,
        })
    }

    pub fn conical(
        size: f64,
        apex: Vector3,
        vertex: VertexID,
        apex_angle: f64,
        domain_id: DomainID,
    ) -> Self {
        Shell::Conical(ConicalShell {
            size,
            apex,
            vertex,
            apex_angle,
            domain_id,
        })
    }

    pub fn size(&self) -> f64 {
        match self {
            Shell::Circular(sh) => sh.size,
            Shell::Conical(sh) => sh.size,
        }
    }

    pub fn domain_id(&self) -> DomainID {
        match self {
            Shell::Circular(sh) => sh.domain_id,
            Shell::Conical(sh) => sh.domain_id,
        }
    }

    pub fn set_domain_id(&mut self, did: DomainID) {
        match self {
            Shell::Circular(sh) => sh.domain_id = did,
            Shell::Conical(sh) => sh.domain_id = did,
        }
    }

    pub fn set_size(&mut self, size: f64) {
        match self {
            Shell::Circular(sh) => sh.size = size,
            Shell::Conical(sh) => sh.size = size,
        }
    }

    /// The shell centre anchored on the surface: the disc centre on its
    /// face, or the apex on one of its incident faces.
    pub fn reference_position(&self, polygon: &Polygon) -> SurfacePosition {
        match self {
            Shell::Circular(sh) => SurfacePosition::new(sh.center, sh.face),
            Shell::Conical(sh) => polygon.vertex_position(sh.vertex),
        }
    }

    /// Geodesic distance from `pos` to the shell surface (negative inside).
    pub fn distance_to(&self, polygon: &Polygon, pos: &SurfacePosition) -> f64 {
        polygon.distance(&self.reference_position(polygon), pos) - self.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EventID;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_dispatch() {
        let poly = Polygon::flat_unit_square(1.0);
        let shell = Shell::circular(
            0.1,
            Vector3::new(0.6, 0.2, 0.0),
            FaceID(0),
            EventID(0),
        );
        let pos = SurfacePosition::new(Vector3::new(0.9, 0.2, 0.0), FaceID(0));
        assert_relative_eq!(shell.distance_to(&poly, &pos), 0.2, epsilon = 1e-12);
        // Inside the shell the distance goes negative.
        let inside = SurfacePosition::new(Vector3::new(0.65, 0.2, 0.0), FaceID(0));
        assert!(shell.distance_to(&poly, &inside) < 0.0);
    }

    #[test]
    fn test_conical_reference_is_vertex() {
        let poly = Polygon::flat_unit_square(1.0);
        let apex = poly.vertex_at(VertexID(0));
        let shell = Shell::conical(0.2, apex, VertexID(0), poly.apex_angle(VertexID(0)), EventID(1));
        let refpos = shell.reference_position(&poly);
        assert_eq!(refpos.position, apex);
    }
}
