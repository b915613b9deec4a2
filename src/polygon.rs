//! Triangulated surface: face/vertex tables, walking along the surface,
//! rolling around vertices, and geodesic distances.
//!
//! Faces are counter-clockwise triangles over shared vertices. The mesh may
//! have a boundary; edges without a neighbour are not traversable and bound
//! both travel and shell sizes.

use std::collections::BinaryHeap;

use log::warn;

use crate::common::geometry::{angle, rotate, Vector3};
use crate::ids::{FaceID, VertexID};

/// A point constrained to lie on a specific face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePosition {
    pub position: Vector3,
    pub face: FaceID,
}

impl SurfacePosition {
    pub fn new(position: Vector3, face: FaceID) -> Self {
        Self { position, face }
    }
}

/// One triangle of the mesh, with its derived quantities cached.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [Vector3; 3],
    normal: Vector3,
}

impl Triangle {
    fn new(vertices: [Vector3; 3]) -> Self {
        let normal = (vertices[1] - vertices[0])
            .cross(&(vertices[2] - vertices[0]))
            .normalize();
        Self { vertices, normal }
    }

    pub fn vertex(&self, i: usize) -> Vector3 {
        self.vertices[i]
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    /// Representative in-plane direction (the first edge).
    pub fn represent(&self) -> Vector3 {
        self.vertices[1] - self.vertices[0]
    }

    fn project(&self, p: &Vector3) -> Vector3 {
        let n = self.normal;
        *p - n * (*p - self.vertices[0]).dot(&n)
    }
}

#[derive(Debug, Clone)]
struct FanEntry {
    face: usize,
    /// Local index of the apex vertex within `face`.
    vlocal: usize,
    /// Cumulative angle at which this face begins around the apex.
    begin: f64,
    /// Interior angle of this face at the apex.
    width: f64,
}

#[derive(Debug, Clone)]
struct VertexFan {
    entries: Vec<FanEntry>,
    /// Interior vertex (the fan wraps) or boundary vertex (it does not).
    closed: bool,
    apex_angle: f64,
}

/// Triangulated 2-manifold with boundary.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Vector3>,
    faces: Vec<[usize; 3]>,
    triangles: Vec<Triangle>,
    /// Per face, per edge `j` (from `v[j]` to `v[j+1]`): the face on the
    /// other side and the edge index there, if any.
    neighbors: Vec<[Option<(usize, usize)>; 3]>,
    fans: Vec<VertexFan>,
    /// Mesh edges as sorted vertex index pairs, for the fallback search.
    edges: Vec<(usize, usize)>,
    tol: f64,
}

impl Polygon {
    pub fn new(vertices: Vec<Vector3>, faces: Vec<[usize; 3]>) -> Self {
        let triangles: Vec<Triangle> = faces
            .iter()
            .map(|f| Triangle::new([vertices[f[0]], vertices[f[1]], vertices[f[2]]]))
            .collect();

        // Edge adjacency. A manifold edge is shared by at most two faces.
        let mut edge_map: std::collections::HashMap<(usize, usize), Vec<(usize, usize)>> =
            std::collections::HashMap::new();
        for (fi, f) in faces.iter().enumerate() {
            for j in 0..3 {
                let a = f[j];
                let b = f[(j + 1) % 3];
                let key = (a.min(b), a.max(b));
                edge_map.entry(key).or_default().push((fi, j));
            }
        }
        let mut neighbors = vec![[None; 3]; faces.len()];
        for users in edge_map.values() {
            assert!(users.len() <= 2, "non-manifold edge");
            if let [(f0, e0), (f1, e1)] = users[..] {
                neighbors[f0][e0] = Some((f1, e1));
                neighbors[f1][e1] = Some((f0, e0));
            }
        }
        let edges: Vec<(usize, usize)> = edge_map.keys().copied().collect();

        let scale = vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0f64, f64::max)
            .max(1.0);
        let tol = scale * 1e-10;

        let fans = Self::build_fans(&vertices, &faces, &neighbors);

        Self {
            vertices,
            faces,
            triangles,
            neighbors,
            fans,
            edges,
            tol,
        }
    }

    /// Two-triangle flat square of side `l` in the z = 0 plane.
    pub fn flat_unit_square(l: f64) -> Self {
        let vertices = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(l, 0.0, 0.0),
            Vector3::new(l, l, 0.0),
            Vector3::new(0.0, l, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        Self::new(vertices, faces)
    }

    fn build_fans(
        vertices: &[Vector3],
        faces: &[[usize; 3]],
        neighbors: &[[Option<(usize, usize)>; 3]],
    ) -> Vec<VertexFan> {
        let face_angle = |fi: usize, vlocal: usize| -> f64 {
            let f = &faces[fi];
            let v = vertices[f[vlocal]];
            let a = vertices[f[(vlocal + 1) % 3]] - v;
            let b = vertices[f[(vlocal + 2) % 3]] - v;
            angle(&a, &b)
        };

        let mut fans = Vec::with_capacity(vertices.len());
        for vi in 0..vertices.len() {
            let incident: Vec<(usize, usize)> = faces
                .iter()
                .enumerate()
                .filter_map(|(fi, f)| f.iter().position(|&x| x == vi).map(|l| (fi, l)))
                .collect();
            if incident.is_empty() {
                fans.push(VertexFan {
                    entries: Vec::new(),
                    closed: false,
                    apex_angle: 0.0,
                });
                continue;
            }

            // Walking counter-clockwise around the vertex leaves each face
            // across the edge ending at the vertex (local edge vlocal + 2).
            // The reverse neighbour is across the edge starting at it.
            let start = incident
                .iter()
                .find(|&&(fi, l)| neighbors[fi][l].is_none())
                .copied()
                .unwrap_or(incident[0]);
            let closed = incident.iter().all(|&(fi, l)| neighbors[fi][l].is_some());

            let mut entries = Vec::with_capacity(incident.len());
            let mut cursor = start;
            let mut begin = 0.0;
            loop {
                let (fi, l) = cursor;
                let width = face_angle(fi, l);
                entries.push(FanEntry {
                    face: fi,
                    vlocal: l,
                    begin,
                    width,
                });
                begin += width;
                match neighbors[fi][(l + 2) % 3] {
                    Some((nf, _)) if !(closed && nf == start.0) => {
                        let nl = faces[nf].iter().position(|&x| x == vi).expect("fan face");
                        if entries.iter().any(|e| e.face == nf) {
                            break;
                        }
                        cursor = (nf, nl);
                    }
                    _ => break,
                }
            }
            fans.push(VertexFan {
                entries,
                closed,
                apex_angle: begin,
            });
        }
        fans
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceID> + '_ {
        (0..self.faces.len() as u64).map(FaceID)
    }

    pub fn triangle_at(&self, fid: FaceID) -> &Triangle {
        &self.triangles[fid.0 as usize]
    }

    pub fn vertex_at(&self, vid: VertexID) -> Vector3 {
        self.vertices[vid.0 as usize]
    }

    /// Cumulative interior angle around a vertex. Exceeds 2 pi on saddles.
    pub fn apex_angle(&self, vid: VertexID) -> f64 {
        self.fans[vid.0 as usize].apex_angle
    }

    pub fn vertices_of(&self, fid: FaceID) -> [VertexID; 3] {
        let f = self.faces[fid.0 as usize];
        [
            VertexID(f[0] as u64),
            VertexID(f[1] as u64),
            VertexID(f[2] as u64),
        ]
    }

    /// Centroid of a face, for seeding particles.
    pub fn centroid_of(&self, fid: FaceID) -> Vector3 {
        let t = self.triangle_at(fid);
        (t.vertex(0) + t.vertex(1) + t.vertex(2)) * (1.0 / 3.0)
    }

    fn dihedral(&self, from: usize, to: usize, axis: &Vector3) -> f64 {
        let na = self.triangles[from].normal();
        let nb = self.triangles[to].normal();
        let ax = axis.normalize();
        (na.cross(&nb).dot(&ax)).atan2(na.dot(&nb))
    }

    /// Walk `disp` along the surface starting from `state`, crossing up to
    /// `max_hops` edges. Returns the remaining hop budget; zero signals that
    /// the budget was exhausted before the displacement was consumed.
    pub fn travel(&self, state: &mut SurfacePosition, disp: Vector3, max_hops: usize) -> usize {
        let mut hops = max_hops;
        let mut fi = state.face.0 as usize;
        let n0 = self.triangles[fi].normal();
        let mut disp = disp - n0 * disp.dot(&n0);
        let mut p = self.triangles[fi].project(&state.position);

        loop {
            let tri = &self.triangles[fi];
            let n = tri.normal();

            // First exit through any edge along the displacement.
            let mut t_min = f64::INFINITY;
            let mut j_cross = usize::MAX;
            for j in 0..3 {
                let a = tri.vertex(j);
                let b = tri.vertex((j + 1) % 3);
                let outward = (b - a).cross(&n);
                let denom = disp.dot(&outward);
                if denom <= self.tol {
                    continue;
                }
                let t = (a - p).dot(&outward) / denom;
                if t < t_min {
                    t_min = t;
                    j_cross = j;
                }
            }

            if t_min >= 1.0 - 1e-12 || j_cross == usize::MAX {
                state.position = tri.project(&(p + disp));
                state.face = FaceID(fi as u64);
                return hops;
            }

            let t = t_min.max(0.0);
            p = p + disp * t;
            disp = disp * (1.0 - t);

            match self.neighbors[fi][j_cross] {
                None => {
                    // Boundary edge: the displacement cannot continue.
                    warn!("travel hit a boundary edge; clamping to the edge");
                    state.position = tri.project(&p);
                    state.face = FaceID(fi as u64);
                    return hops;
                }
                Some((nf, _)) => {
                    if hops == 0 {
                        // Budget exhausted at a crossing; clamp here.
                        state.position = tri.project(&p);
                        state.face = FaceID(fi as u64);
                        return 0;
                    }
                    let a = tri.vertex(j_cross);
                    let b = tri.vertex((j_cross + 1) % 3);
                    let axis = b - a;
                    let delta = self.dihedral(fi, nf, &axis);
                    disp = rotate(delta, &axis, &disp);
                    fi = nf;
                    hops -= 1;
                }
            }
        }
    }

    /// Angular coordinate of a surface point around a vertex, in the fan
    /// parameterization. `None` when the point's face is not incident.
    fn fan_coordinate(&self, vid: VertexID, pos: &SurfacePosition) -> Option<(f64, f64)> {
        let fan = &self.fans[vid.0 as usize];
        let apex = self.vertex_at(vid);
        let fi = pos.face.0 as usize;
        let entry = fan.entries.iter().find(|e| e.face == fi)?;

        let f = self.faces[fi];
        let enter = self.vertices[f[(entry.vlocal + 1) % 3]] - apex;
        let radial = pos.position - apex;
        let local = angle(&enter, &radial);
        Some((entry.begin + local, radial.length()))
    }

    /// Move to slant distance `r` from the vertex, then rotate by `theta`
    /// around the fan. Interior vertices wrap; boundary fans reflect.
    pub fn roll(
        &self,
        pos: &SurfacePosition,
        vid: VertexID,
        r: f64,
        theta: f64,
    ) -> SurfacePosition {
        let fan = &self.fans[vid.0 as usize];
        let apex = self.vertex_at(vid);
        let phi = fan.apex_angle;

        let (theta0, _) = match self.fan_coordinate(vid, pos) {
            Some(c) => c,
            None => {
                warn!("roll from a face outside the vertex fan; position kept");
                return *pos;
            }
        };

        let mut target = theta0 + theta;
        if fan.closed {
            target = target.rem_euclid(phi);
        } else {
            // Reflect into [0, phi].
            let period = 2.0 * phi;
            target = target.rem_euclid(period);
            if target > phi {
                target = period - target;
            }
        }

        let entry = fan
            .entries
            .iter()
            .rev()
            .find(|e| e.begin <= target + 1e-12)
            .unwrap_or(&fan.entries[0]);
        let local = (target - entry.begin).clamp(0.0, entry.width);

        let f = self.faces[entry.face];
        let n = self.triangles[entry.face].normal();
        let enter = (self.vertices[f[(entry.vlocal + 1) % 3]] - apex).normalize();
        let dir = rotate(local, &n, &enter);

        SurfacePosition::new(apex + dir * r, FaceID(entry.face as u64))
    }

    /// Unfold `pos` (on the far side of the edge shared between `from` and
    /// `to`) into `from`'s plane.
    fn unfold_across(&self, from: usize, to: usize, edge: usize, p: &Vector3) -> Vector3 {
        let f = self.faces[from];
        let a = self.vertices[f[edge]];
        let b = self.vertices[f[(edge + 1) % 3]];
        let axis = b - a;
        let delta = self.dihedral(to, from, &axis);
        a + rotate(delta, &axis, &(*p - a))
    }

    /// Geodesic distance going around shared vertex `v`.
    fn distance_via_vertex(&self, v: VertexID, a: &SurfacePosition, b: &SurfacePosition) -> f64 {
        let (ta, da) = match self.fan_coordinate(v, a) {
            Some(c) => c,
            None => return f64::INFINITY,
        };
        let (tb, db) = match self.fan_coordinate(v, b) {
            Some(c) => c,
            None => return f64::INFINITY,
        };
        let fan = &self.fans[v.0 as usize];
        let mut psi = (ta - tb).abs();
        if fan.closed {
            psi = psi.min(fan.apex_angle - psi);
        }
        if psi >= std::f64::consts::PI {
            da + db
        } else {
            (da * da + db * db - 2.0 * da * db * psi.cos()).sqrt()
        }
    }

    /// Geodesic distance along the surface.
    pub fn distance(&self, a: &SurfacePosition, b: &SurfacePosition) -> f64 {
        let fa = a.face.0 as usize;
        let fb = b.face.0 as usize;
        if fa == fb {
            return a.position.distance_to(&b.position);
        }

        let mut best = f64::INFINITY;

        // Across a shared edge: unfold and measure straight.
        for j in 0..3 {
            if let Some((nf, _)) = self.neighbors[fa][j] {
                if nf == fb {
                    let unfolded = self.unfold_across(fa, fb, j, &b.position);
                    best = best.min(a.position.distance_to(&unfolded));
                }
            }
        }

        // Around any shared vertex.
        for &vid in &self.vertices_of(a.face) {
            if self.vertices_of(b.face).contains(&vid) {
                best = best.min(self.distance_via_vertex(vid, a, b));
            }
        }

        if best.is_finite() {
            return best;
        }
        self.distance_via_graph(a, b)
    }

    /// Dijkstra over mesh vertices for pairs too far apart for unfolding.
    fn distance_via_graph(&self, a: &SurfacePosition, b: &SurfacePosition) -> f64 {
        let n = self.vertices.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut heap: BinaryHeap<std::cmp::Reverse<(u64, usize)>> = BinaryHeap::new();
        // f64 keys packed as ordered bits; distances are non-negative.
        let key = |d: f64| d.to_bits();

        for &vid in &self.vertices_of(a.face) {
            let vi = vid.0 as usize;
            let d = a.position.distance_to(&self.vertices[vi]);
            if d < dist[vi] {
                dist[vi] = d;
                heap.push(std::cmp::Reverse((key(d), vi)));
            }
        }
        while let Some(std::cmp::Reverse((k, vi))) = heap.pop() {
            if k > key(dist[vi]) {
                continue;
            }
            for &(p, q) in &self.edges {
                let other = if p == vi {
                    q
                } else if q == vi {
                    p
                } else {
                    continue;
                };
                let nd = dist[vi] + self.vertices[p].distance_to(&self.vertices[q]);
                if nd < dist[other] {
                    dist[other] = nd;
                    heap.push(std::cmp::Reverse((key(nd), other)));
                }
            }
        }

        let mut best = f64::INFINITY;
        for &vid in &self.vertices_of(b.face) {
            let vi = vid.0 as usize;
            best = best.min(dist[vi] + b.position.distance_to(&self.vertices[vi]));
        }
        best
    }

    /// Geodesic direction at `a` toward `b`, in `a`'s face plane, with the
    /// geodesic distance as its length.
    pub fn direction(&self, a: &SurfacePosition, b: &SurfacePosition) -> Vector3 {
        let fa = a.face.0 as usize;
        let fb = b.face.0 as usize;
        if fa == fb {
            return b.position - a.position;
        }

        // Across a shared edge.
        for j in 0..3 {
            if let Some((nf, _)) = self.neighbors[fa][j] {
                if nf == fb {
                    let unfolded = self.unfold_across(fa, fb, j, &b.position);
                    return unfolded - a.position;
                }
            }
        }

        // Around a shared vertex: rebuild the unfolded picture in a's plane.
        for &vid in &self.vertices_of(a.face) {
            if !self.vertices_of(b.face).contains(&vid) {
                continue;
            }
            let (ta, _) = match self.fan_coordinate(vid, a) {
                Some(c) => c,
                None => continue,
            };
            let (tb, db) = match self.fan_coordinate(vid, b) {
                Some(c) => c,
                None => continue,
            };
            let fan = &self.fans[vid.0 as usize];
            let mut psi = tb - ta;
            if fan.closed {
                // Shorter way around.
                let phi = fan.apex_angle;
                psi = psi.rem_euclid(phi);
                if psi > phi / 2.0 {
                    psi -= phi;
                }
            }
            let apex = self.vertex_at(vid);
            let n = self.triangles[fa].normal();
            let e = (a.position - apex).normalize();
            let e_perp = n.cross(&e);
            let unfolded = apex + (e * psi.cos() + e_perp * psi.sin()) * db;
            let dir = unfolded - a.position;
            // Scale to the geodesic length (straight only below pi).
            let d = self.distance_via_vertex(vid, a, b);
            let len = dir.length();
            if len > 0.0 {
                return dir * (d / len);
            }
        }

        // Distant fallback: point at the nearest face vertex, scaled to the
        // graph distance.
        let d = self.distance_via_graph(a, b);
        let mut best = (f64::INFINITY, Vector3::zero());
        for &vid in &self.vertices_of(a.face) {
            let to_v = self.vertex_at(vid) - a.position;
            let l = to_v.length();
            if l < best.0 {
                best = (l, to_v);
            }
        }
        best.1.normalize() * d
    }

    /// Largest circular-shell radius permitted at `pos`: the distance to the
    /// nearest vertex or non-traversable boundary edge of the neighbourhood.
    pub fn max_circle_size(&self, pos: &SurfacePosition) -> f64 {
        let fi = pos.face.0 as usize;
        let p = pos.position;
        let mut limit = f64::INFINITY;

        for &vid in &self.vertices_of(pos.face) {
            limit = limit.min(p.distance_to(&self.vertex_at(vid)));
        }
        // Vertices one hop away, via unfolding.
        for j in 0..3 {
            let tri = &self.triangles[fi];
            match self.neighbors[fi][j] {
                Some((nf, ne)) => {
                    let opposite = self.vertices[self.faces[nf][(ne + 2) % 3]];
                    let unfolded = self.unfold_across(fi, nf, j, &opposite);
                    limit = limit.min(p.distance_to(&unfolded));
                }
                None => {
                    let a = tri.vertex(j);
                    let b = tri.vertex((j + 1) % 3);
                    limit = limit.min(point_segment_distance(&p, &a, &b));
                }
            }
        }
        limit
    }

    /// Largest conical-shell slant at a vertex: the cone must stay within the
    /// vertex fan.
    pub fn max_cone_size(&self, vid: VertexID) -> f64 {
        let apex = self.vertex_at(vid);
        let fan = &self.fans[vid.0 as usize];
        let mut limit = f64::INFINITY;
        for entry in &fan.entries {
            let f = self.faces[entry.face];
            let a = self.vertices[f[(entry.vlocal + 1) % 3]];
            let b = self.vertices[f[(entry.vlocal + 2) % 3]];
            limit = limit.min(point_segment_distance(&apex, &a, &b));
        }
        limit
    }

    /// Some face incident to the vertex, anchoring it as a surface position.
    pub fn incident_face(&self, vid: VertexID) -> FaceID {
        let fan = &self.fans[vid.0 as usize];
        FaceID(fan.entries[0].face as u64)
    }

    /// The vertex as a surface position on one of its incident faces.
    pub fn vertex_position(&self, vid: VertexID) -> SurfacePosition {
        SurfacePosition::new(self.vertex_at(vid), self.incident_face(vid))
    }

    pub fn area_of(&self, fid: FaceID) -> f64 {
        let t = self.triangle_at(fid);
        (t.vertex(1) - t.vertex(0))
            .cross(&(t.vertex(2) - t.vertex(0)))
            .length()
            * 0.5
    }

    /// Nearest vertex of the host face and the distance to it.
    pub fn nearest_vertex(&self, pos: &SurfacePosition) -> (VertexID, f64) {
        let mut best = (VertexID(0), f64::INFINITY);
        for &vid in &self.vertices_of(pos.face) {
            let d = pos.position.distance_to(&self.vertex_at(vid));
            if d < best.1 {
                best = (vid, d);
            }
        }
        best
    }
}

fn point_segment_distance(p: &Vector3, a: &Vector3, b: &Vector3) -> f64 {
    let ab = *b - *a;
    let t = ((*p - *a).dot(&ab) / ab.length_squared()).clamp(0.0, 1.0);
    p.distance_to(&(*a + ab * t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Polygon {
        Polygon::flat_unit_square(1.0)
    }

    #[test]
    fn test_flat_square_structure() {
        let poly = square();
        assert_eq!(poly.num_faces(), 2);
        assert_eq!(poly.num_vertices(), 4);
        // The diagonal is shared, the outer edges are boundary.
        let shared: usize = (0..2)
            .map(|f| {
                (0..3)
                    .filter(|&j| poly.neighbors[f][j].is_some())
                    .count()
            })
            .sum();
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_apex_angles() {
        let poly = square();
        // Corner vertices of the square: 90 degrees in total.
        let right_angle = std::f64::consts::FRAC_PI_2;
        assert_relative_eq!(
            poly.apex_angle(VertexID(0)),
            right_angle,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            poly.apex_angle(VertexID(1)),
            right_angle,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_travel_within_face() {
        let poly = square();
        let mut state = SurfacePosition::new(Vector3::new(0.6, 0.2, 0.0), FaceID(0));
        let hops = poly.travel(&mut state, Vector3::new(0.1, 0.1, 0.0), 2);
        assert_eq!(hops, 2);
        assert_relative_eq!(state.position.x, 0.7, epsilon = 1e-12);
        assert_relative_eq!(state.position.y, 0.3, epsilon = 1e-12);
        assert_eq!(state.face, FaceID(0));
    }

    #[test]
    fn test_travel_across_diagonal() {
        let poly = square();
        // Face 0 is the lower-right triangle; push the point across the
        // diagonal into face 1.
        let mut state = SurfacePosition::new(Vector3::new(0.6, 0.2, 0.0), FaceID(0));
        let hops = poly.travel(&mut state, Vector3::new(-0.3, 0.3, 0.0), 2);
        assert_eq!(hops, 1);
        assert_eq!(state.face, FaceID(1));
        assert_relative_eq!(state.position.x, 0.3, epsilon = 1e-12);
        assert_relative_eq!(state.position.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_travel_boundary_clamps() {
        let poly = square();
        let mut state = SurfacePosition::new(Vector3::new(0.5, 0.2, 0.0), FaceID(0));
        poly.travel(&mut state, Vector3::new(0.0, -0.4, 0.0), 2);
        // Clamped at the bottom edge.
        assert!(state.position.y.abs() < 1e-9);
    }

    #[test]
    fn test_distance_same_and_adjacent() {
        let poly = square();
        let a = SurfacePosition::new(Vector3::new(0.6, 0.2, 0.0), FaceID(0));
        let b = SurfacePosition::new(Vector3::new(0.7, 0.25, 0.0), FaceID(0));
        assert_relative_eq!(
            poly.distance(&a, &b),
            a.position.distance_to(&b.position),
            epsilon = 1e-12
        );

        // Across the diagonal of a flat mesh the geodesic is still straight.
        let c = SurfacePosition::new(Vector3::new(0.2, 0.6, 0.0), FaceID(1));
        assert_relative_eq!(
            poly.distance(&a, &c),
            a.position.distance_to(&c.position),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_direction_matches_distance() {
        let poly = square();
        let a = SurfacePosition::new(Vector3::new(0.6, 0.2, 0.0), FaceID(0));
        let c = SurfacePosition::new(Vector3::new(0.2, 0.6, 0.0), FaceID(1));
        let dir = poly.direction(&a, &c);
        assert_relative_eq!(dir.length(), poly.distance(&a, &c), epsilon = 1e-10);
    }

    #[test]
    fn test_roll_stays_on_fan() {
        let poly = square();
        // Vertex 0 is a corner with a quarter-turn fan.
        let pos = SurfacePosition::new(Vector3::new(0.2, 0.1, 0.0), FaceID(0));
        let rolled = poly.roll(&pos, VertexID(0), 0.3, 0.2);
        assert_relative_eq!(
            rolled.position.distance_to(&poly.vertex_at(VertexID(0))),
            0.3,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_max_circle_size_bounded_by_vertices() {
        let poly = square();
        let pos = SurfacePosition::new(poly.centroid_of(FaceID(0)), FaceID(0));
        let max = poly.max_circle_size(&pos);
        for &vid in &poly.vertices_of(FaceID(0)) {
            assert!(max <= pos.position.distance_to(&poly.vertex_at(vid)) + 1e-12);
        }
    }

    #[test]
    fn test_max_cone_size_positive() {
        let poly = square();
        for v in 0..4 {
            assert!(poly.max_cone_size(VertexID(v)) > 0.0);
        }
    }
}
