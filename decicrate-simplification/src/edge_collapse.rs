//! Edge collapse decimation
//!
//! Drives a decimation session through `Idle -> Cleaning -> Decimating ->
//! Optimizing -> Done`. Quadrics are initialised by a [`DecimationStrategy`],
//! every live edge is queued by collapse cost, and candidates are popped,
//! validated against the current topology and applied until the face target
//! is met or no candidate is left.

use crate::cleanup::clean_mesh;
use crate::edge_flip::EdgeFlipOptimizer;
use crate::params::DecimationParams;
use crate::quadric_error::{
    is_degenerate, normal_deviation_deg, quality_penalty, triangle_normal, triangle_quality,
};
use crate::queue::CollapseQueue;
use crate::report::DecimationReport;
use crate::store::MeshStore;
use crate::strategy::{select_strategy, DecimationStrategy, GeometryStrategy};
use crate::MeshSimplifier;
use decicrate_core::{to_f32, to_f64, Error, Point3d, Result, TriangleMesh};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Phases of a decimation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Cleaning,
    Decimating,
    Optimizing,
    Done,
}

/// Result of a successful session
#[derive(Debug, Clone)]
pub struct DecimationOutcome {
    pub mesh: TriangleMesh,
    pub report: DecimationReport,
}

/// Quadric edge collapse decimator with texture seam preservation.
///
/// ```no_run
/// use decicrate_simplification::{DecimationParams, QuadricDecimator};
/// # fn run(mesh: &decicrate_core::TriangleMesh) -> decicrate_core::Result<()> {
/// let decimator = QuadricDecimator::new(DecimationParams::new().with_reduction(0.5));
/// let outcome = decimator.decimate(mesh)?;
/// println!("{}", outcome.report);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuadricDecimator {
    params: DecimationParams,
}

#[derive(Debug, Default, Clone, Copy)]
struct CollapseStats {
    performed: usize,
    rejected: usize,
    stale: usize,
}

struct Session {
    state: SessionState,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }
}

impl QuadricDecimator {
    pub fn new(params: DecimationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DecimationParams {
        &self.params
    }

    /// Decimate `mesh`. The input is never modified; on error nothing is
    /// returned.
    pub fn decimate(&self, mesh: &TriangleMesh) -> Result<DecimationOutcome> {
        let start_time = Instant::now();
        let params = &self.params;
        params.validate()?;
        if mesh.is_empty() {
            return Err(Error::InvalidData("Cannot decimate an empty mesh".to_string()));
        }
        mesh.validate()?;

        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            textured = mesh.has_texture(),
            "Starting decimation"
        );

        let mut session = Session::new();
        let mut report = DecimationReport {
            original_faces: mesh.face_count(),
            original_vertices: mesh.vertex_count(),
            had_texture: mesh.has_texture(),
            ..Default::default()
        };

        let cleaned = if params.pre_clean {
            session.transition(SessionState::Cleaning);
            let (cleaned, clean) = clean_mesh(mesh, params.merge_threshold_ratio)?;
            info!("Cleanup {}", clean);
            report.clean = Some(clean);
            cleaned
        } else {
            mesh.clone()
        };

        let snapshot = MeshStore::from_triangle_mesh(&cleaned)?;
        if snapshot.live_face_count() == 0 {
            return Err(Error::InvalidData(
                "Mesh has no valid faces left to decimate".to_string(),
            ));
        }
        report.cleaned_faces = snapshot.live_face_count();
        let target = params.target_faces(report.cleaned_faces);
        report.target_faces = target;

        session.transition(SessionState::Decimating);
        let strategy = select_strategy(&snapshot);
        let mut store = snapshot.clone();

        let stats = match run_collapses(&mut store, strategy.as_ref(), params, target) {
            Ok(stats) => {
                report.strategy = strategy.name();
                stats
            }
            Err(err) if err.is_recoverable() && strategy.uses_texture() => {
                warn!(error = %err, "Texture-aware quadrics failed, retrying with geometry only");
                store = snapshot;
                store.strip_texture();
                report.fallback_used = true;
                let stats = run_collapses(&mut store, &GeometryStrategy, params, target)?;
                report.strategy = GeometryStrategy.name();
                stats
            }
            Err(err) => return Err(err),
        };
        report.collapses_performed = stats.performed;
        report.collapses_rejected = stats.rejected;
        report.stale_candidates = stats.stale;
        report.underfilled = store.live_face_count() > target;

        // A session that collapsed nothing hands back the cleaned mesh as is
        if stats.performed > 0 {
            session.transition(SessionState::Optimizing);
            let optimizer =
                EdgeFlipOptimizer::new(params.flip_iterations, params.planar_threshold_deg);
            report.flips = optimizer.optimize(&mut store)?;
        } else {
            debug!("No collapses performed, skipping edge flips");
        }

        session.transition(SessionState::Done);
        let output = store.to_triangle_mesh()?;
        report.final_faces = output.face_count();
        report.final_vertices = output.vertex_count();
        report.elapsed = start_time.elapsed();

        if report.underfilled {
            warn!(
                faces = report.final_faces,
                target, "Ran out of valid collapses before reaching the target"
            );
        }
        info!(
            vertices = report.final_vertices,
            faces = report.final_faces,
            reduction_percent = report.reduction_percent(),
            strategy = report.strategy,
            fallback = report.fallback_used,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Decimation finished"
        );

        Ok(DecimationOutcome {
            mesh: output,
            report,
        })
    }
}

impl MeshSimplifier for QuadricDecimator {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if !(reduction_ratio > 0.0 && reduction_ratio < 1.0) {
            return Err(Error::InvalidParameters(format!(
                "Reduction ratio must be in (0, 1), got {}",
                reduction_ratio
            )));
        }
        let params = self.params.clone().with_reduction(reduction_ratio as f64);
        QuadricDecimator::new(params).decimate(mesh).map(|outcome| outcome.mesh)
    }
}

/// Initialise quadrics, seed the queue and collapse until `target` faces
/// remain or the queue is empty.
fn run_collapses(
    store: &mut MeshStore,
    strategy: &dyn DecimationStrategy,
    params: &DecimationParams,
    target: usize,
) -> Result<CollapseStats> {
    strategy.initialize_quadrics(store, params)?;

    let mut queue = CollapseQueue::new();
    for (a, b) in store.edges() {
        enqueue(&mut queue, store, strategy, params, a, b);
    }
    debug!(
        strategy = strategy.name(),
        candidates = queue.len(),
        target,
        "Seeded collapse queue"
    );

    let mut stats = CollapseStats::default();
    while store.live_face_count() > target {
        let Some(candidate) = queue.pop() else {
            break;
        };
        if !candidate.is_current(store) {
            stats.stale += 1;
            continue;
        }
        let keep = candidate.keep;
        let remove = candidate.remove();
        let position = candidate.position;
        if !candidate.cost.is_finite()
            || !is_valid_collapse(store, strategy, params, keep, remove, &to_f64(&position))
        {
            stats.rejected += 1;
            continue;
        }

        store.collapse(keep, remove, position)?;
        stats.performed += 1;

        for n in store.neighbors(keep) {
            enqueue(&mut queue, store, strategy, params, keep, n);
        }
    }

    debug!(
        performed = stats.performed,
        rejected = stats.rejected,
        stale = stats.stale,
        pushed = queue.pushed(),
        "Collapse loop finished"
    );
    Ok(stats)
}

/// Evaluate the edge `(a, b)` and push it.
fn enqueue(
    queue: &mut CollapseQueue,
    store: &MeshStore,
    strategy: &dyn DecimationStrategy,
    params: &DecimationParams,
    a: usize,
    b: usize,
) {
    let (a, b) = (a.min(b), a.max(b));
    let (keep, position, cost) = collapse_cost(store, strategy, params, a, b);
    queue.push(store, a, b, keep, to_f32(&position), cost);
}

/// Survivor, target position and cost of collapsing the edge `(a, b)`.
fn collapse_cost(
    store: &MeshStore,
    strategy: &dyn DecimationStrategy,
    params: &DecimationParams,
    a: usize,
    b: usize,
) -> (usize, Point3d, f64) {
    let q = store.vertex(a).quadric + store.vertex(b).quadric;
    let pa = store.position_f64(a);
    let pb = store.position_f64(b);

    let lower_endpoint = || {
        if q.evaluate(&pb) < q.evaluate(&pa) {
            (b, pb)
        } else {
            (a, pa)
        }
    };

    let (keep, position) = match (
        strategy.is_pinned(store, a, params),
        strategy.is_pinned(store, b, params),
    ) {
        (true, false) => (a, pa),
        (false, true) => (b, pb),
        (true, true) => lower_endpoint(),
        (false, false) => {
            let optimal = if params.optimal_position {
                q.optimal_point()
            } else {
                None
            };
            match optimal {
                Some(p) => (a, p),
                None => {
                    let mid = Point3d::from((pa.coords + pb.coords) * 0.5);
                    if q.evaluate(&mid).is_finite() {
                        (a, mid)
                    } else {
                        lower_endpoint()
                    }
                }
            }
        }
    };

    if !q.is_finite() || !position.coords.iter().all(|x| x.is_finite()) {
        return (keep, position, f64::INFINITY);
    }

    let remove = if keep == a { b } else { a };
    let changes = store.collapse_preview(keep, remove, &position);

    let mut cost = q.evaluate(&position);
    let worst = changes
        .iter()
        .map(|c| triangle_quality(&c.after[0], &c.after[1], &c.after[2]))
        .fold(1.0, f64::min);
    cost *= quality_penalty(worst, params.quality_threshold);

    if params.preserve_normal {
        let deviates = changes.iter().any(|c| {
            match (
                triangle_normal(&c.before[0], &c.before[1], &c.before[2]),
                triangle_normal(&c.after[0], &c.after[1], &c.after[2]),
            ) {
                (Some(n0), Some(n1)) => normal_deviation_deg(&n0, &n1) > params.normal_threshold_deg,
                _ => false,
            }
        });
        if deviates {
            cost = f64::INFINITY;
        }
    }
    (keep, position, cost)
}

/// Topology and constraint checks for collapsing `remove` into `keep` at
/// `position`, run against the current store.
fn is_valid_collapse(
    store: &MeshStore,
    strategy: &dyn DecimationStrategy,
    params: &DecimationParams,
    keep: usize,
    remove: usize,
    position: &Point3d,
) -> bool {
    let faces = store.edge_faces(keep, remove);
    if faces.is_empty() || faces.len() > 2 {
        return false;
    }

    // Link condition: the shared neighbours are exactly the edge's apices
    let mut opposite: Vec<usize> = faces
        .iter()
        .filter_map(|&f| store.face(f).opposite(keep, remove))
        .collect();
    opposite.sort_unstable();
    opposite.dedup();
    let around_remove = store.neighbors(remove);
    let common: Vec<usize> = store
        .neighbors(keep)
        .into_iter()
        .filter(|n| around_remove.binary_search(n).is_ok())
        .collect();
    if common != opposite {
        return false;
    }

    let (vk, vr) = (store.vertex(keep), store.vertex(remove));
    if vk.boundary && vr.boundary && !store.is_boundary_edge(keep, remove) {
        return false;
    }

    // Each apex loses one neighbour
    for &o in &opposite {
        let floor = if store.vertex(o).boundary { 2 } else { 3 };
        if store.valence(o) < floor + 1 {
            return false;
        }
    }

    if !strategy.allows_collapse(store, keep, remove, params) {
        return false;
    }

    store.collapse_preview(keep, remove, position).iter().all(|c| {
        let [p0, p1, p2] = c.after;
        if is_degenerate(&p0, &p1, &p2) {
            return false;
        }
        match triangle_normal(&c.before[0], &c.before[1], &c.before[2]) {
            Some(before) => (p1 - p0).cross(&(p2 - p0)).dot(&before) > 0.0,
            None => true,
        }
    })
}
