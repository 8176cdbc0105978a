//! The schematization pipeline over one planar subdivision.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geograph::{Dcel, FaceId};
use tracing::{info, warn};

use crate::boundary::FaceFaceBoundaryList;
use crate::classify::{self, EdgeClass};
use crate::config::Config;
use crate::configuration::{self, Configuration};
use crate::error::{Result, SchematizeError};
use crate::orientation::DirectionSet;
use crate::staircase::{self, Staircase};

/// Per-vertex payload.
#[derive(Clone, Debug, Default)]
pub struct VertexData {
    pub significant: bool,
}

/// Per-half-edge payload.
#[derive(Clone, Debug, Default)]
pub struct EdgeData {
    pub class:         Option<EdgeClass>,
    pub staircase:     Option<Staircase>,
    pub configuration: Option<Configuration>,
}

pub type SchematicDcel = Dcel<VertexData, EdgeData>;

/// Pipeline position.  Steps run strictly in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Loaded,
    Preprocessed,
    Classified,
    Constrained,
    Simplified,
}

#[derive(Debug)]
pub struct Subdivision {
    dcel:       SchematicDcel,
    config:     Config,
    directions: DirectionSet,
    /// Maximum edge length after preprocessing.
    epsilon:    f64,
    phase:      Phase,
    boundaries: Option<FaceFaceBoundaryList>,
    /// Number of input features, including skipped ones.
    features:   usize,
}

impl Subdivision {
    /// Build the subdivision of `features`; the index of a feature is its FID.
    pub fn new(features: &[MultiPolygon<f64>], config: Config) -> Result<Self> {
        config.validate()?;
        let directions = config.direction_set()?;
        let dcel = SchematicDcel::from_multipolygons(features)?;
        let epsilon = config.lambda * dcel.diameter();
        info!(
            features = features.len(),
            vertices = dcel.num_vertices(),
            faces = dcel.num_faces(),
            directions = directions.len(),
            epsilon,
            "loaded subdivision"
        );
        Ok(Self { dcel, config, directions, epsilon, phase: Phase::Loaded, boundaries: None, features: features.len() })
    }

    pub fn dcel(&self) -> &SchematicDcel { &self.dcel }

    pub fn config(&self) -> &Config { &self.config }

    pub fn directions(&self) -> &DirectionSet { &self.directions }

    pub fn epsilon(&self) -> f64 { self.epsilon }

    pub fn phase(&self) -> Phase { self.phase }

    /// The face-face boundary list, once simplification has built it.
    pub fn boundaries(&self) -> Option<&FaceFaceBoundaryList> { self.boundaries.as_ref() }

    fn require(&self, step: &'static str, required: Phase) -> Result<()> {
        if self.phase != required {
            return Err(SchematizeError::Phase { step, required, actual: self.phase });
        }
        Ok(())
    }

    /// Split every edge longer than `epsilon`.
    pub fn preprocess(&mut self) -> Result<()> {
        self.require("preprocess", Phase::Loaded)?;
        let before = self.dcel.num_vertices();
        if self.epsilon > 0.0 {
            let pairs: Vec<_> = self.dcel.edge_pairs().collect();
            for he in pairs {
                self.dcel.subdivide_to_threshold(he, self.epsilon)?;
            }
        }
        info!(inserted = self.dcel.num_vertices() - before, "preprocessed edges");
        self.phase = Phase::Preprocessed;
        Ok(())
    }

    /// Mark significant vertices, separate adjacent ones, and classify
    /// every edge.
    pub fn classify(&mut self) -> Result<()> {
        self.require("classify", Phase::Preprocessed)?;
        let significant = classify::mark_significant(&mut self.dcel, &self.directions);
        let split = classify::split_significant_edges(&mut self.dcel)?;
        classify::classify_edges(&mut self.dcel, &self.directions)?;
        info!(significant, split, "classified edges");
        self.phase = Phase::Classified;
        Ok(())
    }

    /// Replace every non-conforming edge by its staircase.
    pub fn constrain_angles(&mut self) -> Result<()> {
        self.require("constrain_angles", Phase::Classified)?;
        let epsilon = self.config.staircase_epsilon;
        let count = staircase::add_staircases(&mut self.dcel, &self.directions, epsilon)?;
        staircase::calculate_staircases(&mut self.dcel, &self.directions, epsilon)?;
        staircase::replace_edges_with_staircases(&mut self.dcel, &self.directions)?;
        info!(staircases = count, vertices = self.dcel.num_vertices(), "constrained angles");
        self.phase = Phase::Constrained;
        Ok(())
    }

    /// Build the face-face boundary list and configurations, then perform up
    /// to `max_edge_moves` paired edge moves.
    pub fn simplify(&mut self) -> Result<()> {
        self.require("simplify", Phase::Constrained)?;
        let mut boundaries = FaceFaceBoundaryList::new(&self.dcel);
        let mut configurations = configuration::add_configurations(&mut self.dcel, &boundaries);

        let mut moves = 0;
        while moves < self.config.max_edge_moves {
            let Some(area) = configuration::paired_edge_move(&mut self.dcel, &boundaries)? else { break };
            moves += 1;
            tracing::debug!(area, "paired edge move");
            boundaries = FaceFaceBoundaryList::new(&self.dcel);
            configurations = configuration::add_configurations(&mut self.dcel, &boundaries);
        }
        if moves > 0 {
            let nonconforming = classify::reclassify_aligned(&mut self.dcel, &self.directions);
            if nonconforming > 0 {
                warn!(nonconforming, "edge moves left edges off the direction set");
            }
        }

        info!(pairs = boundaries.pairs().len(), configurations, moves, "simplified");
        self.boundaries = Some(boundaries);
        self.phase = Phase::Simplified;
        Ok(())
    }

    /// Run every remaining step.
    pub fn schematize(&mut self) -> Result<()> {
        if self.phase == Phase::Loaded { self.preprocess()?; }
        if self.phase == Phase::Preprocessed { self.classify()?; }
        if self.phase == Phase::Classified { self.constrain_angles()?; }
        if self.phase == Phase::Constrained { self.simplify()?; }
        Ok(())
    }

    /// One multipolygon per input feature, in input order.  Outer rings are
    /// counter-clockwise and holes clockwise.  Skipped features come back
    /// empty.
    pub fn to_multipolygons(&self) -> Vec<MultiPolygon<f64>> {
        let mut result = vec![MultiPolygon::<f64>(Vec::new()); self.features];
        for face in self.dcel.bounded_faces() {
            let record = self.dcel.face(face);
            for &fid in &record.fids {
                if fid >= self.features || self.is_hole_of(face, fid) { continue; }
                result[fid].0.push(self.face_polygon(face));
            }
        }
        result
    }

    /// `face` was cut out of a face of the same feature.
    fn is_hole_of(&self, face: FaceId, fid: usize) -> bool {
        self.dcel.face(face).outer_ring.is_some_and(|outer| self.dcel.face(outer).fids.contains(&fid))
    }

    fn face_polygon(&self, face: FaceId) -> Polygon<f64> {
        let exterior = closed(self.dcel.face_ring(face));
        let holes = self.dcel.face(face).inner_edges.iter()
            .map(|&inner| closed(self.dcel.cycle_rev(inner).map(|he| self.dcel.head_coords(he)).collect()))
            .collect();
        Polygon::new(exterior, holes)
    }
}

fn closed(mut ring: Vec<Coord<f64>>) -> LineString<f64> {
    if let Some(&first) = ring.first() { ring.push(first); }
    LineString::from(ring)
}
