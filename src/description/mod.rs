//! Description: the built attribute graph plus per-frame driving
//!
//! ```text
//! config ──build──▶ Graph (immutable)
//!                     │
//! initialize(i) ──▶ FrameState reset, seed = base + i
//!                     │
//! resolve_scene ──▶ pass 1: resolve, harmonizers absorb
//!                   pass 2: harmonizers reflect ... until nothing is pending
//! ```

mod builder;
mod graph;
mod resolver;
mod scene;
mod state;

use serde_yaml::Value;
use tracing::info;

pub use builder::build_graph;
pub use graph::{Graph, Node};
pub(crate) use resolver::ready;
pub use resolver::{Outcome, Resolution, Resolver};
pub use scene::ResolvedScene;
pub use state::FrameState;

use crate::config;
use crate::error::{DescriptionError, Result};
use crate::harmonizer::PitchSource;
use crate::value::Bindings;

/// Frame index used for the setup pass.
pub const SETUP_FRAME: i64 = -1;

pub struct Description {
    graph: Graph,
    state: FrameState,
    base_seed: i64,
    num_frames: i64,
    seed: i64,
    mapping: Bindings,
    pitch_source: Option<Box<dyn PitchSource>>,
}

impl std::fmt::Debug for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Description")
            .field("base_seed", &self.base_seed)
            .field("num_frames", &self.num_frames)
            .field("seed", &self.seed)
            .field("elements", &self.graph.elements.len())
            .field("harmonizers", &self.graph.harmonizers.len())
            .finish()
    }
}

impl Description {
    /// Build from a flattened root mapping carrying an integer `seed`.
    pub fn build(config: &Value) -> Result<Self> {
        let root = config
            .as_mapping()
            .ok_or_else(|| DescriptionError::config("/", "description must be a mapping"))?;
        let base_seed = root
            .get("seed")
            .and_then(Value::as_i64)
            .ok_or_else(|| DescriptionError::config("/seed", "an integer seed is required"))?;
        let num_frames = match root.get("num_frames") {
            None => 1,
            Some(value) => value.as_i64().filter(|n| *n >= 0).ok_or_else(|| {
                DescriptionError::config("/num_frames", "num_frames must be a non-negative integer")
            })?,
        };

        let graph = build_graph(config)?;
        let state = FrameState::new(&graph);
        let mut description = Description {
            graph,
            state,
            base_seed,
            num_frames,
            seed: base_seed,
            mapping: Bindings::new(),
            pitch_source: None,
        };
        description.initialize(0);
        Ok(description)
    }

    /// Build from a loaded document (`scene_description` header, version
    /// checked, `count` blocks expanded).
    pub fn from_document(document: &Value) -> Result<Self> {
        let body = config::unwrap_document(document)?;
        Self::build(&config::flatten(body)?)
    }

    /// Install the collaborator answering `local_aabb` pitches.
    pub fn set_pitch_source(&mut self, source: impl PitchSource + 'static) {
        self.pitch_source = Some(Box::new(source));
    }

    /// Reset all per-frame state and reseed for `frame_index`.
    pub fn initialize(&mut self, frame_index: i64) {
        self.state.reset();
        self.seed = self.base_seed.wrapping_add(frame_index);
        self.mapping = Bindings::from([
            ("seed".to_string(), Value::from(self.seed)),
            ("num_frames".to_string(), Value::from(self.num_frames)),
        ]);
    }

    /// Run the fixed-point loop for the current frame.
    pub fn resolve_scene(&mut self, is_init_frame: bool) -> Result<ResolvedScene> {
        let mut resolver = Resolver {
            graph: &self.graph,
            state: &mut self.state,
            mapping: &self.mapping,
            frame_seed: self.seed,
            is_init_frame,
            pitch_source: self.pitch_source.as_deref(),
        };
        resolver.resolve_scene()
    }

    /// Setup pass: sets and folders expose their full lists, harmonized attributes are null.
    pub fn resolve_setup(&mut self) -> Result<ResolvedScene> {
        self.initialize(SETUP_FRAME);
        self.resolve_scene(true)
    }

    pub fn resolve_frame(&mut self, frame_index: i64) -> Result<ResolvedScene> {
        self.initialize(frame_index);
        let scene = self.resolve_scene(false)?;
        info!(frame = frame_index, seed = self.seed, passes = scene.passes, "frame resolved");
        Ok(scene)
    }

    /// Seed of the current frame.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn base_seed(&self) -> i64 {
        self.base_seed
    }

    pub fn num_frames(&self) -> i64 {
        self.num_frames
    }

    pub fn mapping(&self) -> &Bindings {
        &self.mapping
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }
}
