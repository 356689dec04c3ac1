//! Pipeline module for orchestrating terrain generation stages.
//!
//! Heightmap, density field and mesh are produced in order by
//! [`TerrainPipeline`]. Each numeric stage runs off the async executor and can
//! be stopped through a shared [`CancelToken`].

mod cancel;
mod stage;
mod terrain;

pub use cancel::CancelToken;
pub use stage::StageId;
pub use terrain::{TerrainArtifacts, TerrainPipeline};
