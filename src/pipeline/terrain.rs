//! Terrain pipeline orchestration.

use std::sync::Arc;

use tracing::{debug, info};

use super::cancel::CancelToken;
use super::stage::{run_async_stage, run_stage, StageId};
use crate::error::TerrainError;
use crate::mesh::{assemble_mesh, extract_isosurface, FinalMesh};
use crate::source::{HeightmapSource, ImageInput};
use crate::terrain::{build_density_field, DensityField, Heightmap, TerrainConfig};

/// Artifacts of the most recent successful run.
#[derive(Debug, Clone, Default)]
pub struct TerrainArtifacts {
    /// `None` when the last run started from a density field.
    pub heightmap: Option<Arc<Heightmap>>,
    pub density_field: Option<Arc<DensityField>>,
    pub mesh: Option<Arc<FinalMesh>>,
}

/// Runs heightmap → density field → mesh for one fixed configuration.
///
/// The numeric stages run on tokio's blocking pool. Each successful run
/// replaces all cached artifacts at once; a failed run leaves them untouched.
pub struct TerrainPipeline {
    config: Arc<TerrainConfig>,
    cancel: CancelToken,
    artifacts: TerrainArtifacts,
}

impl TerrainPipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            cancel: CancelToken::new(),
            artifacts: TerrainArtifacts::default(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Token that cancels running stages of this pipeline.
    ///
    /// Stays cancelled until [`CancelToken::reset`] is called.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn artifacts(&self) -> &TerrainArtifacts {
        &self.artifacts
    }

    pub fn heightmap(&self) -> Option<&Arc<Heightmap>> {
        self.artifacts.heightmap.as_ref()
    }

    pub fn density_field(&self) -> Option<&Arc<DensityField>> {
        self.artifacts.density_field.as_ref()
    }

    pub fn mesh(&self) -> Option<&Arc<FinalMesh>> {
        self.artifacts.mesh.as_ref()
    }

    /// Drops all cached artifacts.
    pub fn clear(&mut self) {
        self.artifacts = TerrainArtifacts::default();
    }

    /// Obtains a heightmap from `source`, then continues as
    /// [`TerrainPipeline::from_heightmap`].
    pub async fn from_image<S>(&mut self, source: &S, input: impl Into<ImageInput>) -> Result<Arc<FinalMesh>, TerrainError>
    where
        S: HeightmapSource + ?Sized,
    {
        self.cancel.check()?;
        debug!(stages = ?StageId::chain_from(StageId::Heightmap), "Running pipeline");

        let (width, depth) = (self.config.width, self.config.depth);
        let heightmap = run_async_stage(StageId::Heightmap, async {
            Ok(source.extract_heightmap(input.into(), width, depth).await?)
        })
        .await?;
        info!(
            width = heightmap.width(),
            depth = heightmap.depth(),
            land_fraction = heightmap.land_fraction(),
            "Heightmap extracted from image"
        );
        self.from_heightmap(heightmap).await
    }

    /// Builds the density field for `heightmap` and meshes it.
    pub async fn from_heightmap(&mut self, heightmap: impl Into<Arc<Heightmap>>) -> Result<Arc<FinalMesh>, TerrainError> {
        let heightmap = heightmap.into();
        debug!(stages = ?StageId::chain_from(StageId::Density), "Running pipeline");

        let density_field = {
            let heightmap = Arc::clone(&heightmap);
            let config = Arc::clone(&self.config);
            let cancel = self.cancel.clone();
            run_stage(StageId::Density, move || build_density_field(&heightmap, &config, &cancel)).await?
        };
        let density_field = Arc::new(density_field);

        let mesh = self.mesh_from(Arc::clone(&density_field)).await?;
        self.commit(Some(heightmap), density_field, Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Meshes an existing density field, skipping density generation.
    pub async fn from_density_field(
        &mut self,
        density_field: impl Into<Arc<DensityField>>,
    ) -> Result<Arc<FinalMesh>, TerrainError> {
        let density_field = density_field.into();
        let expected = self.config.grid_shape();
        if density_field.shape() != expected {
            return Err(TerrainError::ShapeMismatch {
                artifact: "density field",
                expected,
                actual: density_field.shape(),
            });
        }
        debug!(stages = ?StageId::chain_from(StageId::Extraction), "Running pipeline");

        let mesh = self.mesh_from(Arc::clone(&density_field)).await?;
        self.commit(None, density_field, Arc::clone(&mesh));
        Ok(mesh)
    }

    async fn mesh_from(&self, density_field: Arc<DensityField>) -> Result<Arc<FinalMesh>, TerrainError> {
        let iso = self.config.iso;
        let scale = self.config.world_scale;

        let cancel = self.cancel.clone();
        let raw = run_stage(StageId::Extraction, move || extract_isosurface(&density_field, iso, &cancel)).await?;

        self.cancel.check()?;
        let mesh = run_stage(StageId::Assembly, move || assemble_mesh(&raw, scale)).await?;

        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "Terrain mesh ready"
        );
        Ok(Arc::new(mesh))
    }

    fn commit(&mut self, heightmap: Option<Arc<Heightmap>>, density_field: Arc<DensityField>, mesh: Arc<FinalMesh>) {
        self.artifacts = TerrainArtifacts {
            heightmap,
            density_field: Some(density_field),
            mesh: Some(mesh),
        };
    }
}
