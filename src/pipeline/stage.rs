//! Stage identifiers and the blocking stage runner.

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::TerrainError;

/// Unique identifier for pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Heightmap extraction from a source image.
    Heightmap,
    /// Density field generation from the heightmap.
    Density,
    /// Isosurface extraction from the density field.
    Extraction,
    /// Scaling and normal computation.
    Assembly,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Heightmap => "heightmap",
            StageId::Density => "density",
            StageId::Extraction => "extraction",
            StageId::Assembly => "assembly",
        }
    }

    /// Stages run by each entry point, in order.
    pub fn chain_from(first: StageId) -> &'static [StageId] {
        const CHAIN: [StageId; 4] = [
            StageId::Heightmap,
            StageId::Density,
            StageId::Extraction,
            StageId::Assembly,
        ];
        match first {
            StageId::Heightmap => &CHAIN,
            StageId::Density => &CHAIN[1..],
            StageId::Extraction => &CHAIN[2..],
            StageId::Assembly => &CHAIN[3..],
        }
    }
}

/// Runs a synchronous stage on tokio's blocking pool and logs its outcome.
pub(crate) async fn run_stage<T, F>(stage: StageId, work: F) -> Result<T, TerrainError>
where
    F: FnOnce() -> Result<T, TerrainError> + Send + 'static,
    T: Send + 'static,
{
    run_async_stage(stage, async move {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| TerrainError::Worker(e.to_string()))?
    })
    .await
}

/// Awaits a stage that is already asynchronous, with the same logging as
/// [`run_stage`].
pub(crate) async fn run_async_stage<T, Fut>(stage: StageId, work: Fut) -> Result<T, TerrainError>
where
    Fut: Future<Output = Result<T, TerrainError>>,
{
    let start = Instant::now();
    debug!(stage = stage.name(), "Starting stage");

    let result = work.await;

    match &result {
        Ok(_) => info!(stage = stage.name(), elapsed = ?start.elapsed(), "Completed stage"),
        Err(e) => warn!(stage = stage.name(), error = %e, "Stage failed"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_chains() {
        assert_eq!(StageId::chain_from(StageId::Heightmap).len(), 4);
        assert_eq!(
            StageId::chain_from(StageId::Density),
            &[StageId::Density, StageId::Extraction, StageId::Assembly]
        );
        assert_eq!(StageId::chain_from(StageId::Assembly), &[StageId::Assembly]);
    }

    #[tokio::test]
    async fn test_run_stage_propagates_result() {
        let value = run_stage(StageId::Assembly, || Ok(7)).await.expect("stage result");
        assert_eq!(value, 7);

        let err = run_stage::<(), _>(StageId::Extraction, || Err(TerrainError::Cancelled)).await;
        assert!(matches!(err, Err(TerrainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_async_stage_propagates_result() {
        let value = run_async_stage(StageId::Heightmap, async { Ok("map") })
            .await
            .expect("stage result");
        assert_eq!(value, "map");

        let err = run_async_stage::<(), _>(StageId::Heightmap, async { Err(TerrainError::Cancelled) }).await;
        assert!(matches!(err, Err(TerrainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_stage_reports_panics() {
        let result = run_stage::<(), _>(StageId::Density, || panic!("boom")).await;
        assert!(matches!(result, Err(TerrainError::Worker(_))));
    }
}
