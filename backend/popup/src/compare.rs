use async_trait::async_trait;
use tracing::info;

use miru_core::{CompareError, ComparisonEngine, ComparisonReport, FrameReference};

/// Placeholder engine behind the popup's Compare button.
pub struct UnimplementedComparison;

#[async_trait]
impl ComparisonEngine for UnimplementedComparison {
    fn name(&self) -> &str {
        "unimplemented"
    }

    async fn compare(
        &self,
        _image_data_url: &str,
        frame: &FrameReference,
    ) -> Result<ComparisonReport, CompareError> {
        info!(frame = %frame, "Comparison requested but no engine is available");
        Err(CompareError::NotImplemented)
    }
}
