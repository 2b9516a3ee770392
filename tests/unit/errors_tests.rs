/*!
 * Tests for error types and conversions
 */

use std::time::Duration;
use submine::errors::{AppError, BridgeError, CaptureError, ExportError, MiningError};

#[test]
fn test_bridgeError_display_shouldDescribeTimeout() {
    let error = BridgeError::BindTimeout(Duration::from_secs(10));
    assert_eq!(error.to_string(), "Timed out after 10s waiting for frame to be ready");
}

#[test]
fn test_miningError_from_shouldWrapEachStage() {
    let capture: MiningError = CaptureError::Screenshot("no frame".to_string()).into();
    assert!(matches!(capture, MiningError::Capture(_)));
    assert!(capture.to_string().contains("no frame"));

    let export: MiningError = ExportError::Unavailable("offline".to_string()).into();
    assert!(matches!(export, MiningError::Export(_)));

    let bridge: MiningError = BridgeError::NotReady.into();
    assert!(matches!(bridge, MiningError::Bridge(BridgeError::NotReady)));
}

#[test]
fn test_appError_from_shouldConvertLibraryAndStdErrors() {
    let mining: AppError = MiningError::Busy.into();
    assert!(matches!(mining, AppError::Mining(MiningError::Busy)));

    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(io, AppError::File(_)));

    let other: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(other.to_string(), "Unknown error: boom");
}
