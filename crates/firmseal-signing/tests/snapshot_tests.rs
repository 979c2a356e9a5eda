//! Snapshot tests for report rendering.

use firmseal_signing::prelude::*;
use insta::assert_snapshot;

#[test]
fn test_header_checks_json() -> Result<(), serde_json::Error> {
    let checks = HeaderChecks {
        magic: true,
        version: true,
        timestamp: false,
        firmware_size: true,
        hash_algorithm: true,
        signature_algorithm: false,
        signature_size: true,
    };
    assert_snapshot!(serde_json::to_string(&checks)?, @r#"{"magic":true,"version":true,"timestamp":false,"firmware_size":true,"hash_algorithm":true,"signature_algorithm":false,"signature_size":true}"#);
    Ok(())
}

#[test]
fn test_batch_summary_json() -> Result<(), serde_json::Error> {
    let summary = BatchSummary {
        total: 4,
        passed: 3,
        failed: 1,
        success_rate: 75.0,
    };
    assert_snapshot!(serde_json::to_string(&summary)?, @r#"{"total":4,"passed":3,"failed":1,"success_rate":75.0}"#);
    Ok(())
}
