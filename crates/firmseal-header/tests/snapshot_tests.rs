//! Snapshot tests for the header summary rendering.

use firmseal_header::prelude::*;
use insta::assert_snapshot;

#[test]
fn test_summary_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut header = FirmwareHeader::new(FirmwareVersion::new(1, 2, 3, 4));
    header.timestamp = 1_700_000_000;
    header.firmware_size = 1024;
    header.signature_size = 256;
    header.crc32 = 0xCBF4_3926;
    header.set_digest(&[0xAB; 32])?;

    let json = serde_json::to_string_pretty(&header.summary())?;
    assert_snapshot!(json, @r#"
    {
      "magic": "FWSV",
      "version": "1.2.3.4",
      "timestamp": 1700000000,
      "timestamp_iso": "2023-11-14T22:13:20+00:00",
      "firmware_size": 1024,
      "hash_algorithm": "0x0001",
      "signature_algorithm": "0x0001",
      "hash": "abababababababababababababababababababababababababababababababab",
      "signature_size": 256,
      "crc32": "0xCBF43926"
    }
    "#);
    Ok(())
}
