#![no_main]

use bytes::{Bytes, BytesMut};
use libfuzzer_sys::fuzz_target;
use streampress_core::{Record, RecordFlag, RECORD_LEN};

fuzz_target!(|data: &[u8]| {
    // Fuzz the wire decoder. Tests handling of:
    // - Truncated records
    // - Invalid flag bytes
    // - Arbitrary byte soup that happens to decode

    let mut offset = 0;
    let mut buf = Bytes::copy_from_slice(data);
    while let Ok(record) = Record::decode(&mut buf) {
        // Whatever decodes must re-encode to the exact bytes consumed.
        let mut wire = BytesMut::with_capacity(RECORD_LEN);
        record.encode_into(&mut wire);
        assert_eq!(&wire[..], &data[offset..offset + RECORD_LEN]);
        offset += RECORD_LEN;

        let mut round = wire.freeze();
        assert_eq!(Record::decode(&mut round).unwrap(), record);
    }

    // Freshly built records always satisfy the classification rule.
    if data.len() >= 8 {
        let value = u64::from_le_bytes(data[..8].try_into().unwrap());
        let record = Record::new(value);
        assert_eq!(record.flag, RecordFlag::classify(value));
        assert_eq!(
            record.flag as u8 & 0x01 != 0,
            value % 3 == 0,
            "three-bit wrong for {value}"
        );
        assert_eq!(
            record.flag as u8 & 0x02 != 0,
            value % 5 == 0,
            "five-bit wrong for {value}"
        );
    }
});
