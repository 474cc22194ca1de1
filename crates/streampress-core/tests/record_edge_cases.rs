//! Edge-case tests for the record wire format and divisibility flags.

use bytes::{Buf, BufMut, BytesMut};
use streampress_core::{Error, Record, RecordFlag, RECORD_LEN};

// ---------------------------------------------------------------
// Flag classification across the counter sequence
// ---------------------------------------------------------------

#[test]
fn flags_follow_divisibility_over_first_hundred_values() {
    for value in 0u64..100 {
        let by_three = value % 3 == 0;
        let by_five = value % 5 == 0;
        let expected = match (by_three, by_five) {
            (false, false) => RecordFlag::None,
            (true, false) => RecordFlag::ByThree,
            (false, true) => RecordFlag::ByFive,
            (true, true) => RecordFlag::ByBoth,
        };
        assert_eq!(
            RecordFlag::classify(value),
            expected,
            "failed for value {value}"
        );
    }
}

#[test]
fn flag_period_is_fifteen() {
    // The flag sequence repeats with period 15
    for value in 0u64..1000 {
        assert_eq!(
            RecordFlag::classify(value),
            RecordFlag::classify(value + 15),
            "failed for value {value}"
        );
    }
}

#[test]
fn flags_near_u64_boundary() {
    // u64::MAX = 3 * 5 * 17 * 257 * 641 * 65537 * 6700417
    assert_eq!(RecordFlag::classify(u64::MAX), RecordFlag::ByBoth);
    assert_eq!(RecordFlag::classify(u64::MAX - 1), RecordFlag::None);
    assert_eq!(RecordFlag::classify(u64::MAX - 3), RecordFlag::ByThree);
    assert_eq!(RecordFlag::classify(u64::MAX - 5), RecordFlag::ByFive);
}

// ---------------------------------------------------------------
// Wire format: exact byte layout
// ---------------------------------------------------------------

#[test]
fn record_is_always_nine_bytes() {
    for value in [0u64, 1, 255, 256, u32::MAX as u64, u64::MAX] {
        let mut buf = BytesMut::new();
        Record::new(value).encode_into(&mut buf);
        assert_eq!(buf.len(), RECORD_LEN, "failed for value {value}");
    }
}

#[test]
fn flag_byte_leads_value_bytes() {
    let mut buf = BytesMut::new();
    Record::new(5).encode_into(&mut buf);
    assert_eq!(buf[0], 0x02);
    assert_eq!(&buf[1..], &[5, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn value_bytes_are_little_endian() {
    let mut buf = BytesMut::new();
    Record::new(1).encode_into(&mut buf);
    assert_eq!(buf[1], 0x01, "LSB must come first");
    assert_eq!(buf[8], 0x00, "MSB must come last");
}

// ---------------------------------------------------------------
// Decoding a contiguous stream of records
// ---------------------------------------------------------------

#[test]
fn stream_of_records_decodes_in_order() {
    let mut buf = BytesMut::new();
    for value in 0u64..500 {
        Record::new(value).encode_into(&mut buf);
    }
    assert_eq!(buf.len(), 500 * RECORD_LEN);

    let mut cursor = buf.freeze();
    for value in 0u64..500 {
        let record = Record::decode(&mut cursor).expect("decode failed");
        assert_eq!(record.value, value);
        assert_eq!(record.flag, RecordFlag::classify(value));
    }
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn decode_reports_truncation_mid_stream() {
    let mut buf = BytesMut::new();
    Record::new(0).encode_into(&mut buf);
    Record::new(1).encode_into(&mut buf);
    buf.truncate(RECORD_LEN + 4); // cut the second record short

    let mut cursor = buf.freeze();
    Record::decode(&mut cursor).expect("first record should decode");
    let err = Record::decode(&mut cursor).unwrap_err();
    assert!(matches!(
        err,
        Error::TruncatedRecord {
            needed: RECORD_LEN,
            available: 4
        }
    ));
}

#[test]
fn decode_rejects_corrupt_flag_without_advancing_past_record() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x7f);
    buf.put_u64_le(21);

    let err = Record::decode(&mut buf.freeze()).unwrap_err();
    assert!(matches!(err, Error::InvalidFlag(0x7f)));
}

// ---------------------------------------------------------------
// Re-encoding stability
// ---------------------------------------------------------------

#[test]
fn decode_then_encode_reproduces_bytes() {
    let mut original = BytesMut::new();
    for value in [0u64, 3, 5, 15, 16, 299_999, u64::MAX] {
        Record::new(value).encode_into(&mut original);
    }
    let original = original.freeze();

    let mut cursor = original.clone();
    let mut reencoded = BytesMut::new();
    while cursor.has_remaining() {
        let record = Record::decode(&mut cursor).expect("decode failed");
        record.encode_into(&mut reencoded);
    }

    assert_eq!(&reencoded[..], &original[..]);
}
