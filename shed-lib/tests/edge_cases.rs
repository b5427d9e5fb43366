//! Tests for edge cases and error handling

mod common;

use common::*;

#[test]
fn test_packet_too_short_for_kind() {
    let test_cases: Vec<(Vec<u8>, &str)> = vec![(vec![], "Empty packet"), (vec![0x28], "1 byte packet")];

    for (bytes, description) in test_cases {
        match decode_packet(&bytes) {
            Err(DecodeError::Malformed { len }) => assert_eq!(len, bytes.len(), "{}", description),
            other => panic!("{}: Expected Malformed error, got: {:?}", description, other),
        }
    }
}

#[test]
fn test_two_bytes_reach_kind_check() {
    // Two bytes are enough to pick a branch, which then reports its own minimum
    assert_eq!(
        decode_packet(&[0x02, b'E']),
        Err(DecodeError::TooShort {
            kind: "E",
            expected: 40,
            actual: 2
        })
    );
    assert_eq!(decode_packet(&[0x02, b'x']), Err(DecodeError::UnknownCommand(b'x')));
}

#[test]
fn test_minimum_lengths() {
    let info = info_packet(0, [0.0; 9]);
    let counters = counters_packet(b'C', [0; 8]);
    let persisted = persisted_packet(b'P', 0, 0, 0, 0, &[0; 8]);

    let test_cases: Vec<(&[u8], &str, usize)> = vec![
        (info.as_slice(), "E", 40),
        (counters.as_slice(), "C", 34),
        (persisted.as_slice(), "P", 24),
    ];

    for (bytes, kind, minimum) in test_cases {
        assert_eq!(bytes.len(), minimum);
        assert!(decode_packet(bytes).is_ok(), "{}: exact minimum should decode", kind);

        match decode_packet(&bytes[..minimum - 1]) {
            Err(DecodeError::TooShort {
                kind: k,
                expected,
                actual,
            }) => {
                assert_eq!(k, kind);
                assert_eq!(expected, minimum);
                assert_eq!(actual, minimum - 1);
            }
            other => panic!("{}: Expected TooShort error, got: {:?}", kind, other),
        }
    }
}

#[test]
fn test_lowercase_kinds_use_uppercase_label() {
    let counters = counters_packet(b'c', [0; 8]);
    let persisted = persisted_packet(b'p', 0, 0, 0, 0, &[0; 8]);

    assert!(matches!(
        decode_packet(&counters[..20]),
        Err(DecodeError::TooShort { kind: "C", .. })
    ));
    assert!(matches!(
        decode_packet(&persisted[..15]),
        Err(DecodeError::TooShort { kind: "P", .. })
    ));
}

#[test]
fn test_unknown_kinds() {
    for kind in [0x00u8, b'R', b'r', b'e', 0x7F, 0xFF] {
        let mut bytes = vec![0x28, kind];
        bytes.resize(64, 0);
        assert_eq!(decode_packet(&bytes), Err(DecodeError::UnknownCommand(kind)));
    }
}

#[test]
fn test_task_name_high_bit_is_cleared() {
    let bytes = persisted_packet(b'p', 0, 0, 0, 0, b"\xC1B\0\0\0\0\0\0");
    let Reading::Persisted(p) = decode_packet(&bytes).unwrap() else {
        panic!("Expected Persisted reading");
    };
    assert_eq!(p.exception_task, "AB");

    let bytes = persisted_packet(b'p', 0, 0, 0, 0, b"ab\xFFcd\0\0\0");
    let Reading::Persisted(p) = decode_packet(&bytes).unwrap() else {
        panic!("Expected Persisted reading");
    };
    assert_eq!(p.exception_task, "ab\u{7f}cd");
}

#[test]
fn test_error_messages() {
    assert_eq!(
        DecodeError::TooShort {
            kind: "E",
            expected: 40,
            actual: 12
        }
        .to_string(),
        "E packet too short: expected at least 40 bytes, got 12"
    );
    assert_eq!(DecodeError::UnknownCommand(b'x').to_string(), "Unknown command kind 0x78");
}
