//! Decoding of governance markers from a transaction's data output.

use std::fmt;

use tessera_types::OpReturnType;

/// A structurally valid marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMarker {
    pub op_return_type: OpReturnType,
    pub version: u8,
    /// Only present on lockup markers.
    pub lock_time: Option<u16>,
    pub data: Vec<u8>,
}

/// Why a data output was not accepted as a marker. The transaction is then
/// treated as ordinary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerRejection {
    Empty,
    UnknownCode(u8),
    BadLength {
        op_return_type: OpReturnType,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for MarkerRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty marker"),
            Self::UnknownCode(code) => write!(f, "unknown marker code 0x{code:02x}"),
            Self::BadLength {
                op_return_type,
                expected,
                actual,
            } => write!(
                f,
                "{op_return_type:?} marker has {actual} bytes, expected {expected}"
            ),
        }
    }
}

/// Decode `data` as a marker: type code, version, then a payload of the
/// fixed length for that type.
pub fn parse_marker(data: &[u8]) -> Result<ParsedMarker, MarkerRejection> {
    let (&code, _) = data.split_first().ok_or(MarkerRejection::Empty)?;
    let op_return_type = OpReturnType::from_code(code).ok_or(MarkerRejection::UnknownCode(code))?;
    let expected = op_return_type.expected_len();
    if data.len() != expected {
        return Err(MarkerRejection::BadLength {
            op_return_type,
            expected,
            actual: data.len(),
        });
    }
    // Lockup payload: reason byte, then the lock time big-endian.
    let lock_time =
        (op_return_type == OpReturnType::Lockup).then(|| u16::from_be_bytes([data[3], data[4]]));
    Ok(ParsedMarker {
        op_return_type,
        version: data[1],
        lock_time,
        data: data.to_vec(),
    })
}

/// Build marker bytes. Used by tests and tooling that script chains.
pub fn encode_marker(op_return_type: OpReturnType, version: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + payload.len());
    out.push(op_return_type.code());
    out.push(version);
    out.extend_from_slice(payload);
    out
}

/// Build a lockup marker for `lock_time` blocks.
pub fn encode_lockup(lock_time: u16, reason: u8, hash: [u8; 20]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(23);
    payload.push(reason);
    payload.extend_from_slice(&lock_time.to_be_bytes());
    payload.extend_from_slice(&hash);
    encode_marker(OpReturnType::Lockup, 1, &payload)
}
