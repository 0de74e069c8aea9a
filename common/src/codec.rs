//! Length-framed binary encoding for everything that crosses the wire.
//!
//! A frame is a 4-byte big-endian payload length followed by a `bincode`
//! payload. Each websocket binary message carries exactly one frame, so a
//! length that disagrees with the bytes actually received is reported rather
//! than waited on.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CodecError;

/// Upper bound on a payload. A 16x30 board snapshot is a few kilobytes.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

const HEADER_LEN: usize = 4;

pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(message)?;
    let len = payload.len();
    if len > MAX_FRAME_SIZE as usize {
        return Err(CodecError::TooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + len);
    frame.extend_from_slice(&(len as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, CodecError> {
    let Some((header, payload)) = frame.split_first_chunk::<HEADER_LEN>() else {
        return Err(CodecError::Truncated {
            expected: HEADER_LEN,
            actual: frame.len(),
        });
    };

    let len = u32::from_be_bytes(*header);
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::TooLarge {
            len: len as usize,
            max: MAX_FRAME_SIZE,
        });
    }

    let len = len as usize;
    if payload.len() < len {
        return Err(CodecError::Truncated {
            expected: len,
            actual: payload.len(),
        });
    }
    if payload.len() > len {
        return Err(CodecError::TrailingBytes(payload.len() - len));
    }

    Ok(bincode::deserialize(payload)?)
}

/// Anything sent as a single frame.
pub trait Frame: Serialize + DeserializeOwned {
    fn to_frame(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    fn from_frame(frame: &[u8]) -> Result<Self, CodecError> {
        decode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::Board,
        models::{CellState, Content, Dimensions, Phase, Point},
    };

    #[test]
    fn header_carries_payload_length() {
        let frame = encode(&Point::new(1, 2)).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - HEADER_LEN);
    }

    #[test]
    fn short_header_is_truncated() {
        let err = decode::<Point>(&[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut frame = encode(&Point::new(1, 2)).unwrap();
        frame.truncate(frame.len() - 3);
        assert!(matches!(
            decode::<Point>(&frame),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn extra_bytes_are_rejected() {
        let mut frame = encode(&Point::new(1, 2)).unwrap();
        frame.extend_from_slice(&[9, 9]);
        assert!(matches!(
            decode::<Point>(&frame),
            Err(CodecError::TrailingBytes(2))
        ));
    }

    #[test]
    fn oversized_length_is_rejected_before_reading() {
        let mut frame = (MAX_FRAME_SIZE + 1).to_be_bytes().to_vec();
        frame.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode::<Point>(&frame),
            Err(CodecError::TooLarge { .. })
        ));
    }

    #[test]
    fn garbage_payload_is_malformed() {
        // valid header, but a single byte cannot hold two u64 fields
        let frame = [0, 0, 0, 1, 0xFF];
        assert!(matches!(
            decode::<Point>(&frame),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn board_with_zero_rows_is_malformed() {
        let board = Board::from_mines(3, 3, &[Point::ORIGIN]).unwrap();
        let mut frame = encode(&board).unwrap();
        // rows is the first field, a little-endian u64
        frame[HEADER_LEN..HEADER_LEN + 8].copy_from_slice(&0u64.to_le_bytes());

        assert!(matches!(
            decode::<Board>(&frame),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn board_grids_must_match_dimensions() {
        let short = (
            Dimensions::new(2, 2),
            vec![Content::Adjacent(0); 3],
            vec![CellState::Hidden; 3],
            3usize,
            Phase::InProgress,
        );
        let frame = encode(&short).unwrap();
        assert!(matches!(
            decode::<Board>(&frame),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn board_remaining_must_match_grids() {
        let mut board = (
            Dimensions::new(2, 2),
            vec![Content::Adjacent(0); 4],
            vec![CellState::Hidden; 4],
            1usize,
            Phase::InProgress,
        );
        assert!(decode::<Board>(&encode(&board).unwrap()).is_err());

        board.3 = 4;
        let decoded = decode::<Board>(&encode(&board).unwrap()).unwrap();
        assert_eq!(decoded.remaining(), 4);
        assert_eq!(decoded.state(Point::new(1, 1)), Some(CellState::Hidden));
    }
}
