use crate::error::DecodeError;

/// Opaque decompression primitive: one compressed frame in, one
/// fixed-size block of texture data out.
pub trait FrameCodec: Send {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), DecodeError>;
}

/// Header written at the start of every pattern frame.
pub const PATTERN_HEADER_LEN: usize = 5;

/// Build the compressed bytes of a pattern frame: the frame index, a fill
/// byte and `padding` bytes of filler.
pub fn encode_pattern_frame(index: u32, fill: u8, padding: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(PATTERN_HEADER_LEN + padding);
    frame.extend_from_slice(&index.to_le_bytes());
    frame.push(fill);
    frame.resize(PATTERN_HEADER_LEN + padding, fill);
    frame
}

/// Fill byte used for the pattern frame at `index`.
pub fn pattern_fill(index: u32) -> u8 {
    (index.wrapping_mul(37) % 251) as u8
}

/// Read the frame index stamped into decoded pattern pixels.
pub fn pattern_index(pixels: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = pixels.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Codec for pattern frames. Decoding paints the output with the frame's
/// fill byte and stamps the frame index into the first four bytes, so the
/// decoded pixels identify which frame produced them.
pub struct PatternCodec {
    frame_size: usize,
}

impl PatternCodec {
    pub fn new(frame_size: usize) -> Self {
        Self { frame_size }
    }
}

impl FrameCodec for PatternCodec {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), DecodeError> {
        if input.len() < PATTERN_HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: PATTERN_HEADER_LEN,
                actual: input.len(),
            });
        }
        if output.len() != self.frame_size {
            return Err(DecodeError::OutputSize {
                expected: self.frame_size,
                actual: output.len(),
            });
        }
        output.fill(input[4]);
        let stamp = output.len().min(4);
        output[..stamp].copy_from_slice(&input[..stamp]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_round_trip_identifies_frame() {
        let mut codec = PatternCodec::new(32);
        let frame = encode_pattern_frame(42, pattern_fill(42), 10);
        let mut out = vec![0u8; 32];
        codec.decode(&frame, &mut out).unwrap();
        assert_eq!(pattern_index(&out), Some(42));
        assert!(out[4..].iter().all(|&b| b == pattern_fill(42)));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut codec = PatternCodec::new(8);
        let mut out = vec![0u8; 8];
        let err = codec.decode(&[1, 2], &mut out).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { expected: 5, actual: 2 }));
    }

    #[test]
    fn wrong_output_size_is_rejected() {
        let mut codec = PatternCodec::new(8);
        let mut out = vec![0u8; 4];
        let frame = encode_pattern_frame(1, 1, 0);
        assert!(codec.decode(&frame, &mut out).is_err());
    }

    #[test]
    fn fill_bytes_differ_between_neighbours() {
        assert_ne!(pattern_fill(0), pattern_fill(1));
        assert_ne!(pattern_fill(9), pattern_fill(10));
    }
}
