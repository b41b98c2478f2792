//! PCM wire codec: f32 samples ↔ 16-bit little-endian PCM ↔ base64.

use crate::error::{FluentFlowError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode float samples as base64 16-bit little-endian PCM.
///
/// Samples are clamped to [-1.0, 1.0] and scaled by 32768 with saturation,
/// so 1.0 maps to 32767 and -1.0 to -32768.
pub fn encode_pcm(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32768.0).clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    STANDARD.encode(&bytes)
}

/// Decode base64 16-bit little-endian PCM into float samples in [-1.0, 1.0).
///
/// # Errors
/// Returns `FluentFlowError::Decode` for invalid base64 or an odd byte count.
pub fn decode_pcm(data: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| FluentFlowError::Decode {
            message: format!("invalid base64: {}", e),
        })?;

    if bytes.len() % 2 != 0 {
        return Err(FluentFlowError::Decode {
            message: format!("odd PCM byte count: {}", bytes.len()),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_reference_samples() {
        let encoded = encode_pcm(&[0.0, 1.0, -1.0]);
        let decoded = decode_pcm(&encoded).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], 0.0);
        assert_eq!(decoded[1], 32767.0 / 32768.0);
        assert_eq!(decoded[2], -1.0);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let encoded = encode_pcm(&[2.0, -3.5]);
        let decoded = decode_pcm(&encoded).unwrap();

        assert_eq!(decoded[0], 32767.0 / 32768.0);
        assert_eq!(decoded[1], -1.0);
    }

    #[test]
    fn test_encode_empty_is_empty_string() {
        assert_eq!(encode_pcm(&[]), "");
        assert_eq!(decode_pcm("").unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn test_encode_is_little_endian() {
        // 0.5 * 32768 = 16384 = 0x4000 → bytes [0x00, 0x40]
        let encoded = encode_pcm(&[0.5]);
        let bytes = STANDARD.decode(&encoded).unwrap();
        assert_eq!(bytes, vec![0x00, 0x40]);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode_pcm("not valid base64!!!");
        match result {
            Err(FluentFlowError::Decode { message }) => {
                assert!(message.contains("base64"));
            }
            other => panic!("expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_odd_byte_count() {
        let odd = STANDARD.encode([0x01, 0x02, 0x03]);
        let result = decode_pcm(&odd);
        match result {
            Err(FluentFlowError::Decode { message }) => {
                assert!(message.contains("odd"));
            }
            other => panic!("expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_is_soft() {
        let err = decode_pcm("!!!").unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_roundtrip_preserves_waveform_shape() {
        let samples: Vec<f32> = (0..256)
            .map(|i| (i as f32 / 256.0 * std::f32::consts::TAU).sin() * 0.8)
            .collect();

        let decoded = decode_pcm(&encode_pcm(&samples)).unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (original, roundtripped) in samples.iter().zip(&decoded) {
            // Quantization to 16 bits loses at most one step
            assert!((original - roundtripped).abs() < 1.0 / 32768.0);
        }
    }
}
