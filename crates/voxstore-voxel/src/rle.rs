//! Run-length encoding for column-sized arrays.
//!
//! Block IDs (`u16`) and packed light values (`u8`) both compress well as
//! runs: a freshly created column is a single run, terrain is a handful of
//! runs per vertical column.
//!
//! ## Byte layout
//!
//! | Size | Field |
//! |------|-------|
//! | 4 | Run count (`u32`, little-endian) |
//! | R × (2 + W) | Runs: `count: u16 LE` followed by `value` (W bytes, LE) |

/// A value that can be stored in a run.
pub trait RunValue: Copy + PartialEq {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Appends the little-endian encoding of `self`.
    fn put(self, buf: &mut Vec<u8>);

    /// Decodes a value from exactly [`Self::WIDTH`] bytes.
    fn take(bytes: &[u8]) -> Self;
}

impl RunValue for u8 {
    const WIDTH: usize = 1;

    fn put(self, buf: &mut Vec<u8>) {
        buf.push(self);
    }

    fn take(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl RunValue for u16 {
    const WIDTH: usize = 2;

    fn put(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }

    fn take(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

/// `count` consecutive occurrences of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleRun<T> {
    /// Run length (1..=65535).
    pub count: u16,
    pub value: T,
}

/// Errors that can occur while decoding runs.
#[derive(Debug, thiserror::Error)]
pub enum RleError {
    /// Decoded length does not match the expected array length.
    #[error("RLE length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected number of elements.
        expected: usize,
        /// Actual number of decoded elements.
        actual: usize,
    },
    /// The byte stream ended inside the run table.
    #[error("RLE data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Encodes `values` into runs capped at `u16::MAX` elements each.
pub fn rle_encode<T: RunValue>(values: &[T]) -> Vec<RleRun<T>> {
    let mut runs: Vec<RleRun<T>> = Vec::new();
    for &value in values {
        match runs.last_mut() {
            Some(run) if run.value == value && run.count < u16::MAX => run.count += 1,
            _ => runs.push(RleRun { count: 1, value }),
        }
    }
    runs
}

/// Expands runs back into a flat array of exactly `expected_len` elements.
pub fn rle_decode<T: RunValue>(
    runs: &[RleRun<T>],
    expected_len: usize,
) -> Result<Vec<T>, RleError> {
    let actual: usize = runs.iter().map(|run| run.count as usize).sum();
    if actual != expected_len {
        return Err(RleError::LengthMismatch {
            expected: expected_len,
            actual,
        });
    }
    let mut result = Vec::with_capacity(expected_len);
    for run in runs {
        result.extend(std::iter::repeat_n(run.value, run.count as usize));
    }
    Ok(result)
}

/// Appends the run table (count header plus runs) to `buf`.
pub fn rle_to_bytes<T: RunValue>(runs: &[RleRun<T>], buf: &mut Vec<u8>) {
    buf.reserve(4 + runs.len() * (2 + T::WIDTH));
    buf.extend_from_slice(&(runs.len() as u32).to_le_bytes());
    for run in runs {
        buf.extend_from_slice(&run.count.to_le_bytes());
        run.value.put(buf);
    }
}

/// Reads a run table from the front of `data`.
///
/// Returns the runs and the number of bytes consumed.
pub fn rle_from_bytes<T: RunValue>(data: &[u8]) -> Result<(Vec<RleRun<T>>, usize), RleError> {
    if data.len() < 4 {
        return Err(RleError::Truncated {
            expected: 4,
            actual: data.len(),
        });
    }
    let run_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let stride = 2 + T::WIDTH;
    let consumed = run_count
        .checked_mul(stride)
        .and_then(|len| len.checked_add(4))
        .unwrap_or(usize::MAX);
    if data.len() < consumed {
        return Err(RleError::Truncated {
            expected: consumed,
            actual: data.len(),
        });
    }

    let runs = data[4..consumed]
        .chunks_exact(stride)
        .map(|bytes| RleRun {
            count: u16::from_le_bytes([bytes[0], bytes[1]]),
            value: T::take(&bytes[2..]),
        })
        .collect();
    Ok((runs, consumed))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_column_single_run() {
        let values = vec![0u16; 32_768];
        let runs = rle_encode(&values);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].count, 32_768);
        assert_eq!(runs[0].value, 0);
    }

    #[test]
    fn test_runs_split_at_u16_max() {
        let values = vec![7u8; 70_000];
        let runs = rle_encode(&values);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].count, u16::MAX);
        assert_eq!(runs[1].count as usize, 70_000 - u16::MAX as usize);
        assert_eq!(rle_decode(&runs, 70_000).unwrap(), values);
    }

    #[test]
    fn test_terrain_layers_decode_exactly() {
        let mut values = Vec::with_capacity(128 * 4);
        for _ in 0..4 {
            values.extend(std::iter::repeat_n(1u16, 60));
            values.extend(std::iter::repeat_n(3u16, 4));
            values.extend(std::iter::repeat_n(0u16, 64));
        }
        let runs = rle_encode(&values);
        assert_eq!(runs.len(), 12);
        assert_eq!(rle_decode(&runs, values.len()).unwrap(), values);
    }

    #[test]
    fn test_byte_table_reports_consumed_length() {
        let runs = vec![
            RleRun { count: 100, value: 0xABu8 },
            RleRun { count: 200, value: 0x01u8 },
        ];
        let mut buf = Vec::new();
        rle_to_bytes(&runs, &mut buf);
        buf.extend_from_slice(&[9, 9, 9]);

        let (decoded, consumed) = rle_from_bytes::<u8>(&buf).unwrap();
        assert_eq!(decoded, runs);
        assert_eq!(consumed, 4 + 2 * 3);
    }

    #[test]
    fn test_truncated_table_is_rejected() {
        let runs = vec![RleRun { count: 5, value: 42u16 }];
        let mut buf = Vec::new();
        rle_to_bytes(&runs, &mut buf);
        buf.pop();
        assert!(matches!(
            rle_from_bytes::<u16>(&buf),
            Err(RleError::Truncated { expected: 8, actual: 7 })
        ));
        assert!(matches!(
            rle_from_bytes::<u16>(&[1, 0]),
            Err(RleError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let runs = vec![RleRun { count: 10, value: 0u16 }];
        assert!(matches!(
            rle_decode(&runs, 20),
            Err(RleError::LengthMismatch {
                expected: 20,
                actual: 10
            })
        ));
    }
}
