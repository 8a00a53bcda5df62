use crate::quality::Quality;

/// Index of the strictly greatest valid quality.
///
/// Scanning in input order and replacing only on a strictly greater value
/// makes the lowest index win ties.
pub fn max_quality(qualities: &[Quality]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, quality) in qualities.iter().enumerate() {
        if let Quality::Valid(v) = *quality {
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((i, v));
            }
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_maximum() {
        let q = [Quality::Valid(0.2), Quality::Valid(0.9), Quality::Valid(0.5)];
        assert_eq!(max_quality(&q), Some(1));
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let q = [Quality::Valid(0.1), Quality::Valid(0.7), Quality::Valid(0.7)];
        assert_eq!(max_quality(&q), Some(1));
    }

    #[test]
    fn test_skips_invalid() {
        let q = [Quality::Invalid, Quality::Valid(0.0), Quality::Invalid];
        assert_eq!(max_quality(&q), Some(1));
    }

    #[test]
    fn test_all_invalid() {
        assert_eq!(max_quality(&[Quality::Invalid, Quality::Invalid]), None);
        assert_eq!(max_quality(&[]), None);
    }
}
