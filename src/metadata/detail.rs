//! Mesh detail-level selection.
//!
//! A higher detail number means coarser geometry and less data to fetch.

use super::{DetailLevel, SegmentId};
use crate::error::VolsegError;

/// Pick the coarsest available level that is not coarser than `preferred`.
///
/// With `preferred == None` this is the coarsest level overall. An empty
/// candidate set is an error, never a clamped sentinel.
pub fn sufficient_detail(
    segment: SegmentId,
    available: &[DetailLevel],
    preferred: Option<DetailLevel>,
) -> Result<DetailLevel, VolsegError> {
    available
        .iter()
        .copied()
        .filter(|&d| preferred.is_none_or(|p| d <= p))
        .max()
        .ok_or(VolsegError::NoDetailAvailable { segment, preferred })
}

/// Like [`sufficient_detail`], but falls back to the coarsest level overall
/// when the preference is finer than anything available.
pub fn sufficient_detail_or_coarsest(
    segment: SegmentId,
    available: &[DetailLevel],
    preferred: Option<DetailLevel>,
) -> Result<DetailLevel, VolsegError> {
    match sufficient_detail(segment, available, preferred) {
        Err(VolsegError::NoDetailAvailable {
            preferred: Some(p), ..
        }) => {
            log::warn!(
                "segment {segment}: no detail level <= {p}, using coarsest"
            );
            sufficient_detail(segment, available, None)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [DetailLevel; 3] = [1, 2, 4];

    #[test]
    fn respects_preference() {
        assert_eq!(sufficient_detail(0, &LEVELS, Some(3)).unwrap(), 2);
        assert_eq!(sufficient_detail(0, &LEVELS, Some(4)).unwrap(), 4);
        assert_eq!(sufficient_detail(0, &LEVELS, Some(1)).unwrap(), 1);
    }

    #[test]
    fn no_preference_is_coarsest() {
        assert_eq!(sufficient_detail(0, &LEVELS, None).unwrap(), 4);
    }

    #[test]
    fn finer_than_available_fails() {
        assert!(matches!(
            sufficient_detail(9, &LEVELS, Some(0)),
            Err(VolsegError::NoDetailAvailable {
                segment: 9,
                preferred: Some(0)
            })
        ));
    }

    #[test]
    fn nothing_available_fails_even_without_preference() {
        assert!(matches!(
            sufficient_detail(9, &[], None),
            Err(VolsegError::NoDetailAvailable { preferred: None, .. })
        ));
        assert!(sufficient_detail_or_coarsest(9, &[], Some(3)).is_err());
    }

    #[test]
    fn fallback_uses_coarsest() {
        assert_eq!(sufficient_detail_or_coarsest(0, &LEVELS, Some(0)).unwrap(), 4);
        assert_eq!(sufficient_detail_or_coarsest(0, &LEVELS, Some(3)).unwrap(), 2);
    }
}
