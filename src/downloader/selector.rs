// Variant selection - deterministic choice of the stream(s) to fetch
//
// Order of preference for video requests:
// - progressive variant at the exact container + resolution (no merge needed)
// - video-only at exact container + resolution, paired with best audio
// - video-only at exact resolution in any container, paired with best audio
// - highest-resolution video-only available, paired with best audio
//
// Audio requests never pair: best bitrate within the requested container,
// falling back to best bitrate overall.

use super::models::{DownloadRequest, MediaKind, StreamKind, VariantDescriptor};

/// Outcome of selection over one item's catalog listing
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    /// One variant already satisfies the request
    Single(&'a VariantDescriptor),
    /// No progressive match: fetch both and merge
    Pair {
        video: &'a VariantDescriptor,
        audio: &'a VariantDescriptor,
    },
    /// Nothing of the requested kind exists, not even via fallback
    Unavailable,
}

pub struct VariantSelector;

impl VariantSelector {
    /// Pick the variant (or pair) to fetch for `request`.
    ///
    /// Total and deterministic over the listing order: equal candidates
    /// resolve to the earliest listed.
    pub fn select<'a>(
        variants: &'a [VariantDescriptor],
        request: &DownloadRequest,
    ) -> Selection<'a> {
        match request.media_kind {
            MediaKind::Video => Self::select_video(variants, request),
            MediaKind::Audio => Self::select_audio(variants, &request.container),
        }
    }

    fn select_video<'a>(
        variants: &'a [VariantDescriptor],
        request: &DownloadRequest,
    ) -> Selection<'a> {
        // Progressive first: avoids the merge step entirely
        let progressive = variants.iter().find(|v| {
            v.kind == StreamKind::Progressive
                && v.container == request.container
                && v.resolution == Some(request.resolution)
        });
        if let Some(v) = progressive {
            return Selection::Single(v);
        }

        let video = match Self::pick_video_only(variants, request) {
            Some(v) => v,
            None => return Selection::Unavailable,
        };

        // Audio side of the pair: highest bitrate, container never filtered
        match Self::best_audio(variants) {
            Some(audio) => Selection::Pair { video, audio },
            // A lone video track is not a playable result for a video request
            None => Selection::Unavailable,
        }
    }

    /// Three-tier relaxation: container+resolution, then resolution only,
    /// then best available
    fn pick_video_only<'a>(
        variants: &'a [VariantDescriptor],
        request: &DownloadRequest,
    ) -> Option<&'a VariantDescriptor> {
        let exact = variants.iter().find(|v| {
            v.kind == StreamKind::VideoOnly
                && v.container == request.container
                && v.resolution == Some(request.resolution)
        });
        if exact.is_some() {
            return exact;
        }

        let any_container = variants
            .iter()
            .find(|v| v.kind == StreamKind::VideoOnly && v.resolution == Some(request.resolution));
        if any_container.is_some() {
            return any_container;
        }

        Self::best_video_only(variants)
    }

    /// Highest resolution video-only variant; ties broken by declared byte
    /// size descending, then first-listed
    fn best_video_only(variants: &[VariantDescriptor]) -> Option<&VariantDescriptor> {
        let mut best: Option<&VariantDescriptor> = None;
        for v in variants.iter().filter(|v| v.kind == StreamKind::VideoOnly) {
            let better = match best {
                None => true,
                Some(b) => {
                    (v.resolution, v.byte_size.unwrap_or(0))
                        > (b.resolution, b.byte_size.unwrap_or(0))
                }
            };
            if better {
                best = Some(v);
            }
        }
        best
    }

    /// Highest-bitrate audio-only variant regardless of container
    fn best_audio(variants: &[VariantDescriptor]) -> Option<&VariantDescriptor> {
        let mut best: Option<&VariantDescriptor> = None;
        for v in variants.iter().filter(|v| v.kind == StreamKind::AudioOnly) {
            let better = match best {
                None => true,
                Some(b) => v.abr_kbps.unwrap_or(0) > b.abr_kbps.unwrap_or(0),
            };
            if better {
                best = Some(v);
            }
        }
        best
    }

    fn select_audio<'a>(variants: &'a [VariantDescriptor], container: &str) -> Selection<'a> {
        // Best bitrate within the requested container first
        let mut best: Option<&VariantDescriptor> = None;
        for v in variants
            .iter()
            .filter(|v| v.kind == StreamKind::AudioOnly && v.container == container)
        {
            let better = match best {
                None => true,
                Some(b) => v.abr_kbps.unwrap_or(0) > b.abr_kbps.unwrap_or(0),
            };
            if better {
                best = Some(v);
            }
        }

        match best.or_else(|| Self::best_audio(variants)) {
            Some(v) => Selection::Single(v),
            None => Selection::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::Resolution;

    fn progressive(container: &str, res: Resolution) -> VariantDescriptor {
        VariantDescriptor {
            format_id: format!("prog-{}-{}", container, res),
            kind: StreamKind::Progressive,
            container: container.to_string(),
            resolution: Some(res),
            abr_kbps: Some(96),
            byte_size: Some(40_000_000),
            url: "https://example.test/prog".to_string(),
        }
    }

    fn video_only(container: &str, res: Resolution, size: u64) -> VariantDescriptor {
        VariantDescriptor {
            format_id: format!("vo-{}-{}", container, res),
            kind: StreamKind::VideoOnly,
            container: container.to_string(),
            resolution: Some(res),
            abr_kbps: None,
            byte_size: Some(size),
            url: "https://example.test/video".to_string(),
        }
    }

    fn audio_only(container: &str, abr: u32) -> VariantDescriptor {
        VariantDescriptor {
            format_id: format!("ao-{}-{}", container, abr),
            kind: StreamKind::AudioOnly,
            container: container.to_string(),
            resolution: None,
            abr_kbps: Some(abr),
            byte_size: Some(5_000_000),
            url: "https://example.test/audio".to_string(),
        }
    }

    fn request(kind: MediaKind, container: &str, res: Resolution) -> DownloadRequest {
        DownloadRequest {
            media_kind: kind,
            container: container.to_string(),
            resolution: res,
        }
    }

    fn mixed_catalog() -> Vec<VariantDescriptor> {
        vec![
            progressive("mp4", Resolution::P720),
            video_only("webm", Resolution::P1080, 90_000_000),
            audio_only("m4a", 160),
            audio_only("mp3", 128),
        ]
    }

    #[test]
    fn exact_progressive_match_wins_over_pairing() {
        let catalog = mixed_catalog();
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P720),
        );
        match sel {
            Selection::Single(v) => {
                assert_eq!(v.kind, StreamKind::Progressive);
                assert_eq!(v.container, "mp4");
                assert_eq!(v.resolution, Some(Resolution::P720));
            }
            other => panic!("expected Single, got {:?}", other),
        }
    }

    #[test]
    fn falls_back_across_container_and_pairs_best_audio() {
        // mp4 is unavailable at 1080p; webm video-only at the same
        // resolution must be chosen, with the 160 kbps audio
        let catalog = mixed_catalog();
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P1080),
        );
        match sel {
            Selection::Pair { video, audio } => {
                assert_eq!(video.container, "webm");
                assert_eq!(video.resolution, Some(Resolution::P1080));
                assert_eq!(audio.abr_kbps, Some(160));
                assert_eq!(audio.container, "m4a");
            }
            other => panic!("expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn exact_container_beats_container_fallback() {
        let catalog = vec![
            video_only("webm", Resolution::P1080, 90_000_000),
            video_only("mp4", Resolution::P1080, 80_000_000),
            audio_only("m4a", 128),
        ];
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P1080),
        );
        match sel {
            Selection::Pair { video, .. } => assert_eq!(video.container, "mp4"),
            other => panic!("expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn quality_relaxation_drops_container_before_resolution() {
        // 1440p requested: no variant at 1440p in any container, so the
        // highest available (1080p) wins; a lower resolution in the
        // requested container must not be preferred
        let catalog = vec![
            video_only("mp4", Resolution::P480, 20_000_000),
            video_only("webm", Resolution::P1080, 90_000_000),
            audio_only("m4a", 128),
        ];
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P1440),
        );
        match sel {
            Selection::Pair { video, .. } => {
                assert_eq!(video.resolution, Some(Resolution::P1080));
                assert_eq!(video.container, "webm");
            }
            other => panic!("expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn equal_resolution_ties_break_by_size_then_listing_order() {
        let catalog = vec![
            video_only("webm", Resolution::P1080, 50_000_000),
            video_only("mkv", Resolution::P1080, 70_000_000),
            video_only("avi", Resolution::P1080, 70_000_000),
            audio_only("m4a", 128),
        ];
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P2160),
        );
        match sel {
            // mkv: bigger than webm, listed before the equal-sized avi
            Selection::Pair { video, .. } => assert_eq!(video.container, "mkv"),
            other => panic!("expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn audio_only_catalog_cannot_serve_video_requests() {
        let catalog = vec![audio_only("m4a", 160), audio_only("mp3", 128)];
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Video, "mp4", Resolution::P720),
        );
        assert_eq!(sel, Selection::Unavailable);
    }

    #[test]
    fn audio_request_prefers_requested_container() {
        let catalog = mixed_catalog();
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Audio, "mp3", Resolution::P720),
        );
        match sel {
            Selection::Single(v) => {
                assert_eq!(v.container, "mp3");
                assert_eq!(v.abr_kbps, Some(128));
            }
            other => panic!("expected Single, got {:?}", other),
        }
    }

    #[test]
    fn audio_request_falls_back_to_best_bitrate() {
        let catalog = mixed_catalog();
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Audio, "ogg", Resolution::P720),
        );
        match sel {
            Selection::Single(v) => {
                assert_eq!(v.container, "m4a");
                assert_eq!(v.abr_kbps, Some(160));
            }
            other => panic!("expected Single, got {:?}", other),
        }
    }

    #[test]
    fn video_only_catalog_cannot_serve_audio_requests() {
        let catalog = vec![video_only("mp4", Resolution::P720, 10_000_000)];
        let sel = VariantSelector::select(
            &catalog,
            &request(MediaKind::Audio, "mp3", Resolution::P720),
        );
        assert_eq!(sel, Selection::Unavailable);
    }
}
