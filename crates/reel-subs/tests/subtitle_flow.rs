//! End-to-end parsing of a master playlist, its subtitle media playlist and
//! the concatenated WebVTT segments, without any network access.

use reel_subs::{find_active_cue, find_track, parse_hls_subtitle_tracks, parse_segment_uris, parse_vtt};

const MASTER_URL: &str = "https://media.example.com/listings/981/master.m3u8";

const MASTER: &str = r#"#EXTM3U
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="en",NAME="English",DEFAULT=YES,URI="subs/en/index.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="ar",NAME="العربية",URI="subs/ar/index.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=1080x1920,SUBTITLES="subs"
1080p/index.m3u8
"#;

const SUB_PLAYLIST: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:30\n#EXTINF:30.0,\nseg0.vtt\n#EXTINF:30.0,\nseg1.vtt\n#EXT-X-ENDLIST\n";

const SEG0: &str = "WEBVTT\nX-TIMESTAMP-MAP=MPEGTS:900000,LOCAL:00:00:00.000\n\n00:00:00.500 --> 00:00:04.000\nMarina view\n";
const SEG1: &str = "WEBVTT\n\n00:00:30.000 --> 00:00:33.000\nThree bedrooms\n";

#[test]
fn test_language_switch_resolves_independent_tracks() {
    let tracks = parse_hls_subtitle_tracks(MASTER, MASTER_URL);
    assert_eq!(tracks.len(), 2);

    let en = find_track(&tracks, "en").expect("english track");
    let ar = find_track(&tracks, "AR").expect("arabic track");
    assert_eq!(en.uri, "https://media.example.com/listings/981/subs/en/index.m3u8");
    assert_eq!(ar.uri, "https://media.example.com/listings/981/subs/ar/index.m3u8");
    assert!(find_track(&tracks, "de").is_none());
}

#[test]
fn test_flattened_segments_parse_as_one_document() {
    let tracks = parse_hls_subtitle_tracks(MASTER, MASTER_URL);
    let en = find_track(&tracks, "en").expect("english track");

    let segments = parse_segment_uris(SUB_PLAYLIST, &en.uri);
    assert_eq!(
        segments,
        vec![
            "https://media.example.com/listings/981/subs/en/seg0.vtt",
            "https://media.example.com/listings/981/subs/en/seg1.vtt",
        ]
    );

    let flattened = [SEG0, SEG1].join("\n\n");
    let cues = parse_vtt(&flattened);

    assert_eq!(cues.len(), 2);
    assert_eq!(find_active_cue(&cues, 1.0), "Marina view");
    assert_eq!(find_active_cue(&cues, 31.0), "Three bedrooms");
    assert_eq!(find_active_cue(&cues, 10.0), "");
}
