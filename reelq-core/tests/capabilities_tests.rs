// reelq-core/tests/capabilities_tests.rs

use reelq_core::capabilities::parse_codec_listing;
use reelq_core::EncoderCapabilities;

const ENCODERS: &str = "Encoders:
 V..... = Video
 A..... = Audio
 S..... = Subtitle
 .F.... = Frame-level multithreading
 ..S... = Slice-level multithreading
 ...X.. = Codec is experimental
 ....B. = Supports draw_horiz_band
 .....D = Supports direct rendering method 1
 ------
 V....D a64multi             Multicolor charset for Commodore 64 (codec a64_multi)
 V..... libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
 S..... srt                  SubRip subtitle
";

const DECODERS: &str = "Decoders:
 V..... = Video
 ------
 VFS..D h264                 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10
 V....D prores               Apple ProRes (iCodec Pro)
";

#[test]
fn test_listing_rows_only() {
    let names = parse_codec_listing(ENCODERS);
    assert_eq!(names.len(), 5);
    assert!(names.contains("libx264"));
    assert!(names.contains("srt"));
    assert!(!names.contains("="));
}

#[test]
fn test_capabilities_from_listings() {
    let caps = EncoderCapabilities::from_listings(ENCODERS, DECODERS);
    assert!(caps.has_encoder("h264_nvenc"));
    assert!(caps.has_decoder("prores"));
    assert!(!caps.has_decoder("libx264"));
    assert_eq!(caps.decoders().collect::<Vec<_>>(), vec!["h264", "prores"]);
}
