/// Content type for an HLS artifact by filename.
pub fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".m3u8") {
        "application/vnd.apple.mpegurl"
    } else if filename.ends_with(".ts") {
        "video/MP2T"
    } else {
        "application/octet-stream"
    }
}
