//! Rendition ladder selection.
//!
//! A rung is offered when both its dimensions fit inside the source frame.
//! The 144p floor is always offered, even for sources smaller than it;
//! callers accept upscaling at the floor.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
}

impl Rendition {
    /// ffmpeg scale filter argument, `W:H`.
    pub fn scale(&self) -> String {
        format!("{}:{}", self.width, self.height)
    }

    /// Media playlist filename for this rendition of the given video.
    pub fn playlist_name(&self, uuid: Uuid) -> String {
        format!("{}p-{}.m3u8", self.height, uuid)
    }
}

/// Fixed ladder, descending.
pub const FIXED_LADDER: [Rendition; 7] = [
    Rendition { width: 3840, height: 2160 },
    Rendition { width: 2560, height: 1440 },
    Rendition { width: 1920, height: 1080 },
    Rendition { width: 1280, height: 720 },
    Rendition { width: 854, height: 480 },
    Rendition { width: 640, height: 360 },
    Rendition { width: 426, height: 240 },
];

/// Unconditional floor rung.
pub const FLOOR: Rendition = Rendition { width: 256, height: 144 };

/// Select the renditions to produce for a source of the given dimensions.
pub fn build_ladder(source_width: u32, source_height: u32) -> Vec<Rendition> {
    let mut ladder: Vec<Rendition> = FIXED_LADDER
        .iter()
        .copied()
        .filter(|r| r.width <= source_width && r.height <= source_height)
        .collect();
    ladder.push(FLOOR);
    ladder
}

/// Advertised bandwidth for a rendition height, for `#EXT-X-STREAM-INF`.
pub fn bandwidth_for_height(height: u32) -> u32 {
    match height {
        144 => 500_000,
        240 => 750_000,
        360 => 1_000_000,
        480 => 1_500_000,
        720 => 2_500_000,
        1080 => 5_000_000,
        1440 => 8_000_000,
        2160 => 16_000_000,
        _ => 500_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(ladder: &[Rendition]) -> Vec<u32> {
        ladder.iter().map(|r| r.height).collect()
    }

    #[test]
    fn tiny_source_gets_only_the_floor() {
        assert_eq!(build_ladder(200, 200), vec![FLOOR]);
    }

    #[test]
    fn uhd_source_gets_all_rungs_plus_floor() {
        let ladder = build_ladder(3840, 2160);
        assert_eq!(ladder.len(), 8);
        assert_eq!(heights(&ladder), vec![2160, 1440, 1080, 720, 480, 360, 240, 144]);
    }

    #[test]
    fn hd_source_gets_rungs_within_its_box() {
        let ladder = build_ladder(1280, 720);
        assert_eq!(heights(&ladder), vec![720, 480, 360, 240, 144]);
    }

    #[test]
    fn both_dimensions_must_fit() {
        // Tall enough for 720p but too narrow.
        let ladder = build_ladder(1000, 720);
        assert_eq!(heights(&ladder), vec![480, 360, 240, 144]);
    }

    #[test]
    fn floor_is_never_duplicated() {
        let ladder = build_ladder(256, 144);
        assert_eq!(ladder, vec![FLOOR]);
    }

    #[test]
    fn bandwidth_table_matches_heights() {
        assert_eq!(bandwidth_for_height(144), 500_000);
        assert_eq!(bandwidth_for_height(240), 750_000);
        assert_eq!(bandwidth_for_height(360), 1_000_000);
        assert_eq!(bandwidth_for_height(480), 1_500_000);
        assert_eq!(bandwidth_for_height(720), 2_500_000);
        assert_eq!(bandwidth_for_height(1080), 5_000_000);
        assert_eq!(bandwidth_for_height(1440), 8_000_000);
        assert_eq!(bandwidth_for_height(2160), 16_000_000);
    }

    #[test]
    fn unknown_heights_fall_back_to_the_floor_bandwidth() {
        assert_eq!(bandwidth_for_height(333), 500_000);
    }

    #[test]
    fn playlist_name_includes_height_and_uuid() {
        let uuid: Uuid = "11111111-1111-4111-8111-111111111111".parse().unwrap();
        assert_eq!(
            FLOOR.playlist_name(uuid),
            "144p-11111111-1111-4111-8111-111111111111.m3u8"
        );
    }
}
