use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const ALPHA_THRESHOLD: u8 = 8;

/// Decoded sprite pixels, kept as flat RGBA so the state stays
/// serializable for the debug session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Sprite {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        self.rgba
            .get(idx..idx + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y)
            .map(|px| px[3] > ALPHA_THRESHOLD)
            .unwrap_or(false)
    }

    /// Bounding box of opaque pixels as (x, y, width, height). PokeAPI
    /// sprites carry wide transparent margins that would waste most of a
    /// terminal panel.
    pub fn content_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = self.width;
        let mut min_y = self.height;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut found = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_opaque(x, y) {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        if !found {
            return None;
        }
        Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }
}

pub fn decode_sprite(bytes: &[u8]) -> Result<Sprite, String> {
    let image = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Sprite {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkered(width: u32, height: u32) -> Sprite {
        let mut rgba = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let on = (x + y) % 2 == 0;
                rgba.extend_from_slice(&[200, 100, 50, if on { 255 } else { 0 }]);
            }
        }
        Sprite {
            width,
            height,
            rgba,
        }
    }

    #[test]
    fn pixel_lookup() {
        let sprite = checkered(4, 4);
        assert_eq!(sprite.pixel(0, 0), Some([200, 100, 50, 255]));
        assert_eq!(sprite.pixel(1, 0), Some([200, 100, 50, 0]));
        assert_eq!(sprite.pixel(4, 0), None);
        assert!(sprite.is_opaque(0, 0));
        assert!(!sprite.is_opaque(1, 0));
    }

    #[test]
    fn bounds_skip_transparent_margin() {
        let mut rgba = vec![0u8; 6 * 6 * 4];
        // single opaque pixel at (2, 3)
        let idx = ((3 * 6 + 2) * 4) as usize;
        rgba[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
        let sprite = Sprite {
            width: 6,
            height: 6,
            rgba,
        };
        assert_eq!(sprite.content_bounds(), Some((2, 3, 1, 1)));
    }

    #[test]
    fn fully_transparent_has_no_bounds() {
        let sprite = Sprite {
            width: 3,
            height: 3,
            rgba: vec![0u8; 3 * 3 * 4],
        };
        assert_eq!(sprite.content_bounds(), None);
    }
}
