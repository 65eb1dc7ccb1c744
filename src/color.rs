use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::schema::{Dimension, Gender, SegmentKey};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` visually distinct colours with evenly spaced hues, starting at
/// `hue_offset` degrees.
pub fn generate_palette(n: usize, hue_offset: f32, lightness: f32) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = hue_offset + (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.70, lightness).into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Segment colours
// ---------------------------------------------------------------------------

/// Colours for the values of one dimension. In the gender × category view
/// the category picks the hue and the gender the shade, so the two genders
/// of a category sit next to each other visually.
#[derive(Debug, Clone)]
pub struct SegmentColors {
    mapping: BTreeMap<SegmentKey, Color32>,
    default_color: Color32,
}

impl SegmentColors {
    pub fn new(dimension: Dimension) -> Self {
        let segments = dimension.segments();
        let mapping = match dimension {
            Dimension::GenderCategory => {
                let males = generate_palette(segments.len() / 2, 200.0, 0.40);
                let females = generate_palette(segments.len() / 2, 200.0, 0.65);
                let mut male_iter = males.into_iter();
                let mut female_iter = females.into_iter();
                segments
                    .iter()
                    .filter_map(|(key, _)| {
                        let color = match key.gender {
                            Some(Gender::Female) => female_iter.next(),
                            _ => male_iter.next(),
                        }?;
                        Some((*key, color))
                    })
                    .collect()
            }
            _ => segments
                .iter()
                .map(|(key, _)| *key)
                .zip(generate_palette(segments.len(), 200.0, 0.55))
                .collect(),
        };
        Self {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, segment: &SegmentKey) -> Color32 {
        self.mapping
            .get(segment)
            .copied()
            .unwrap_or(self.default_color)
    }
}

/// Colour of a compared town by slot position.
pub fn town_color(slot: usize) -> Color32 {
    const TOWN_COLORS: usize = 3;
    generate_palette(TOWN_COLORS, 20.0, 0.50)
        .get(slot % TOWN_COLORS)
        .copied()
        .unwrap_or(Color32::LIGHT_BLUE)
}

/// Map marker colour on a blue → red ramp for `t` in `[0, 1]`.
pub fn salary_ramp(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let rgb: Srgb = Hsl::new(230.0 - 230.0 * t, 0.75, 0.50).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::Category;

    #[test]
    fn palette_has_requested_size() {
        assert_eq!(generate_palette(5, 0.0, 0.5).len(), 5);
        assert!(generate_palette(0, 0.0, 0.5).is_empty());
    }

    #[test]
    fn every_segment_has_its_own_colour() {
        for dim in Dimension::ALL {
            let colors = SegmentColors::new(dim);
            let mut seen: Vec<Color32> = dim.segments().iter().map(|(k, _)| colors.color_for(k)).collect();
            assert!(seen.iter().all(|c| *c != Color32::GRAY));
            seen.sort_by_key(|c| c.to_array());
            seen.dedup();
            assert_eq!(seen.len(), dim.segments().len(), "{dim:?}");
        }
    }

    #[test]
    fn genders_share_a_hue_per_category() {
        let colors = SegmentColors::new(Dimension::GenderCategory);
        let male = colors.color_for(&SegmentKey::gender_category(Gender::Male, Category::Worker));
        let female = colors.color_for(&SegmentKey::gender_category(Gender::Female, Category::Worker));
        assert_ne!(male, female);
        assert_eq!(colors.color_for(&SegmentKey::default()), Color32::GRAY);
    }

    #[test]
    fn ramp_ends_differ() {
        assert_ne!(salary_ramp(0.0), salary_ramp(1.0));
        assert_eq!(salary_ramp(-1.0), salary_ramp(0.0));
    }
}
