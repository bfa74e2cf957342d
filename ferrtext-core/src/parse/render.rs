use std::{io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use pdfium_render::prelude::{PdfPage, PdfRenderConfig};
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    error::{FerrtextError, ImageWriteSnafu, PdfiumSnafu},
    layout::{
        column::ColumnClassifier,
        config::LayoutConfig,
        word::{PageWords, Word},
    },
};

const LEFT_COLOR: Rgb<u8> = Rgb([0, 90, 255]);
const RIGHT_COLOR: Rgb<u8> = Rgb([230, 30, 30]);
const SINGLE_COLOR: Rgb<u8> = Rgb([20, 170, 60]);
const MIDLINE_COLOR: Rgb<u8> = Rgb([120, 120, 120]);
const DEAD_ZONE_COLOR: Rgb<u8> = Rgb([255, 170, 0]);

/// Renders a page with every page-space unit mapped to `scale` pixels.
pub fn render_page(page: &PdfPage<'_>, scale: f32) -> Result<DynamicImage, FerrtextError> {
    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

    page.render_with_config(&render_config)
        .context(PdfiumSnafu { stage: "render" })
        .map(|bitmap| bitmap.as_image())
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, FerrtextError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context(ImageWriteSnafu { path: "<memory>" })?;
    Ok(buffer.into_inner())
}

/// Draws the column decision for one page on top of its rendering.
///
/// Words are outlined blue (left) and red (right) on a two-column page, green
/// otherwise. The midline and both dead-zone borders are drawn as vertical lines.
pub fn draw_columns(
    image: &DynamicImage,
    page: &PageWords,
    config: &LayoutConfig,
    scale: f32,
) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let classifier = ColumnClassifier::new(config);
    let (split, has_columns) = classifier.classify(&page.words, page.width);

    let (left_color, right_color) = if has_columns {
        (LEFT_COLOR, RIGHT_COLOR)
    } else {
        (SINGLE_COLOR, SINGLE_COLOR)
    };
    for word in &split.left {
        outline(&mut canvas, word, scale, left_color);
    }
    for word in &split.right {
        outline(&mut canvas, word, scale, right_color);
    }

    let (mid_x, gap_left, gap_right) = classifier.boundaries(page.width);
    let bottom = canvas.height() as f32;
    for (x, color) in [
        (mid_x, MIDLINE_COLOR),
        (gap_left, DEAD_ZONE_COLOR),
        (gap_right, DEAD_ZONE_COLOR),
    ] {
        let x = x * scale;
        draw_line_segment_mut(&mut canvas, (x, 0.0), (x, bottom), color);
    }

    canvas
}

fn outline(canvas: &mut RgbImage, word: &Word, scale: f32, color: Rgb<u8>) {
    let limit = glam::Vec2::new(canvas.width() as f32 - 1.0, canvas.height() as f32 - 1.0);
    let bbox: Bbox = word.bbox.scale(scale).clamp(glam::Vec2::ZERO, limit);
    let width = bbox.width().max(1.0) as u32;
    let height = bbox.height().max(1.0) as u32;
    let rect = Rect::at(bbox.min.x as i32, bbox.min.y as i32).of_size(width, height);
    draw_hollow_rect_mut(canvas, rect, color);
}

/// Renders, annotates and writes `page-<n>.png` into `dir`.
#[tracing::instrument(skip_all, fields(page = page_words.page_number))]
pub fn write_debug_page(
    page: &PdfPage<'_>,
    page_words: &PageWords,
    config: &LayoutConfig,
    scale: f32,
    dir: &Path,
) -> Result<(), FerrtextError> {
    let image = render_page(page, scale)?;
    let canvas = draw_columns(&image, page_words, config, scale);

    let output = dir.join(format!("page-{}.png", page_words.page_number));
    canvas.save(&output).context(ImageWriteSnafu {
        path: output.to_string_lossy(),
    })?;
    debug!("wrote column overlay to {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    fn two_column_page() -> PageWords {
        let mut words = Vec::new();
        for i in 0..3 {
            let top = 20.0 + i as f32 * 15.0;
            words.push(Word::new(format!("l{i}"), Bbox::from_edges(10.0, top, 40.0, top + 10.0)));
            words.push(Word::new(format!("r{i}"), Bbox::from_edges(120.0, top, 150.0, top + 10.0)));
        }
        PageWords::new(1, 200.0, 100.0, words)
    }

    #[test]
    fn test_draw_columns_colors_by_side() {
        let config = LayoutConfig {
            min_words_per_column: 1,
            ..LayoutConfig::default()
        };
        let canvas = draw_columns(&blank(200, 100), &two_column_page(), &config, 1.0);

        assert_eq!(canvas.dimensions(), (200, 100));
        assert_eq!(*canvas.get_pixel(10, 20), LEFT_COLOR);
        assert_eq!(*canvas.get_pixel(120, 20), RIGHT_COLOR);
        assert_eq!(*canvas.get_pixel(100, 5), MIDLINE_COLOR);
        assert_eq!(*canvas.get_pixel(70, 5), DEAD_ZONE_COLOR);
    }

    #[test]
    fn test_draw_single_column_in_one_color() {
        let canvas = draw_columns(&blank(200, 100), &two_column_page(), &LayoutConfig::default(), 1.0);
        assert_eq!(*canvas.get_pixel(10, 20), SINGLE_COLOR);
        assert_eq!(*canvas.get_pixel(120, 20), SINGLE_COLOR);
    }

    #[test]
    fn test_draw_scales_word_boxes() {
        let config = LayoutConfig {
            min_words_per_column: 1,
            ..LayoutConfig::default()
        };
        let canvas = draw_columns(&blank(400, 200), &two_column_page(), &config, 2.0);
        assert_eq!(*canvas.get_pixel(20, 40), LEFT_COLOR);
        assert_eq!(*canvas.get_pixel(240, 40), RIGHT_COLOR);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&blank(4, 4)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
