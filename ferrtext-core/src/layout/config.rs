use clap::ValueEnum;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Tunables of the column reconstruction.
///
/// The dead-zone around the page midline spans
/// `[mid_x - left_gap_offset, mid_x + right_gap_offset]`.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub left_gap_offset: f32,
    pub right_gap_offset: f32,
    /// Both columns must hold strictly more words than this.
    pub min_words_per_column: usize,
    /// Maximum `|top - line_top|` for a word to join the open line.
    pub vertical_tolerance: f32,
    #[builder(setter(into))]
    pub page_break_marker: String,
    /// When false every page is treated as a single column.
    pub detect_columns: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Profile::default().config()
    }
}

impl LayoutConfig {
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }

    /// Builder pre-filled with a preset, so callers only set what they override.
    pub fn builder_from(profile: Profile) -> LayoutConfigBuilder {
        let preset = profile.config();
        let mut builder = LayoutConfigBuilder::default();
        builder
            .left_gap_offset(preset.left_gap_offset)
            .right_gap_offset(preset.right_gap_offset)
            .min_words_per_column(preset.min_words_per_column)
            .vertical_tolerance(preset.vertical_tolerance)
            .page_break_marker(preset.page_break_marker)
            .detect_columns(preset.detect_columns);
        builder
    }
}

impl LayoutConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(tolerance) = self.vertical_tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(format!("vertical tolerance must be positive, got {tolerance}"));
            }
        }
        for (name, offset) in [
            ("left gap offset", self.left_gap_offset),
            ("right gap offset", self.right_gap_offset),
        ] {
            if let Some(offset) = offset {
                if !offset.is_finite() || offset < 0.0 {
                    return Err(format!("{name} must be a non-negative number, got {offset}"));
                }
            }
        }
        Ok(())
    }
}

/// Named presets of [`LayoutConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Wide dead-zone biased to the left column, small word quorum.
    #[default]
    Loose,
    /// Narrow dead-zone, large word quorum, explicit form-feed page break.
    Conservative,
    /// Never splits a page into columns.
    SingleColumn,
}

impl Profile {
    pub fn config(self) -> LayoutConfig {
        match self {
            Profile::Loose => LayoutConfig {
                left_gap_offset: LEFT_GAP_OFFSET,
                right_gap_offset: RIGHT_GAP_OFFSET,
                min_words_per_column: MIN_WORDS_PER_COLUMN,
                vertical_tolerance: VERTICAL_TOLERANCE,
                page_break_marker: PAGE_BREAK_MARKER.to_string(),
                detect_columns: true,
            },
            Profile::Conservative => LayoutConfig {
                left_gap_offset: CONSERVATIVE_GAP_OFFSET,
                right_gap_offset: CONSERVATIVE_GAP_OFFSET,
                min_words_per_column: CONSERVATIVE_MIN_WORDS_PER_COLUMN,
                vertical_tolerance: CONSERVATIVE_VERTICAL_TOLERANCE,
                page_break_marker: CONSERVATIVE_PAGE_BREAK_MARKER.to_string(),
                detect_columns: true,
            },
            Profile::SingleColumn => LayoutConfig {
                left_gap_offset: 0.0,
                right_gap_offset: 0.0,
                min_words_per_column: usize::MAX,
                vertical_tolerance: CONSERVATIVE_VERTICAL_TOLERANCE,
                page_break_marker: PAGE_BREAK_MARKER.to_string(),
                detect_columns: false,
            },
        }
    }
}
