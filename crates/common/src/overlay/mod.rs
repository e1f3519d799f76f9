//! Fraud flag overlay geometry
//!
//! The oracle reports suspicious regions as percentage bounding boxes
//! relative to the document image. This module projects those regions onto
//! a rendered viewport (pixels at a given zoom) so clients can draw
//! highlight boxes without doing coordinate math themselves. Everything in
//! here is pure geometry.

use crate::verdict::{RegionCoords, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side length of a selection corner handle, in unzoomed pixels
pub const HANDLE_SIZE: f64 = 8.0;

/// Highlight colors per severity
pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#ef4444",
        Severity::High => "#f97316",
        Severity::Medium => "#eab308",
        Severity::Low => "#3b82f6",
    }
}

/// Rendered document dimensions the overlay is projected onto
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Viewport {
    /// Rendered width in pixels at zoom 1.0
    pub width: f64,

    /// Rendered height in pixels at zoom 1.0
    pub height: f64,

    /// Zoom factor applied on top of the rendered size
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

/// Axis-aligned rectangle in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One drawable highlight box
#[derive(Debug, Clone, Serialize)]
pub struct OverlayBox {
    pub flag_id: Uuid,
    pub page_number: i32,
    pub severity: Severity,
    pub color: &'static str,
    pub rect: PixelRect,

    /// Corner handles, present only on the selected box
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handles: Option<[PixelRect; 4]>,
}

/// A flag the oracle could not localize. Clients list these alongside the
/// image instead of drawing a box.
#[derive(Debug, Clone, Serialize)]
pub struct UnlocalizedFlag {
    pub flag_id: Uuid,
    pub severity: Severity,
    pub color: &'static str,
}

/// Complete overlay for one rendered document
#[derive(Debug, Clone, Serialize)]
pub struct OverlayView {
    pub boxes: Vec<OverlayBox>,
    pub unlocalized: Vec<UnlocalizedFlag>,
}

/// Input to the overlay builder. The gateway maps stored fraud flag rows
/// into this shape.
#[derive(Debug, Clone)]
pub struct FlagGeometry {
    pub flag_id: Uuid,
    pub severity: Severity,
    pub page_number: Option<i32>,
    pub region: Option<RegionCoords>,
}

/// Project a percentage region onto the viewport, clamping to its bounds.
/// Out-of-range oracle coordinates degrade to a clipped box rather than an
/// error.
pub fn project(region: &RegionCoords, viewport: &Viewport) -> PixelRect {
    let x_pct = region.x.clamp(0.0, 100.0);
    let y_pct = region.y.clamp(0.0, 100.0);
    let w_pct = region.width.clamp(0.0, 100.0 - x_pct);
    let h_pct = region.height.clamp(0.0, 100.0 - y_pct);

    let scale_x = viewport.width.max(0.0) * viewport.zoom / 100.0;
    let scale_y = viewport.height.max(0.0) * viewport.zoom / 100.0;

    PixelRect {
        x: x_pct * scale_x,
        y: y_pct * scale_y,
        width: w_pct * scale_x,
        height: h_pct * scale_y,
    }
}

/// Corner handles for a selected box, centered on each corner
pub fn corner_handles(rect: &PixelRect, zoom: f64) -> [PixelRect; 4] {
    let size = HANDLE_SIZE * zoom;
    let half = size / 2.0;
    let corners = [
        (rect.x, rect.y),
        (rect.x + rect.width, rect.y),
        (rect.x, rect.y + rect.height),
        (rect.x + rect.width, rect.y + rect.height),
    ];
    corners.map(|(cx, cy)| PixelRect {
        x: cx - half,
        y: cy - half,
        width: size,
        height: size,
    })
}

/// Build the full overlay for one document render. Flags with a region
/// become boxes; the rest are listed as unlocalized. The selected flag, if
/// localized, gets corner handles.
pub fn build_overlay(
    flags: &[FlagGeometry],
    viewport: &Viewport,
    selected: Option<Uuid>,
) -> OverlayView {
    let mut boxes = Vec::new();
    let mut unlocalized = Vec::new();

    for flag in flags {
        match &flag.region {
            Some(region) => {
                let rect = project(region, viewport);
                let handles = (selected == Some(flag.flag_id))
                    .then(|| corner_handles(&rect, viewport.zoom));
                boxes.push(OverlayBox {
                    flag_id: flag.flag_id,
                    page_number: flag.page_number.unwrap_or(1),
                    severity: flag.severity,
                    color: severity_color(flag.severity),
                    rect,
                    handles,
                });
            }
            None => unlocalized.push(UnlocalizedFlag {
                flag_id: flag.flag_id,
                severity: flag.severity,
                color: severity_color(flag.severity),
            }),
        }
    }

    OverlayView { boxes, unlocalized }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: f64, height: f64, zoom: f64) -> Viewport {
        Viewport { width, height, zoom }
    }

    fn region(x: f64, y: f64, width: f64, height: f64) -> RegionCoords {
        RegionCoords { x, y, width, height }
    }

    fn flag(region_coords: Option<RegionCoords>, severity: Severity) -> FlagGeometry {
        FlagGeometry {
            flag_id: Uuid::new_v4(),
            severity,
            page_number: Some(1),
            region: region_coords,
        }
    }

    #[test]
    fn test_project_basic() {
        let rect = project(&region(10.0, 20.0, 30.0, 40.0), &viewport(800.0, 1000.0, 1.0));
        assert_eq!(rect.x, 80.0);
        assert_eq!(rect.y, 200.0);
        assert_eq!(rect.width, 240.0);
        assert_eq!(rect.height, 400.0);
    }

    #[test]
    fn test_project_scales_linearly_with_zoom() {
        let r = region(10.0, 10.0, 20.0, 20.0);
        let at_one = project(&r, &viewport(800.0, 1000.0, 1.0));
        let at_two = project(&r, &viewport(800.0, 1000.0, 2.0));
        assert_eq!(at_two.x, at_one.x * 2.0);
        assert_eq!(at_two.y, at_one.y * 2.0);
        assert_eq!(at_two.width, at_one.width * 2.0);
        assert_eq!(at_two.height, at_one.height * 2.0);
    }

    #[test]
    fn test_project_clamps_overflowing_region() {
        let rect = project(&region(80.0, 90.0, 50.0, 50.0), &viewport(100.0, 100.0, 1.0));
        assert_eq!(rect.x + rect.width, 100.0);
        assert_eq!(rect.y + rect.height, 100.0);
    }

    #[test]
    fn test_project_clamps_negative_coordinates() {
        let rect = project(&region(-10.0, -5.0, 20.0, 20.0), &viewport(100.0, 100.0, 1.0));
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.0);
        assert_eq!(rect.width, 20.0);
    }

    #[test]
    fn test_project_zero_viewport() {
        let rect = project(&region(10.0, 10.0, 20.0, 20.0), &viewport(0.0, 0.0, 1.0));
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
    }

    #[test]
    fn test_severity_colors_are_distinct() {
        let colors = [
            severity_color(Severity::Low),
            severity_color(Severity::Medium),
            severity_color(Severity::High),
            severity_color(Severity::Critical),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_build_overlay_partitions_localized() {
        let flags = vec![
            flag(Some(region(10.0, 10.0, 10.0, 10.0)), Severity::High),
            flag(None, Severity::Low),
        ];
        let view = build_overlay(&flags, &viewport(800.0, 1000.0, 1.0), None);
        assert_eq!(view.boxes.len(), 1);
        assert_eq!(view.unlocalized.len(), 1);
        assert_eq!(view.boxes[0].color, "#f97316");
        assert!(view.boxes[0].handles.is_none());
    }

    #[test]
    fn test_build_overlay_selected_gets_handles() {
        let flags = vec![flag(Some(region(25.0, 25.0, 50.0, 50.0)), Severity::Critical)];
        let selected = flags[0].flag_id;
        let view = build_overlay(&flags, &viewport(200.0, 200.0, 1.0), Some(selected));

        let handles = view.boxes[0].handles.expect("selected box has handles");
        assert_eq!(handles.len(), 4);
        // Top-left handle centered on the box corner
        assert_eq!(handles[0].x, 50.0 - HANDLE_SIZE / 2.0);
        assert_eq!(handles[0].y, 50.0 - HANDLE_SIZE / 2.0);
        // Handles scale with zoom
        let zoomed = build_overlay(&flags, &viewport(200.0, 200.0, 2.0), Some(selected));
        assert_eq!(zoomed.boxes[0].handles.unwrap()[0].width, HANDLE_SIZE * 2.0);
    }

    #[test]
    fn test_build_overlay_missing_page_defaults_to_one() {
        let mut f = flag(Some(region(0.0, 0.0, 10.0, 10.0)), Severity::Medium);
        f.page_number = None;
        let view = build_overlay(&[f], &viewport(100.0, 100.0, 1.0), None);
        assert_eq!(view.boxes[0].page_number, 1);
    }
}
