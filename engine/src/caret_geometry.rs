//! Caret coordinates and overlay placement.

use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::Rect;
use crate::dom::Size;
use crate::surface::CaretContext;
use crate::surface::OVERLAY_ATTR;
use crate::surface::SurfaceKind;

pub const MENU_SIZE: Size = Size {
    width: 300.0,
    height: 300.0,
};
const MENU_OFFSET_X: f32 = 10.0;
const MENU_OFFSET_Y: f32 = 20.0;
const VIEWPORT_MARGIN: f32 = 10.0;
const TOOLTIP_GAP: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretPoint {
    pub x: f32,
    pub y: f32,
}

/// Viewport coordinates of the caret described by `context`.
pub fn caret_point(doc: &mut Document, surface: NodeId, context: &CaretContext) -> Option<CaretPoint> {
    match context.kind {
        SurfaceKind::PlainValue => measure_value_caret(doc, surface, context),
        SurfaceKind::NodeTree => {
            let range = doc.selection()?;
            let rect = doc.range_rect(range.start)?;
            Some(CaretPoint {
                x: rect.x,
                y: rect.y,
            })
        }
        SurfaceKind::Unsupported => None,
    }
}

/// Measure the pre-caret text with a hidden span that copies the surface font.
fn measure_value_caret(
    doc: &mut Document,
    surface: NodeId,
    context: &CaretContext,
) -> Option<CaretPoint> {
    let before: String = context.text.chars().take(context.caret).collect();
    let span = doc.create_element("span");
    let measured = build_measurement_span(doc, surface, span, &before).map(|()| doc.rect(span).width);
    if let Err(err) = doc.remove(span) {
        tracing::debug!("failed to remove measurement span: {err}");
    }

    let width = match measured {
        Ok(width) => width,
        Err(err) => {
            tracing::warn!("failed to measure caret: {err}");
            return None;
        }
    };
    let rect = doc.rect(surface);
    Some(CaretPoint {
        x: rect.x + width,
        y: rect.y,
    })
}

fn build_measurement_span(
    doc: &mut Document,
    surface: NodeId,
    span: NodeId,
    text: &str,
) -> Result<(), DomError> {
    let font = doc.font(surface);
    let body = doc.body();
    doc.set_attribute(span, OVERLAY_ATTR, "measure")?;
    doc.set_attribute(span, "style", "position:absolute;visibility:hidden;white-space:pre")?;
    doc.set_font(span, font)?;
    let text = doc.create_text(text);
    doc.append_child(span, text)?;
    doc.append_child(body, span)
}

/// Place an overlay of `size` next to `caret`, flipping across the caret on overflow and keeping
/// a margin from the viewport edges.
pub fn place_menu(caret: CaretPoint, size: Size, viewport: Size) -> Rect {
    let mut left = caret.x + MENU_OFFSET_X;
    if left + size.width > viewport.width {
        left = caret.x - size.width - MENU_OFFSET_X;
    }
    let mut top = caret.y + MENU_OFFSET_Y;
    if top + size.height > viewport.height {
        top = caret.y - size.height - MENU_OFFSET_Y;
    }

    left = left
        .min(viewport.width - size.width - VIEWPORT_MARGIN)
        .max(VIEWPORT_MARGIN);
    top = top
        .min(viewport.height - size.height - VIEWPORT_MARGIN)
        .max(VIEWPORT_MARGIN);
    Rect::new(left, top, size.width, size.height)
}

/// Tooltip to the right of the menu, aligned with the hovered row; to the left when it would
/// overflow the viewport.
pub fn place_tooltip(menu: Rect, row: Rect, tooltip: Size, viewport: Size) -> Rect {
    let mut left = menu.right() + TOOLTIP_GAP;
    if left + tooltip.width > viewport.width {
        left = menu.x - tooltip.width - TOOLTIP_GAP;
    }
    Rect::new(left, row.y, tooltip.width, tooltip.height)
}

/// Center an overlay of `size` in the viewport.
pub fn center_in_viewport(size: Size, viewport: Size) -> Rect {
    Rect::new(
        ((viewport.width - size.width) / 2.0).max(0.0),
        ((viewport.height - size.height) / 2.0).max(0.0),
        size.width,
        size.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Font;
    use crate::surface::caret_context;
    use pretty_assertions::assert_eq;

    const VIEWPORT: Size = Size {
        width: 1000.0,
        height: 800.0,
    };

    #[test]
    fn menu_opens_below_right_of_caret() {
        let rect = place_menu(CaretPoint { x: 100.0, y: 50.0 }, MENU_SIZE, VIEWPORT);
        assert_eq!(rect, Rect::new(110.0, 70.0, 300.0, 300.0));
    }

    #[test]
    fn menu_flips_on_overflow() {
        let rect = place_menu(CaretPoint { x: 900.0, y: 700.0 }, MENU_SIZE, VIEWPORT);
        assert_eq!(rect, Rect::new(590.0, 380.0, 300.0, 300.0));
    }

    #[test]
    fn menu_is_clamped_to_margin() {
        let rect = place_menu(CaretPoint { x: 200.0, y: 10.0 }, MENU_SIZE, Size::new(320.0, 280.0));
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 10.0);
    }

    #[test]
    fn tooltip_flips_left_near_right_edge() {
        let menu = Rect::new(650.0, 100.0, 300.0, 300.0);
        let row = Rect::new(650.0, 140.0, 300.0, 30.0);
        let tooltip = place_tooltip(menu, row, Size::new(200.0, 40.0), VIEWPORT);
        assert_eq!(tooltip, Rect::new(442.0, 140.0, 200.0, 40.0));

        let menu = Rect::new(100.0, 100.0, 300.0, 300.0);
        let tooltip = place_tooltip(menu, row, Size::new(200.0, 40.0), VIEWPORT);
        assert_eq!(tooltip.x, 408.0);
    }

    #[test]
    fn value_caret_is_measured_and_span_removed() {
        let mut doc = Document::new(VIEWPORT);
        let input = doc.create_element("input");
        doc.append_child(doc.body(), input).expect("append");
        doc.set_rect(input, Rect::new(40.0, 60.0, 400.0, 24.0)).expect("rect");
        doc.set_font(
            input,
            Font {
                char_width: 10.0,
                line_height: 20.0,
            },
        )
        .expect("font");
        doc.set_value(input, "ab//x").expect("value");
        let ctx = caret_context(&doc, input, SurfaceKind::PlainValue)
            .expect("context")
            .expect("some");
        let children_before = doc.children(doc.body()).len();

        let point = caret_point(&mut doc, input, &ctx).expect("point");
        assert_eq!(point, CaretPoint { x: 90.0, y: 60.0 });
        assert_eq!(doc.children(doc.body()).len(), children_before);
    }
}
