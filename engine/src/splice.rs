//! In-place replacement of a character span on a surface, followed by caret restoration.

use std::ops::Range;

use crate::dom::BoundaryPoint;
use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::SelectionRange;
use crate::surface::CaretAnchor;
use crate::surface::CaretContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceOutcome {
    /// Character offset of the caret after the replacement.
    pub caret: usize,
    /// False when the text was written but the caret could not be placed.
    pub caret_restored: bool,
}

/// `text[..span.start] + replacement + text[span.end..]`, with character offsets.
pub fn splice_chars(text: &str, span: Range<usize>, replacement: &str) -> String {
    let start = byte_offset(text, span.start);
    let end = byte_offset(text, span.end.max(span.start));
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}

/// Byte offset of the `char_offset`-th character, clamped to the end.
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Replace `span` (character offsets into `context.text`) with `replacement` on `surface`.
///
/// Errors writing the text are returned; errors placing the caret afterwards are logged and
/// reported through [`SpliceOutcome::caret_restored`], leaving the new text in place.
pub fn splice(
    doc: &mut Document,
    surface: NodeId,
    context: &CaretContext,
    span: Range<usize>,
    replacement: &str,
) -> Result<SpliceOutcome, DomError> {
    let updated = splice_chars(&context.text, span.clone(), replacement);
    let caret = span.start + replacement.chars().count();

    let placed = match context.anchor {
        CaretAnchor::Value => {
            doc.set_value(surface, &updated)?;
            let placed = place_value_caret(doc, surface, caret);
            if doc.tag(surface) == Some("textarea") {
                scroll_caret_into_view(doc, surface, &updated, caret);
            }
            placed
        }
        CaretAnchor::TextNode(text_node) => {
            doc.set_text(text_node, &updated)?;
            doc.set_selection(SelectionRange::collapsed(BoundaryPoint {
                node: text_node,
                offset: caret,
            }))
            .and_then(|()| doc.focus(surface))
        }
        CaretAnchor::Root(root) => {
            let first_text = doc.set_text_content(root, &updated)?;
            let point = match first_text {
                Some(node) => BoundaryPoint {
                    node,
                    offset: caret,
                },
                None => BoundaryPoint {
                    node: root,
                    offset: caret,
                },
            };
            doc.set_selection(SelectionRange::collapsed(point))
                .and_then(|()| doc.focus(surface))
        }
    };

    let caret_restored = match placed {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("failed to restore caret after splice: {err}");
            false
        }
    };
    Ok(SpliceOutcome {
        caret,
        caret_restored,
    })
}

fn place_value_caret(doc: &mut Document, surface: NodeId, caret: usize) -> Result<(), DomError> {
    doc.set_selection_range(surface, caret, caret)?;
    doc.focus(surface)
}

fn scroll_caret_into_view(doc: &mut Document, textarea: NodeId, text: &str, caret: usize) {
    let line = text.chars().take(caret).filter(|c| *c == '\n').count() + 1;
    let line_height = doc.font(textarea).line_height;
    if let Err(err) = doc.set_scroll_top(textarea, (line - 1) as f32 * line_height) {
        tracing::warn!("failed to scroll textarea: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Size;
    use crate::surface::SurfaceKind;
    use crate::surface::caret_context;
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new(Size::new(800.0, 600.0))
    }

    #[test]
    fn splice_chars_replaces_span() {
        assert_eq!(splice_chars("Hello //hi", 6..10, "Hi there! "), "Hello Hi there! ");
        assert_eq!(splice_chars("ça //x va", 3..6, "y"), "ça y va");
        assert_eq!(splice_chars("ab", 5..9, "c"), "abc");
    }

    #[test]
    fn plain_value_splice_places_caret_after_replacement() {
        let mut doc = doc();
        let input = doc.create_element("input");
        doc.append_child(doc.body(), input).expect("append");
        doc.set_value(input, "Hello //hi world").expect("value");
        doc.set_selection_range(input, 10, 10).expect("caret");

        let ctx = caret_context(&doc, input, SurfaceKind::PlainValue)
            .expect("context")
            .expect("some");
        let outcome = splice(&mut doc, input, &ctx, 6..10, "Hi there!").expect("splice");

        assert_eq!(doc.value(input), Ok("Hello Hi there! world"));
        assert_eq!(doc.selection_range(input), Ok((15, 15)));
        assert_eq!(doc.focused(), Some(input));
        assert_eq!(
            outcome,
            SpliceOutcome {
                caret: 15,
                caret_restored: true
            }
        );
    }

    #[test]
    fn textarea_scrolls_to_caret_line() {
        let mut doc = doc();
        let textarea = doc.create_element("textarea");
        doc.set_value(textarea, "one\ntwo\n//x").expect("value");
        let ctx = caret_context(&doc, textarea, SurfaceKind::PlainValue)
            .expect("context")
            .expect("some");
        splice(&mut doc, textarea, &ctx, 8..11, "three").expect("splice");
        assert_eq!(doc.scroll_top(textarea), 2.0 * doc.font(textarea).line_height);
    }

    #[test]
    fn text_node_splice_keeps_node_identity() {
        let mut doc = doc();
        let editable = doc.create_element("div");
        doc.set_attribute(editable, "contenteditable", "true").expect("attribute");
        doc.append_child(doc.body(), editable).expect("append");
        doc.insert_text_at_caret(editable, "Say //hi").expect("type");
        let ctx = caret_context(&doc, editable, SurfaceKind::NodeTree)
            .expect("context")
            .expect("some");
        let CaretAnchor::TextNode(text_node) = ctx.anchor else {
            panic!("expected text node anchor, got {:?}", ctx.anchor);
        };

        splice(&mut doc, editable, &ctx, 4..8, "Hello").expect("splice");
        assert_eq!(doc.text(text_node), Ok("Say Hello"));
        assert_eq!(
            doc.selection().map(|s| s.start),
            Some(BoundaryPoint {
                node: text_node,
                offset: 9
            })
        );
    }

    #[test]
    fn root_splice_rebuilds_caret_in_new_text_node() {
        let mut doc = doc();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "id", "tinymce").expect("attribute");
        let old = doc.create_text("x //k");
        doc.append_child(editor, old).expect("append");
        doc.append_child(doc.body(), editor).expect("append");
        doc.set_selection(SelectionRange::collapsed(BoundaryPoint {
            node: editor,
            offset: 1,
        }))
        .expect("selection");

        let ctx = caret_context(&doc, editor, SurfaceKind::NodeTree)
            .expect("context")
            .expect("some");
        let outcome = splice(&mut doc, editor, &ctx, 2..5, "kept").expect("splice");

        assert!(!doc.is_alive(old));
        assert_eq!(doc.text_content(editor), "x kept");
        let first = doc.first_child(editor).expect("text node");
        assert_eq!(
            doc.selection().map(|s| s.start),
            Some(BoundaryPoint {
                node: first,
                offset: 6
            })
        );
        assert!(outcome.caret_restored);
    }

    #[test]
    fn caret_failure_is_reported_without_rolling_back() {
        let mut doc = doc();
        let editor = doc.create_element("div");
        doc.append_child(doc.body(), editor).expect("append");
        let ctx = CaretContext {
            text: "//a".to_string(),
            caret: 3,
            kind: SurfaceKind::NodeTree,
            anchor: CaretAnchor::Root(editor),
        };

        let outcome = splice(&mut doc, editor, &ctx, 0..3, "").expect("splice");
        assert_eq!(doc.text_content(editor), "");
        assert_eq!(outcome.caret, 0);
        assert!(outcome.caret_restored);

        // A stale context whose span lies past the end of the text.
        let ctx = CaretContext {
            text: "ab".to_string(),
            caret: 5,
            kind: SurfaceKind::NodeTree,
            anchor: CaretAnchor::Root(editor),
        };
        let outcome = splice(&mut doc, editor, &ctx, 5..5, "").expect("splice");
        assert_eq!(doc.text_content(editor), "ab");
        assert!(!outcome.caret_restored);
    }
}
