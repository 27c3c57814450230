//! Edit capture
//!
//! Turns what the editing surface reports into [`Edit`] observations.
//! The surface decorates elements while they are editable (a
//! `contenteditable` attribute, bookkeeping classes). `before` is the
//! element's markup as the page served it and is kept verbatim so replay
//! can find it again; from `after` only the markers the surface added are
//! removed, so markers the page itself carries survive.

use crate::patch::Edit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;

/// Attributes and classes the editing surface adds to an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    /// Attribute names, matched case-insensitively
    #[serde(default = "default_marker_attributes")]
    pub attributes: Vec<String>,

    /// Class names, matched exactly
    #[serde(default = "default_marker_classes")]
    pub classes: Vec<String>,
}

fn default_marker_attributes() -> Vec<String> {
    vec!["contenteditable".to_string()]
}

fn default_marker_classes() -> Vec<String> {
    vec!["isModified".to_string(), "inEditMode".to_string()]
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            attributes: default_marker_attributes(),
            classes: default_marker_classes(),
        }
    }
}

fn start_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(\s*<[A-Za-z][^\s/>]*)((?:\s+[^\s"'=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)(\s*/?>)"#,
        )
        .expect("start tag pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\s+([^\s"'=/>]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'=<>`]+))?"#)
            .expect("attribute pattern is valid")
    })
}

fn class_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").expect("class token pattern is valid"))
}

/// One attribute of a start tag, with byte ranges into the whole markup
struct Attribute<'a> {
    name: &'a str,
    /// Whole attribute including its leading whitespace
    span: Range<usize>,
    /// Attribute value without quotes
    value: Option<Range<usize>>,
}

/// Attributes of the outermost start tag of `html`
fn start_tag_attributes(html: &str) -> Option<Vec<Attribute<'_>>> {
    let caps = start_tag_regex().captures(html)?;
    let attrs = caps.get(2)?;
    let offset = attrs.start();

    Some(
        attribute_regex()
            .captures_iter(attrs.as_str())
            .filter_map(|attr| {
                let whole = attr.get(0)?;
                let name = attr.get(1)?;
                let value = attr.get(2).map(|raw| {
                    let quoted = raw.as_str().len() >= 2
                        && ['"', '\''].iter().any(|q| {
                            raw.as_str().starts_with(*q) && raw.as_str().ends_with(*q)
                        });
                    if quoted {
                        raw.start() + offset + 1..raw.end() + offset - 1
                    } else {
                        raw.start() + offset..raw.end() + offset
                    }
                });
                Some(Attribute {
                    name: &html[name.start() + offset..name.end() + offset],
                    span: whole.start() + offset..whole.end() + offset,
                    value,
                })
            })
            .collect(),
    )
}

/// Copy `text` without the byte ranges in `cuts`, which are sorted by start
/// and may overlap
fn splice(text: &str, cuts: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for cut in cuts {
        let start = cut.start.max(cursor);
        out.push_str(&text[cursor..start]);
        cursor = cursor.max(cut.end);
    }
    out.push_str(&text[cursor..]);
    out
}

impl MarkerSet {
    fn is_marker_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(name))
    }

    /// Remove from the outermost start tag of `after` the markers that the
    /// start tag of `before` does not carry
    ///
    /// Only the element's own tag is touched; descendants keep whatever
    /// attributes they carry. A marker class is cut out together with one
    /// run of adjacent whitespace, leaving the rest of the attribute as it
    /// was. A `class` attribute emptied this way is dropped unless `before`
    /// has one too. Markup that does not begin with a start tag is returned
    /// unchanged.
    pub fn strip_added(&self, before: &str, after: &str) -> String {
        let Some(attributes) = start_tag_attributes(after) else {
            return after.to_string();
        };
        let original = start_tag_attributes(before).unwrap_or_default();
        let had = |name: &str| original.iter().any(|a| a.name.eq_ignore_ascii_case(name));
        let original_classes: Vec<&str> = original
            .iter()
            .filter(|a| a.name.eq_ignore_ascii_case("class"))
            .filter_map(|a| a.value.clone())
            .flat_map(move |value| before[value].split_whitespace())
            .collect();

        let mut cuts = Vec::new();
        for attr in &attributes {
            if self.is_marker_attribute(attr.name) && !had(attr.name) {
                cuts.push(attr.span.clone());
                continue;
            }
            if !attr.name.eq_ignore_ascii_case("class") {
                continue;
            }
            let Some(value_span) = attr.value.clone() else {
                continue;
            };

            let value = &after[value_span.clone()];
            let class_cuts = self.added_class_cuts(value, &original_classes);
            if class_cuts.is_empty() {
                continue;
            }
            if splice(value, &class_cuts).trim().is_empty() && !had("class") {
                cuts.push(attr.span.clone());
            } else {
                let offset = value_span.start;
                cuts.extend(class_cuts.into_iter().map(|c| c.start + offset..c.end + offset));
            }
        }

        if cuts.is_empty() {
            return after.to_string();
        }
        splice(after, &cuts)
    }

    /// Byte ranges of marker classes in a class attribute value that are not
    /// in `original`, each with one run of adjacent whitespace
    fn added_class_cuts(&self, value: &str, original: &[&str]) -> Vec<Range<usize>> {
        class_token_regex()
            .find_iter(value)
            .filter(|token| {
                let class = token.as_str();
                self.classes.iter().any(|marker| marker == class) && !original.contains(&class)
            })
            .map(|token| {
                let preceding = value[..token.start()].trim_end().len();
                if preceding > 0 {
                    preceding..token.end()
                } else {
                    let trailing = value[token.end()..].len() - value[token.end()..].trim_start().len();
                    token.start()..token.end() + trailing
                }
            })
            .collect()
    }
}

/// Builds edits from raw snapshots
#[derive(Debug, Clone, Default)]
pub struct Capture {
    markers: MarkerSet,
}

impl Capture {
    pub fn new(markers: MarkerSet) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Returns `None` when `after`, once the surface's markers are removed,
    /// equals `before`
    pub fn capture(&self, before: &str, after: &str) -> Option<Edit> {
        Edit::new(before, self.markers.strip_added(before, after))
    }
}

/// Per-element snapshots for one design-mode session
///
/// The surface reports every element the caret visits; only the first
/// snapshot of each element is kept, so it reflects the markup before any
/// change made during this session.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    capture: Capture,
    snapshots: Vec<(String, String)>,
}

impl EditBuffer {
    pub fn new(capture: Capture) -> Self {
        Self {
            capture,
            snapshots: Vec::new(),
        }
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    /// Record the markup of an element; later calls for the same element
    /// are ignored. Returns whether a snapshot was recorded.
    pub fn observe(&mut self, element_id: &str, outer_html: &str) -> bool {
        if self.snapshot(element_id).is_some() {
            return false;
        }
        self.snapshots
            .push((element_id.to_string(), outer_html.to_string()));
        true
    }

    /// Original markup recorded for an element
    pub fn snapshot(&self, element_id: &str) -> Option<&str> {
        self.snapshots
            .iter()
            .find(|(id, _)| id == element_id)
            .map(|(_, html)| html.as_str())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Elements whose current markup differs from their snapshot
    ///
    /// `current` returns the live outer markup of an element, or `None` if
    /// it is no longer in the document.
    pub fn edited<F>(&self, mut current: F) -> Vec<String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.snapshots
            .iter()
            .filter(|(id, before)| {
                current(id)
                    .map(|after| self.capture.capture(before, &after).is_some())
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Abandon the session, returning the markup each element must be
    /// restored to
    pub fn cancel(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.snapshots)
    }

    /// Drain the session into edits, in observation order
    pub fn finish<F>(&mut self, mut current: F) -> Vec<Edit>
    where
        F: FnMut(&str) -> Option<String>,
    {
        std::mem::take(&mut self.snapshots)
            .into_iter()
            .filter_map(|(id, before)| {
                let after = current(&id)?;
                self.capture.capture(&before, &after)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn strip(after: &str) -> String {
        MarkerSet::default().strip_added("<p>", after)
    }

    #[test]
    fn test_strip_contenteditable() {
        assert_eq!(
            strip(r#"<p contenteditable="true" id="x">Hi</p>"#),
            r#"<p id="x">Hi</p>"#
        );
        assert_eq!(strip(r#"<p contentEditable id="x">Hi</p>"#), r#"<p id="x">Hi</p>"#);
    }

    #[test]
    fn test_strip_marker_classes() {
        assert_eq!(
            strip(r#"<div class="note isModified inEditMode">x</div>"#),
            r#"<div class="note">x</div>"#
        );
        assert_eq!(
            strip(r#"<div class="inEditMode note">x</div>"#),
            r#"<div class="note">x</div>"#
        );
    }

    #[test]
    fn test_marker_class_spliced_out_in_place() {
        assert_eq!(
            strip(r#"<div class="a  b inEditMode">x</div>"#),
            r#"<div class="a  b">x</div>"#
        );
        assert_eq!(
            strip(r#"<div class="a inEditMode  b">x</div>"#),
            r#"<div class="a  b">x</div>"#
        );

        let capture = Capture::default();
        let before = r#"<div class="a  b">x</div>"#;
        assert!(capture
            .capture(before, r#"<div class="a  b inEditMode" contenteditable="true">x</div>"#)
            .is_none());
    }

    #[test]
    fn test_emptied_class_attribute_removed() {
        assert_eq!(
            strip(r#"<h1 class="inEditMode" contenteditable="true">T</h1>"#),
            "<h1>T</h1>"
        );
        assert_eq!(strip(r#"<h1 class="">T</h1>"#), r#"<h1 class="">T</h1>"#);
    }

    #[test]
    fn test_markers_present_before_are_kept() {
        let markers = MarkerSet::default();
        assert_eq!(
            markers.strip_added(
                r#"<div contenteditable="true">draft</div>"#,
                r#"<div contenteditable="true">final</div>"#
            ),
            r#"<div contenteditable="true">final</div>"#
        );
        assert_eq!(
            markers.strip_added(
                r#"<p class="isModified">a</p>"#,
                r#"<p class="isModified inEditMode">b</p>"#
            ),
            r#"<p class="isModified">b</p>"#
        );
        assert_eq!(
            markers.strip_added(r#"<p class="">a</p>"#, r#"<p class="inEditMode">b</p>"#),
            r#"<p class="">b</p>"#
        );
    }

    #[test]
    fn test_descendants_untouched() {
        let html = r#"<div><span contenteditable="true" class="isModified">x</span></div>"#;
        assert_eq!(strip(html), html);
    }

    #[test]
    fn test_attribute_value_with_angle_bracket() {
        assert_eq!(
            strip(r#"<a title="a > b" contenteditable="true">x</a>"#),
            r#"<a title="a > b">x</a>"#
        );
    }

    #[test]
    fn test_non_element_input_unchanged() {
        assert_eq!(strip("plain text"), "plain text");
        assert_eq!(strip(""), "");
    }

    #[test]
    fn test_before_kept_verbatim_and_replays() {
        let capture = Capture::default();

        let edit = capture
            .capture(r#"<p class="">Helo</p>"#, r#"<p class="" contenteditable="true">Hello</p>"#)
            .unwrap();
        assert_eq!(edit.before, r#"<p class="">Helo</p>"#);
        assert_eq!(edit.after, r#"<p class="">Hello</p>"#);
        let patch = crate::patch::Patch::from(edit);
        let result = crate::replay::replay(r#"<body><p class="">Helo</p></body>"#, [&patch]);
        assert_eq!(result.report.live_count(), 1);
        assert_eq!(result.content, r#"<body><p class="">Hello</p></body>"#);

        let edit = capture
            .capture(
                r#"<div contenteditable="true">draft</div>"#,
                r#"<div contenteditable="true">final</div>"#,
            )
            .unwrap();
        assert_eq!(edit.before, r#"<div contenteditable="true">draft</div>"#);
        let patch = crate::patch::Patch::from(edit);
        let result = crate::replay::replay(r#"<main><div contenteditable="true">draft</div></main>"#, [&patch]);
        assert_eq!(result.report.live_count(), 1);
        assert_eq!(result.content, r#"<main><div contenteditable="true">final</div></main>"#);
    }

    #[test]
    fn test_capture_noop_after_stripping() {
        let capture = Capture::default();
        let before = r#"<p>Hello</p>"#;
        let after = r#"<p contenteditable="true" class="inEditMode">Hello</p>"#;
        assert!(capture.capture(before, after).is_none());
    }

    #[test]
    fn test_capture_real_edit() {
        let capture = Capture::default();
        let edit = capture
            .capture("<p>Hello</p>", r#"<p contenteditable="true">Hello world</p>"#)
            .unwrap();
        assert_eq!(edit.before, "<p>Hello</p>");
        assert_eq!(edit.after, "<p>Hello world</p>");
    }

    #[test]
    fn test_buffer_keeps_first_snapshot() {
        let mut buffer = EditBuffer::default();
        assert!(buffer.observe("e1", "<p>a</p>"));
        assert!(!buffer.observe("e1", "<p>ab</p>"));
        assert_eq!(buffer.snapshot("e1"), Some("<p>a</p>"));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_buffer_finish_and_edited() {
        let mut buffer = EditBuffer::default();
        buffer.observe("e1", "<p>a</p>");
        buffer.observe("e2", "<p>b</p>");
        buffer.observe("e3", "<p>c</p>");

        let live: HashMap<&str, &str> = [
            ("e1", "<p>a2</p>"),
            ("e2", r#"<p contenteditable="true">b</p>"#),
        ]
        .into_iter()
        .collect();
        let current = |id: &str| live.get(id).map(|s| s.to_string());

        assert_eq!(buffer.edited(current), vec!["e1".to_string()]);

        let edits = buffer.finish(current);
        assert_eq!(edits, vec![Edit::new("<p>a</p>", "<p>a2</p>").unwrap()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_cancel() {
        let mut buffer = EditBuffer::default();
        buffer.observe("e1", "<p>a</p>");
        let restore = buffer.cancel();
        assert_eq!(restore, vec![("e1".to_string(), "<p>a</p>".to_string())]);
        assert!(buffer.is_empty());
    }
}
