//! DOM implementation of the spanlight host traits.
//!
//! Containers are elements looked up by id. Highlights go through the CSS
//! Custom Highlight API, which is page wide, so ranges are kept per node and
//! merged under each highlight name. Chips are absolutely positioned
//! elements in a layer placed over the container; the container's parent
//! must be its offset parent.

use std::cell::RefCell;
use std::collections::BTreeMap;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomRect, Element, HtmlElement, Node, Range, Window};

use spanlight_core::text::{char_to_utf16_offset, utf16_to_char_offset};
use spanlight_core::{Chip, HighlightSurface, LayoutHost, RawSelection, Rect, SearchSurface, TextRange};

pub const CHIP_CLASS: &str = "span-chip";
const CHIP_HOVER_CLASS: &str = "span-chip span-chip--hover";

thread_local! {
    /// highlight name -> node id -> ranges
    static REGISTRY: RefCell<BTreeMap<String, BTreeMap<String, Vec<Range>>>> = RefCell::new(BTreeMap::new());
}

fn global_property(name: &str) -> Option<JsValue> {
    let value = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).ok()?;
    (!value.is_undefined()).then_some(value)
}

fn highlight_registry() -> Option<JsValue> {
    let css = global_property("CSS")?;
    let registry = Reflect::get(&css, &JsValue::from_str("highlights")).ok()?;
    (!registry.is_undefined()).then_some(registry)
}

fn call_method(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    Reflect::apply(&function, target, args)
}

/// Rebuild the page highlight `name` from the ranges of every node
fn sync_highlight(name: &str) -> Result<(), JsValue> {
    let registry = highlight_registry().ok_or("CSS highlights unavailable")?;
    let ranges: Vec<Range> = REGISTRY.with(|r| {
        r.borrow()
            .get(name)
            .map(|nodes| nodes.values().flatten().cloned().collect())
            .unwrap_or_default()
    });

    if ranges.is_empty() {
        call_method(&registry, "delete", &Array::of1(&JsValue::from_str(name)))?;
        return Ok(());
    }

    let constructor: Function = global_property("Highlight")
        .ok_or("Highlight unavailable")?
        .dyn_into()?;
    let args: Array = ranges.into_iter().map(JsValue::from).collect();
    let highlight = Reflect::construct(&constructor, &args)?;
    call_method(&registry, "set", &Array::of2(&JsValue::from_str(name), &highlight))?;
    Ok(())
}

fn text_nodes(root: &Node, out: &mut Vec<Node>) {
    let children = root.child_nodes();
    for i in 0..children.length() {
        if let Some(child) = children.item(i) {
            if child.node_type() == Node::TEXT_NODE {
                out.push(child);
            } else {
                text_nodes(&child, out);
            }
        }
    }
}

/// DOM position (text node, UTF-16 offset) of a char offset inside `root`
fn dom_position(root: &Node, offset: usize) -> Option<(Node, u32)> {
    let mut nodes = Vec::new();
    text_nodes(root, &mut nodes);

    let mut start = 0;
    for node in nodes {
        let text = node.text_content().unwrap_or_default();
        let len = text.chars().count();
        if offset <= start + len {
            let units = char_to_utf16_offset(&text, offset - start);
            return Some((node, units as u32));
        }
        start += len;
    }
    None
}

/// Char offset inside `root` of a position in one of its text nodes
fn char_offset(root: &Node, target: &Node, units: u32) -> Option<usize> {
    let mut nodes = Vec::new();
    text_nodes(root, &mut nodes);

    let mut start = 0;
    for node in nodes {
        let text = node.text_content().unwrap_or_default();
        if node.is_same_node(Some(target)) {
            return Some(start + utf16_to_char_offset(&text, units as usize));
        }
        start += text.chars().count();
    }
    None
}

fn to_rect(rect: DomRect) -> Rect {
    Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// Inline style placing a chip at its bounds
pub fn chip_style(chip: &Chip) -> String {
    let b = chip.bounds;
    let mut style = format!(
        "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;",
        b.left, b.top, b.width, b.height
    );
    if let Some(color) = &chip.entity.color {
        style.push_str(&format!("background-color:{color};"));
    }
    style
}

pub fn chip_class(chip: &Chip) -> &'static str {
    if chip.hovered {
        CHIP_HOVER_CLASS
    } else {
        CHIP_CLASS
    }
}

/// Span identity stored on a chip element: (from, to, entity id)
pub fn chip_key(element: &Element) -> Option<(usize, usize, String)> {
    let from = element.get_attribute("data-from")?.parse().ok()?;
    let to = element.get_attribute("data-to")?.parse().ok()?;
    let entity = element.get_attribute("data-entity")?;
    Some((from, to, entity))
}

pub struct DomSurface {
    window: Window,
    document: web_sys::Document,
}

impl DomSurface {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        Ok(Self { window, document })
    }

    pub fn container(&self, node: &str) -> Option<Element> {
        self.document.get_element_by_id(node)
    }

    fn range(&self, node: &str, from: usize, to: usize) -> Option<Range> {
        let root = self.container(node)?;
        let (start_node, start) = dom_position(&root, from)?;
        let (end_node, end) = dom_position(&root, to)?;

        let range = self.document.create_range().ok()?;
        range.set_start(&start_node, start).ok()?;
        range.set_end(&end_node, end).ok()?;
        Some(range)
    }

    /// Chip layer of `node`, created next to the container on first use
    pub fn chip_layer(&self, node: &str) -> Option<HtmlElement> {
        let id = format!("{node}-chips");
        if let Some(layer) = self.document.get_element_by_id(&id) {
            return layer.dyn_into().ok();
        }

        let parent = self.container(node)?.parent_element()?;
        let layer: HtmlElement = self.document.create_element("div").ok()?.dyn_into().ok()?;
        layer.set_id(&id);
        layer.set_class_name("span-chip-layer");
        parent.append_child(&layer).ok()?;
        Some(layer)
    }

    fn place_layer(container: &HtmlElement, layer: &HtmlElement) -> Result<(), JsValue> {
        let style = layer.style();
        style.set_property("position", "absolute")?;
        style.set_property("left", &format!("{}px", container.offset_left()))?;
        style.set_property("top", &format!("{}px", container.offset_top()))?;
        style.set_property("width", "0")?;
        style.set_property("height", "0")?;
        style.set_property("overflow", "visible")?;
        Ok(())
    }

    fn build_chip(&self, chip: &Chip) -> Result<Element, JsValue> {
        let element = self.document.create_element("div")?;
        element.set_class_name(chip_class(chip));
        element.set_attribute("style", &chip_style(chip))?;
        element.set_attribute("data-from", &chip.span.span.from.to_string())?;
        element.set_attribute("data-to", &chip.span.span.to.to_string())?;
        element.set_attribute("data-entity", &chip.entity.id)?;
        element.set_attribute("title", &chip.span.span.text)?;
        element.set_text_content(Some(&chip.entity.text));
        Ok(element)
    }

    fn draw_chips(&self, node: &str, chips: &[Chip]) -> Result<(), JsValue> {
        let container: HtmlElement = self.container(node).ok_or("container missing")?.dyn_into()?;
        let layer = self.chip_layer(node).ok_or("chip layer unavailable")?;
        Self::place_layer(&container, &layer)?;

        layer.set_inner_html("");
        for chip in chips {
            let element = self.build_chip(chip)?;
            layer.append_child(&element)?;
        }
        Ok(())
    }
}

impl HighlightSurface for DomSurface {
    fn supports_highlights(&self) -> bool {
        highlight_registry().is_some() && global_property("Highlight").is_some()
    }

    fn text(&self, node: &str) -> Option<String> {
        self.container(node)?.text_content()
    }

    fn register_highlight(&mut self, node: &str, name: &str, ranges: &[TextRange]) {
        let ranges: Vec<Range> = ranges
            .iter()
            .filter_map(|r| self.range(node, r.start_offset, r.end_offset))
            .collect();
        REGISTRY.with(|r| {
            r.borrow_mut()
                .entry(name.to_string())
                .or_default()
                .insert(node.to_string(), ranges);
        });
        if let Err(e) = sync_highlight(name) {
            web_sys::console::warn_1(&e);
        }
    }

    fn clear_highlight(&mut self, node: &str, name: &str) {
        let removed = REGISTRY.with(|r| {
            let mut registry = r.borrow_mut();
            let Some(nodes) = registry.get_mut(name) else {
                return false;
            };
            let removed = nodes.remove(node).is_some();
            if nodes.is_empty() {
                registry.remove(name);
            }
            removed
        });
        if removed {
            if let Err(e) = sync_highlight(name) {
                web_sys::console::warn_1(&e);
            }
        }
    }
}

impl LayoutHost for DomSurface {
    fn container_box(&self, node: &str) -> Option<Rect> {
        Some(to_rect(self.container(node)?.get_bounding_client_rect()))
    }

    fn range_box(&self, node: &str, from: usize, to: usize) -> Option<Rect> {
        Some(to_rect(self.range(node, from, to)?.get_bounding_client_rect()))
    }

    fn selection(&self, node: &str) -> Option<RawSelection> {
        let root = self.container(node)?;
        let selection = self.window.get_selection().ok()??;
        let anchor_node = selection.anchor_node()?;
        let focus_node = selection.focus_node()?;
        if !root.contains(Some(&anchor_node)) || !root.contains(Some(&focus_node)) {
            return None;
        }

        Some(RawSelection {
            anchor: char_offset(&root, &anchor_node, selection.anchor_offset())?,
            focus: char_offset(&root, &focus_node, selection.focus_offset())?,
        })
    }

    fn clear_selection(&mut self) {
        if let Ok(Some(selection)) = self.window.get_selection() {
            let _ = selection.remove_all_ranges();
        }
    }

    fn set_line_height(&mut self, node: &str, line_height: f64) {
        let Some(container) = self.container(node).and_then(|e| e.dyn_into::<HtmlElement>().ok()) else {
            return;
        };
        if let Err(e) = container
            .style()
            .set_property("line-height", &format!("{line_height}px"))
        {
            web_sys::console::warn_1(&e);
        }
    }

    fn render_chips(&mut self, node: &str, chips: &[Chip]) {
        if let Err(e) = self.draw_chips(node, chips) {
            web_sys::console::warn_1(&e);
        }
    }
}

impl SearchSurface for DomSurface {
    fn markup(&self, field: &str) -> Option<String> {
        Some(self.container(field)?.inner_html())
    }

    fn set_markup(&mut self, field: &str, markup: &str) {
        if let Some(container) = self.container(field) {
            container.set_inner_html(markup);
        }
    }
}

#[cfg(test)]
mod tests {
    use spanlight_core::{Entity, Node as TextNode, Overlap, OverlappedSpan, Span};

    use super::*;

    fn chip(hovered: bool, color: Option<&str>) -> Chip {
        let node = TextNode::new("field", "Ada met Bob");
        let entity = match color {
            Some(color) => Entity::new("per", "Person").with_color(color),
            None => Entity::new("per", "Person"),
        };
        Chip {
            span: OverlappedSpan {
                span: Span::new(&node, 0, 3, entity.clone()),
                overlap: Overlap::at_level(1),
            },
            entity,
            bounds: Rect::new(4.0, 20.0, 30.0, 10.0),
            hovered,
        }
    }

    #[test]
    fn test_chip_style_places_chip() {
        assert_eq!(
            chip_style(&chip(false, None)),
            "position:absolute;left:4px;top:20px;width:30px;height:10px;"
        );
        assert!(chip_style(&chip(false, Some("#f00"))).ends_with("background-color:#f00;"));
    }

    #[test]
    fn test_hovered_chip_gets_modifier_class() {
        assert_eq!(chip_class(&chip(false, None)), CHIP_CLASS);
        assert_eq!(chip_class(&chip(true, None)), "span-chip span-chip--hover");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use wasm_bindgen_test::*;

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    // "Ada met 😀 Bob" split over five text nodes
    const MARKUP: &str = "Ada <b>met 😀</b> <i>B<span>ob</span></i>";

    fn container(id: &str, markup: &str) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let element = document.create_element("div").unwrap();
        element.set_id(id);
        element.set_inner_html(markup);
        document.body().unwrap().append_child(&element).unwrap();
        element
    }

    fn registered(name: &str) -> Vec<(String, usize)> {
        REGISTRY.with(|r| {
            r.borrow()
                .get(name)
                .map(|nodes| nodes.iter().map(|(node, ranges)| (node.clone(), ranges.len())).collect())
                .unwrap_or_default()
        })
    }

    fn page_highlight_size(name: &str) -> Option<u32> {
        let registry = highlight_registry()?;
        let highlight = call_method(&registry, "get", &Array::of1(&JsValue::from_str(name))).ok()?;
        if highlight.is_undefined() {
            return Some(0);
        }
        Reflect::get(&highlight, &JsValue::from_str("size")).ok()?.as_f64().map(|n| n as u32)
    }

    #[wasm_bindgen_test]
    fn test_offsets_cross_text_nodes() {
        let root = container("offsets", MARKUP);
        assert_eq!(root.text_content().unwrap().chars().count(), 13);

        // The emoji ends the second text node: 5 chars, 6 UTF-16 units
        let (node, units) = dom_position(&root, 9).unwrap();
        assert_eq!(node.text_content().unwrap(), "met 😀");
        assert_eq!(units, 6);

        for offset in 0..=13 {
            let (node, units) = dom_position(&root, offset).unwrap();
            assert_eq!(char_offset(&root, &node, units), Some(offset));
        }
        assert!(dom_position(&root, 14).is_none());

        root.remove();
    }

    #[wasm_bindgen_test]
    fn test_range_covers_astral_char() {
        let root = container("range-field", MARKUP);
        let surface = DomSurface::new().unwrap();

        let range = surface.range("range-field", 8, 13).unwrap();
        assert_eq!(String::from(range.to_string()), "😀 Bob");
        assert_eq!(surface.text("range-field").unwrap(), "Ada met 😀 Bob");

        root.remove();
    }

    #[wasm_bindgen_test]
    fn test_selection_reads_char_offsets() {
        let root = container("selected-field", MARKUP);
        let mut surface = DomSurface::new().unwrap();

        let mut nodes = Vec::new();
        text_nodes(&root, &mut nodes);
        let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
        // Backwards: from the end of "ob" to just after the emoji
        selection
            .set_base_and_extent(&nodes[4], 2, &nodes[1], 6)
            .unwrap();

        assert_eq!(
            surface.selection("selected-field"),
            Some(RawSelection { anchor: 13, focus: 9 })
        );

        surface.clear_selection();
        assert_eq!(surface.selection("selected-field"), None);

        root.remove();
    }

    #[wasm_bindgen_test]
    fn test_chip_carries_span_identity() {
        let surface = DomSurface::new().unwrap();
        let node = spanlight_core::Node::new("chip-field", "Ada met Bob");
        let entity = spanlight_core::Entity::new("per", "Person");
        let chip = Chip {
            span: spanlight_core::OverlappedSpan {
                span: spanlight_core::Span::new(&node, 8, 11, entity.clone()),
                overlap: spanlight_core::Overlap::at_level(1),
            },
            entity,
            bounds: Rect::new(80.0, 20.0, 30.0, 10.0),
            hovered: false,
        };

        let element = surface.build_chip(&chip).unwrap();
        assert_eq!(chip_key(&element), Some((8, 11, "per".to_string())));
        assert_eq!(element.get_attribute("title").as_deref(), Some("Bob"));
        assert_eq!(element.text_content().as_deref(), Some("Person"));
    }

    #[wasm_bindgen_test]
    fn test_highlight_name_unions_nodes() {
        let left = container("union-left", "Ada met Bob");
        let right = container("union-right", "Cy met Di");
        let mut surface = DomSurface::new().unwrap();
        let name = "span-union";

        surface.register_highlight("union-left", name, &[TextRange::new(0, 3)]);
        surface.register_highlight("union-right", name, &[TextRange::new(0, 2), TextRange::new(7, 9)]);
        assert_eq!(
            registered(name),
            vec![("union-left".to_string(), 1), ("union-right".to_string(), 2)]
        );
        if surface.supports_highlights() {
            assert_eq!(page_highlight_size(name), Some(3));
        }

        surface.clear_highlight("union-left", name);
        assert_eq!(registered(name), vec![("union-right".to_string(), 2)]);
        if surface.supports_highlights() {
            assert_eq!(page_highlight_size(name), Some(2));
        }

        surface.clear_highlight("union-right", name);
        assert!(registered(name).is_empty());
        if surface.supports_highlights() {
            assert_eq!(page_highlight_size(name), Some(0));
        }

        left.remove();
        right.remove();
    }
}
