//! Spanlight Web - browser host for span annotation
//!
//! JavaScript creates one [`AnnotationSession`] per annotation question and
//! one [`SpanAnnotator`] per annotated element. Annotators of a session share
//! its span store; each keeps its element's highlights and chips current
//! while the element is resized or scrolled.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, EventTarget, ResizeObserver};

use spanlight_core::layout::nearest_scrollable;
use spanlight_core::{
    shared, to_answers, to_seeds, AnswerDocument, Configuration, Document, HighlightSurface, LabelOption,
    LayoutEngine, OverlappedSpan, QueryHighlighter, SearchMode, SharedStore, SpanAnswer, SpanStore,
};

pub mod io;
mod surface;

use surface::DomSurface;

type Engine = Rc<RefCell<LayoutEngine<DomSurface>>>;

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Initialize the module
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    web_sys::console::log_1(&"Spanlight WASM initialized".into());

    Ok(())
}

/// Spans and label options shared by the fields of one question
#[wasm_bindgen]
pub struct AnnotationSession {
    store: SharedStore,
    labels: Vec<LabelOption>,
}

#[wasm_bindgen]
impl AnnotationSession {
    /// `labels_json` is an array of `{id, value, text, color?}`
    #[wasm_bindgen(constructor)]
    pub fn new(labels_json: &str) -> Result<AnnotationSession, JsValue> {
        let labels: Vec<LabelOption> = serde_json::from_str(labels_json).map_err(to_js)?;
        Ok(Self {
            store: shared(SpanStore::new()),
            labels,
        })
    }

    /// Number of spans across all fields
    pub fn span_count(&self) -> usize {
        self.store.borrow().len()
    }
}

/// An event listener removed again when dropped
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(target: EventTarget, event: &'static str, callback: impl FnMut(Event) + 'static) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(callback);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

struct ResizeWatch {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut()>,
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

/// Run `f` on the engine unless it is already busy
fn with_engine(engine: &Engine, f: impl FnOnce(&mut LayoutEngine<DomSurface>)) {
    if let Ok(mut engine) = engine.try_borrow_mut() {
        f(&mut engine);
    }
}

/// Stored span behind the chip an event targets
fn chip_span(engine: &Engine, event: &Event) -> Option<OverlappedSpan> {
    let target: Element = event.target()?.dyn_into().ok()?;
    let chip = target.closest(&format!(".{}", surface::CHIP_CLASS)).ok()??;
    let (from, to, entity) = surface::chip_key(&chip)?;
    let engine = engine.try_borrow().ok()?;
    engine
        .spans()
        .into_iter()
        .find(|s| s.span.from == from && s.span.to == to && s.span.entity.id == entity)
}

/// Span annotation over one element
///
/// Chips handle two gestures themselves: a click removes the span and
/// pointing at a chip hovers it. Relabel and duplicate are left to the
/// page, which reads the span from the chip's `data-from`, `data-to` and
/// `data-entity` attributes and calls [`SpanAnnotator::relabel`] or
/// [`SpanAnnotator::duplicate`] with them.
#[wasm_bindgen]
pub struct SpanAnnotator {
    engine: Engine,
    labels: Vec<LabelOption>,
    listeners: Vec<Listener>,
    resize: Option<ResizeWatch>,
}

#[wasm_bindgen]
impl SpanAnnotator {
    /// `config_json` holds `{allowOverlap, allowCharacter, lineHeight}`, all optional
    #[wasm_bindgen(constructor)]
    pub fn new(
        session: &AnnotationSession,
        container_id: &str,
        config_json: Option<String>,
    ) -> Result<SpanAnnotator, JsValue> {
        let config: Configuration = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(to_js)?,
            None => Configuration::default(),
        };
        let engine = LayoutEngine::new(session.store.clone(), DomSurface::new()?, container_id, config);
        Ok(Self {
            engine: Rc::new(RefCell::new(engine)),
            labels: session.labels.clone(),
            listeners: Vec::new(),
            resize: None,
        })
    }

    /// Load persisted answers (`[{start, end, label}]`), render and start listening
    ///
    /// Fails when the browser lacks CSS highlights or the element is
    /// missing; the page should then show the field without annotation.
    pub fn mount(&mut self, answers_json: Option<String>) -> Result<(), JsValue> {
        let answers: Vec<SpanAnswer> = match answers_json {
            Some(json) => serde_json::from_str(&json).map_err(to_js)?,
            None => Vec::new(),
        };
        let seeds = to_seeds(&answers, &self.labels);
        self.engine.borrow_mut().mount(seeds).map_err(to_js)?;
        self.observe()?;

        let node = self.engine.borrow().node_id().to_string();
        web_sys::console::log_1(&format!("Spanlight mounted on #{node}").into());
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.listeners.clear();
        self.resize = None;
        self.engine.borrow_mut().unmount();
    }

    /// Use the label option `label_id` for the next selection
    pub fn change_selected_entity(&mut self, label_id: &str) -> bool {
        let Some(option) = self.labels.iter().find(|l| l.id == label_id) else {
            return false;
        };
        self.engine.borrow_mut().change_selected_entity(option.entity());
        true
    }

    /// Current spans as answers JSON
    pub fn answers(&self) -> Result<String, JsValue> {
        let spans = self.engine.borrow().spans();
        serde_json::to_string(&to_answers(&spans, &self.labels)).map_err(to_js)
    }

    pub fn remove(&mut self, from: usize, to: usize, entity_id: &str) -> bool {
        let Some(stored) = self.find(from, to, entity_id) else {
            return false;
        };
        self.engine.borrow_mut().remove(&stored.span)
    }

    pub fn relabel(&mut self, from: usize, to: usize, entity_id: &str, label_id: &str) -> bool {
        let (Some(stored), Some(option)) = (self.find(from, to, entity_id), self.label(label_id)) else {
            return false;
        };
        self.engine.borrow_mut().relabel(&stored.span, option.entity())
    }

    pub fn duplicate(&mut self, from: usize, to: usize, entity_id: &str, label_id: &str) -> bool {
        let (Some(stored), Some(option)) = (self.find(from, to, entity_id), self.label(label_id)) else {
            return false;
        };
        self.engine.borrow_mut().duplicate(&stored.span, option.entity())
    }

    /// Download the field's answers as `filename`
    pub fn download(&self, title: &str, filename: &str) -> Result<(), JsValue> {
        let engine = self.engine.borrow();
        let text = engine.host().text(engine.node_id()).unwrap_or_default();
        let document = Document::new(title.to_string(), text);
        let export = AnswerDocument::new(&document, &engine.spans(), &self.labels);
        io::download_answers(filename, &export)
    }
}

impl SpanAnnotator {
    fn find(&self, from: usize, to: usize, entity_id: &str) -> Option<OverlappedSpan> {
        self.engine
            .borrow()
            .spans()
            .into_iter()
            .find(|s| s.span.from == from && s.span.to == to && s.span.entity.id == entity_id)
    }

    fn label(&self, label_id: &str) -> Option<LabelOption> {
        self.labels.iter().find(|l| l.id == label_id).cloned()
    }

    fn observe(&mut self) -> Result<(), JsValue> {
        self.listeners.clear();
        self.resize = None;

        let (container, layer) = {
            let engine = self.engine.borrow();
            let host = engine.host();
            let container = host.container(engine.node_id()).ok_or("container missing")?;
            (container, host.chip_layer(engine.node_id()))
        };

        // Selections end on mouseup
        let engine = self.engine.clone();
        self.listeners.push(Listener::attach(container.clone().into(), "mouseup", move |_| {
            with_engine(&engine, |e| {
                e.on_selection();
            })
        })?);

        let scroller = nearest_scrollable(
            &container,
            |e| e.parent_element(),
            |e| e.scroll_height() > e.client_height(),
        );
        let scroll_target: EventTarget = match scroller {
            Some(element) => element.into(),
            None => web_sys::window().ok_or("No window")?.into(),
        };
        let engine = self.engine.clone();
        self.listeners.push(Listener::attach(scroll_target, "scroll", move |_| {
            with_engine(&engine, |e| e.on_scroll())
        })?);

        if let Some(layer) = layer {
            let engine = self.engine.clone();
            self.listeners.push(Listener::attach(layer.clone().into(), "click", move |event| {
                if let Some(stored) = chip_span(&engine, &event) {
                    with_engine(&engine, |e| {
                        e.remove(&stored.span);
                    });
                }
            })?);

            let engine = self.engine.clone();
            self.listeners.push(Listener::attach(layer.clone().into(), "mouseover", move |event| {
                if let Some(stored) = chip_span(&engine, &event) {
                    with_engine(&engine, |e| e.hover(Some(stored.key())));
                }
            })?);

            let engine = self.engine.clone();
            self.listeners.push(Listener::attach(layer.into(), "mouseout", move |_| {
                with_engine(&engine, |e| e.hover(None))
            })?);
        }

        let engine = self.engine.clone();
        let callback = Closure::<dyn FnMut()>::new(move || with_engine(&engine, |e| e.on_resize()));
        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
        observer.observe(&container);
        self.resize = Some(ResizeWatch {
            observer,
            _callback: callback,
        });

        Ok(())
    }
}

fn search_mode(whole_word: bool) -> SearchMode {
    if whole_word {
        SearchMode::WholeWord
    } else {
        SearchMode::Substring
    }
}

/// Highlight the words of `query` in an element; returns the match count
#[wasm_bindgen]
pub fn highlight_query(container_id: &str, query: &str, whole_word: bool) -> Result<usize, JsValue> {
    let mut surface = DomSurface::new()?;
    Ok(QueryHighlighter::new(search_mode(whole_word)).highlight(&mut surface, container_id, query))
}

/// Remove search highlights from an element
#[wasm_bindgen]
pub fn clear_query(container_id: &str) -> Result<(), JsValue> {
    let mut surface = DomSurface::new()?;
    QueryHighlighter::default().clear(&mut surface, container_id);
    Ok(())
}
