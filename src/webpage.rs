//! Live-DOM page adapter for browser builds.
//!
//! Compiled only for `wasm32`; the embedding script owns message framing
//! and drives the controller directly. Every accessor re-queries the
//! document, matching the host page's habit of replacing the audio element
//! and re-rendering the listing.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlAnchorElement, HtmlAudioElement, HtmlElement, HtmlImageElement,
    MutationObserver, MutationObserverInit,
};

use crate::page::{
    AudioElement, BindingState, PageDocument, RawListingEntry, ALBUM_LINK_SELECTOR,
    ARTIST_SELECTOR, AUDIO_SELECTOR, COLLECT_ITEM_ATTR, CONTROLS_SELECTOR, COVER_SELECTOR,
    FAV_TRACK_SELECTOR, ITEM_ID_ATTR, ITEM_TYPE_ATTR, LISTING_SELECTOR, TITLE_SELECTOR,
    TRACK_ID_ATTR, TRACK_LINK_SELECTOR,
};

/// Expando marker recording that a completion handler is already attached
/// to a given element.
const BOUND_MARKER: &str = "__trackloopCompletionBound";

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn select_first(selector: &str) -> Option<Element> {
    document()?.query_selector(selector).ok()?
}

/// Handle to the page's `<audio>` element.
pub struct WebAudio {
    element: HtmlAudioElement,
}

impl AudioElement for WebAudio {
    fn source_url(&self) -> Option<String> {
        let source = self.element.src();
        if source.is_empty() {
            None
        } else {
            Some(source)
        }
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn has_ended(&self) -> bool {
        self.element.ended()
    }

    fn play(&self) {
        // Resolution of the play promise is the host player's business.
        let _ = self.element.play();
    }

    fn pause(&self) {
        let _ = self.element.pause();
    }

    fn completion_binding(&self) -> BindingState {
        let bound = Reflect::get(self.element.as_ref(), &JsValue::from_str(BOUND_MARKER))
            .ok()
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if bound {
            BindingState::Bound
        } else {
            BindingState::Unbound
        }
    }

    fn attach_completion_handler(&self, handler: Box<dyn Fn() + Send + Sync>) {
        let closure = Closure::<dyn FnMut()>::new(move || handler());
        if self
            .element
            .add_event_listener_with_callback("ended", closure.as_ref().unchecked_ref())
            .is_ok()
        {
            // The listener lives as long as the element; release the Rust
            // side of the closure to the page.
            closure.forget();
            let _ = Reflect::set(
                self.element.as_ref(),
                &JsValue::from_str(BOUND_MARKER),
                &JsValue::TRUE,
            );
        }
    }
}

/// [`PageDocument`] over the real browser DOM.
#[derive(Default)]
pub struct WebPage;

impl WebPage {
    pub fn new() -> WebPage {
        WebPage
    }
}

impl PageDocument for WebPage {
    type Audio = WebAudio;

    fn audio(&self) -> Option<WebAudio> {
        let element = select_first(AUDIO_SELECTOR)?;
        let element = element.dyn_into::<HtmlAudioElement>().ok()?;
        Some(WebAudio { element })
    }

    fn collect_item_code(&self) -> Option<String> {
        select_first(CONTROLS_SELECTOR)?.get_attribute(COLLECT_ITEM_ATTR)
    }

    fn listing_entries(&self) -> Vec<RawListingEntry> {
        let Some(document) = document() else {
            return Vec::new();
        };
        let Ok(rows) = document.query_selector_all(LISTING_SELECTOR) else {
            return Vec::new();
        };
        let mut entries = Vec::with_capacity(rows.length() as usize);
        for index in 0..rows.length() {
            let Some(row) = rows.item(index) else {
                continue;
            };
            let Some(row) = row.dyn_ref::<Element>() else {
                continue;
            };
            entries.push(RawListingEntry {
                track_id: row.get_attribute(TRACK_ID_ATTR),
                item_id: row.get_attribute(ITEM_ID_ATTR),
                item_type: row.get_attribute(ITEM_TYPE_ATTR),
                title_text: nested_text(row, TITLE_SELECTOR),
                artist_text: nested_text(row, ARTIST_SELECTOR),
                fav_track_text: nested_text(row, FAV_TRACK_SELECTOR),
                album_link: nested_anchor_href(row, ALBUM_LINK_SELECTOR),
                cover_src: nested_image_src(row, COVER_SELECTOR),
            });
        }
        entries
    }

    fn click_track_link(&self, index: usize) {
        let Some(document) = document() else {
            return;
        };
        let Ok(links) = document.query_selector_all(TRACK_LINK_SELECTOR) else {
            return;
        };
        if let Some(link) = links.item(index as u32) {
            if let Some(link) = link.dyn_ref::<HtmlElement>() {
                link.click();
            }
        }
    }

    fn open_in_new_context(&self, url: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.open_with_url_and_target(url, "_blank");
        }
    }

    fn observe_mutations(&self, mut callback: Box<dyn FnMut() -> bool + Send>) {
        let Some(document) = document() else {
            return;
        };
        let Some(body) = document.body() else {
            return;
        };

        // The closure owns one half of the slot so it can disconnect the
        // observer from inside its own invocation.
        let observer_slot: Rc<RefCell<Option<MutationObserver>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&observer_slot);
        let closure = Closure::<dyn FnMut()>::new(move || {
            if callback() {
                if let Some(observer) = slot.borrow_mut().take() {
                    observer.disconnect();
                }
            }
        });

        let Ok(observer) = MutationObserver::new(closure.as_ref().unchecked_ref()) else {
            return;
        };
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        if observer.observe_with_options(&body, &options).is_ok() {
            observer_slot.borrow_mut().replace(observer);
            closure.forget();
        }
    }
}

fn nested_element(row: &Element, selector: &str) -> Option<Element> {
    row.query_selector(selector).ok()?
}

fn nested_text(row: &Element, selector: &str) -> Option<String> {
    nested_element(row, selector)?.text_content()
}

fn nested_anchor_href(row: &Element, selector: &str) -> Option<String> {
    let anchor = nested_element(row, selector)?
        .dyn_into::<HtmlAnchorElement>()
        .ok()?;
    Some(anchor.href())
}

fn nested_image_src(row: &Element, selector: &str) -> Option<String> {
    let image = nested_element(row, selector)?
        .dyn_into::<HtmlImageElement>()
        .ok()?;
    Some(image.src())
}
