use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use web_sys::HtmlImageElement;

use crate::config::MARKER_ICON_URL;

#[derive(Clone)]
pub struct MarkerIcon {
    pub image: HtmlImageElement,
}

pub const MARKER_SIZE: f64 = 32.0;
/// Pixel of the icon that sits on the marker position (bottom center).
pub const MARKER_ANCHOR: (f64, f64) = (16.0, 32.0);
/// Popup tip offset from the anchor.
pub const POPUP_OFFSET: (f64, f64) = (0.0, -32.0);

static MARKER_WARNED: AtomicBool = AtomicBool::new(false);

/// Screen rect `(x, y, w, h)` of the icon for an anchor at `(sx, sy)`.
pub fn marker_rect(sx: f64, sy: f64) -> (f64, f64, f64, f64) {
    (
        sx - MARKER_ANCHOR.0,
        sy - MARKER_ANCHOR.1,
        MARKER_SIZE,
        MARKER_SIZE,
    )
}

/// Where the popup's pointer tip goes for an anchor at `(sx, sy)`.
pub fn popup_anchor(sx: f64, sy: f64) -> (f64, f64) {
    (sx + POPUP_OFFSET.0, sy + POPUP_OFFSET.1)
}

fn warn_marker_once(message: &str) {
    if MARKER_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        web_sys::console::warn_1(&message.into());
    }
}

pub fn load_marker_icon(signal: RwSignal<Option<MarkerIcon>, LocalStorage>) {
    wasm_bindgen_futures::spawn_local(async move {
        let Ok(image) = HtmlImageElement::new() else {
            let _ = signal.try_set(None);
            warn_marker_once("Failed to create marker image element.");
            return;
        };
        image.set_src(MARKER_ICON_URL);
        match wasm_bindgen_futures::JsFuture::from(image.decode()).await {
            Ok(_) => {
                let _ = signal.try_set(Some(MarkerIcon { image }));
            }
            Err(err) => {
                let _ = signal.try_set(None);
                warn_marker_once(&format!("Failed to decode marker icon: {:?}", err));
            }
        }
    });
}
