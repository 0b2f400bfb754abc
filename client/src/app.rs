use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;

use carbon_map_shared::DisplayState;

use crate::canvas::{MapCanvas, MapLayers};
use crate::colors::rgba_css;
use crate::config::{
    ClientConfig, INTENSITY_MAP_CENTER, INTENSITY_MAP_ZOOM, MARKER_POSITION, STREET_MAP_CENTER,
    STREET_MAP_ZOOM,
};
use crate::icons::{self, MarkerIcon};
use crate::poller;
use crate::time_format::{format_clock, format_mmss, format_window, seconds_until_next};

const STREET_LAYERS: MapLayers = MapLayers {
    regions: false,
    marker: Some(MARKER_POSITION),
};
const INTENSITY_LAYERS: MapLayers = MapLayers {
    regions: true,
    marker: None,
};

struct TickIntervalBinding {
    window: web_sys::Window,
    interval_id: i32,
    _callback: wasm_bindgen::closure::Closure<dyn Fn()>,
}

thread_local! {
    static TICK_INTERVAL_BINDING: RefCell<Option<TickIntervalBinding>> = const { RefCell::new(None) };
}

fn clear_tick_interval() {
    TICK_INTERVAL_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            old.window.clear_interval_with_handle(old.interval_id);
        }
    });
}

/// Newtype wrappers so each signal has a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct Display(pub RwSignal<DisplayState>);
/// Key of the region circle under the cursor.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct MousePos(pub RwSignal<(f64, f64)>);
/// Wall clock in unix seconds, advanced once per second.
#[derive(Clone, Copy)]
pub(crate) struct Tick(pub RwSignal<i64>);
/// `Date.now()` of the most recent poll start.
#[derive(Clone, Copy)]
pub(crate) struct LastPollStarted(pub RwSignal<Option<f64>>);

#[component]
pub fn App() -> impl IntoView {
    let config = ClientConfig::from_location();
    let display = RwSignal::new(DisplayState::default());
    let hovered = RwSignal::new(None::<String>);
    let mouse_pos = RwSignal::new((0.0, 0.0));
    let tick = RwSignal::new(chrono::Utc::now().timestamp());
    let last_poll_started = RwSignal::new(None::<f64>);
    // Image handles are not `Send`, so this signal uses local storage.
    let marker_icon = RwSignal::new_local(None::<MarkerIcon>);

    provide_context(config.clone());
    provide_context(Display(display));
    provide_context(Hovered(hovered));
    provide_context(MousePos(mouse_pos));
    provide_context(Tick(tick));
    provide_context(LastPollStarted(last_poll_started));
    provide_context(marker_icon);

    icons::load_marker_icon(marker_icon);

    // 1-second clock for the status countdown and container resize checks
    Effect::new(move || {
        use wasm_bindgen::prelude::*;
        let Some(window) = web_sys::window() else {
            return;
        };
        clear_tick_interval();

        let cb = Closure::<dyn Fn()>::new(move || {
            let _ = tick.try_set(chrono::Utc::now().timestamp());
        });
        let Ok(interval_id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            1_000,
        ) else {
            return;
        };
        TICK_INTERVAL_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(TickIntervalBinding {
                window: window.clone(),
                interval_id,
                _callback: cb,
            });
        });
        on_cleanup(clear_tick_interval);
    });

    // Poll immediately on mount, then on the configured interval
    Effect::new(move || {
        poller::start(&config, display, last_poll_started);
        on_cleanup(poller::stop);
    });

    view! {
        <div style="padding: 16px 20px; font-family: 'Helvetica Neue', Arial, sans-serif; color: #222;">
            <h1 style="margin: 0 0 16px; font-size: 1.8rem;">"Carbon Intensity Map"</h1>
            <div style="margin-bottom: 20px;">
                <MapCanvas
                    center=STREET_MAP_CENTER
                    zoom=STREET_MAP_ZOOM
                    height="400px"
                    layers=STREET_LAYERS
                />
            </div>
            <StatusBar />
            <MapCanvas
                center=INTENSITY_MAP_CENTER
                zoom=INTENSITY_MAP_ZOOM
                height="80vh"
                layers=INTENSITY_LAYERS
            />
        </div>
        <Tooltip />
    }
}

/// Last successful update and time to the next poll. Fetch errors stay in
/// the console.
#[component]
fn StatusBar() -> impl IntoView {
    let Display(display) = expect_context();
    let Tick(tick) = expect_context();
    let LastPollStarted(last_started) = expect_context();
    let config: ClientConfig = expect_context();
    let interval_secs = config.poll_interval_secs;

    let summary = Memo::new(move |_| {
        display.with(|state| {
            state.current().map(|snapshot| {
                (
                    format_clock(snapshot.window.end),
                    format_window(snapshot.window.start, snapshot.window.end),
                    snapshot.overlays.len(),
                )
            })
        })
    });

    let countdown = move || {
        tick.track();
        let started = last_started.get()?;
        let remaining = seconds_until_next(started, js_sys::Date::now(), interval_secs);
        Some(format_mmss(remaining))
    };

    view! {
        <div style="display: flex; gap: 16px; align-items: baseline; margin-bottom: 8px; font-size: 0.85rem; color: #555;">
            {move || match summary.get() {
                Some((updated, window, regions)) => view! {
                    <span>"Last updated " <strong>{updated}</strong></span>
                    <span>{format!("Window {window}")}</span>
                    <span>{format!("{regions} regions")}</span>
                }.into_any(),
                None => view! { <span>"Waiting for data\u{2026}"</span> }.into_any(),
            }}
            {move || countdown().map(|left| view! {
                <span style="margin-left: auto; font-variant-numeric: tabular-nums;">
                    {format!("Next refresh in {left}")}
                </span>
            })}
        </div>
    }
}

/// Tooltip that follows the cursor while a region circle is hovered.
#[component]
fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let Display(display) = expect_context();
    let MousePos(mouse_pos) = expect_context();

    let tooltip_info = Memo::new(move |_| {
        let key = hovered.get()?;
        display.with(|state| {
            state
                .overlays()
                .iter()
                .find(|overlay| overlay.reading.key() == key)
                .map(|overlay| (overlay.tooltip_lines(), overlay.color.rgb()))
        })
    });

    view! {
        {move || {
            let Some((lines, (r, g, b))) = tooltip_info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            let mut lines = lines.into_iter();
            let title = lines.next().unwrap_or_default();
            let details = lines.collect::<Vec<_>>();
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #ffffff; border: 1px solid rgba(0,0,0,0.2); border-radius: 4px; box-shadow: 0 2px 8px rgba(0,0,0,0.25); display: flex; flex-direction: row; overflow: hidden; max-width: 260px;"
                >
                    <div style={format!("width: 4px; flex-shrink: 0; background: {};", rgba_css(r, g, b, 0.9))} />
                    <div style="padding: 6px 10px; font-size: 0.8rem; line-height: 1.4;">
                        <div style="font-weight: 700;">{title}</div>
                        {details
                            .into_iter()
                            .map(|line| view! { <div style="color: #444;">{line}</div> })
                            .collect_view()}
                    </div>
                </div>
            }.into_any()
        }}
    }
}
