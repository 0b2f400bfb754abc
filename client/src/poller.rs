use std::cell::{Cell, RefCell};

use chrono::Utc;
use gloo_timers::callback::Interval;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use carbon_map_shared::{
    DisplayState, FetchError, IntensitySnapshot, PollOutcome, TimeWindow, intensity_url,
};

use crate::config::ClientConfig;

/// Owns the repeating trigger. Dropping it cancels the interval.
struct PollLoop {
    _interval: Interval,
}

thread_local! {
    static POLL_LOOP: RefCell<Option<PollLoop>> = const { RefCell::new(None) };
    static POLL_CYCLE: Cell<u64> = const { Cell::new(0) };
}

/// Run one cycle now and then every `poll_interval_secs`. Replaces any
/// loop already running.
pub fn start(
    config: &ClientConfig,
    display: RwSignal<DisplayState>,
    last_started: RwSignal<Option<f64>>,
) {
    let api_base = config.api_base.clone();
    let window_minutes = config.window_minutes;
    let interval_ms = config.poll_interval_ms();
    POLL_LOOP.with(|slot| {
        start_loop(
            slot,
            move || run_cycle(&api_base, window_minutes, display, last_started),
            |cycle| PollLoop {
                _interval: Interval::new(interval_ms, cycle),
            },
        );
    });
    web_sys::console::info_1(
        &format!(
            "carbon poller started: every {}s, {}-minute window",
            config.poll_interval_secs, config.window_minutes
        )
        .into(),
    );
}

/// Cancel the repeating trigger. In-flight requests still finish but write
/// into disposed signals as a no-op.
pub fn stop() {
    POLL_LOOP.with(stop_loop);
}

/// Drops whatever loop `slot` holds, runs `cycle` once, then hands it to
/// `schedule` and keeps the returned handle.
fn start_loop<H, F>(slot: &RefCell<Option<H>>, cycle: F, schedule: impl FnOnce(F) -> H)
where
    F: Fn(),
{
    stop_loop(slot);
    cycle();
    let handle = schedule(cycle);
    *slot.borrow_mut() = Some(handle);
}

fn stop_loop<H>(slot: &RefCell<Option<H>>) {
    let previous = slot.borrow_mut().take();
    drop(previous);
}

fn next_cycle() -> u64 {
    POLL_CYCLE.with(|c| {
        let n = c.get().wrapping_add(1);
        c.set(n);
        n
    })
}

fn run_cycle(
    api_base: &str,
    window_minutes: i64,
    display: RwSignal<DisplayState>,
    last_started: RwSignal<Option<f64>>,
) {
    let cycle = next_cycle();
    let window = TimeWindow::ending_at_with(Utc::now(), window_minutes);
    let url = intensity_url(api_base, &window);
    let _ = last_started.try_set(Some(js_sys::Date::now()));

    spawn_local(async move {
        let result = fetch_snapshot(&url, window).await;
        let Some((outcome, line)) = display.try_update(|state| {
            let outcome = state.apply(result);
            let line = describe_outcome(cycle, &outcome, state);
            (outcome, line)
        }) else {
            return;
        };
        match outcome {
            PollOutcome::Updated { .. } => web_sys::console::info_1(&line.into()),
            PollOutcome::Retained { .. } => web_sys::console::warn_1(&line.into()),
        }
    });
}

pub async fn fetch_snapshot(
    url: &str,
    window: TimeWindow,
) -> Result<IntensitySnapshot, FetchError> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| FetchError::Network(format!("fetch error: {e}")))?;
    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::Network(format!("read error: {e}")))?;
    IntensitySnapshot::from_json(window, &body)
}

/// Console line for a finished cycle, with the running totals from `state`.
pub fn describe_outcome(cycle: u64, outcome: &PollOutcome, state: &DisplayState) -> String {
    let totals = format!("[{} ok / {} failed]", state.updates(), state.failures());
    match outcome {
        PollOutcome::Updated {
            regions,
            heat_points,
            dropped,
        } => format!(
            "carbon poll #{cycle}: {regions} regions ({dropped} dropped), {heat_points} heat points {totals}"
        ),
        PollOutcome::Retained {
            error,
            had_snapshot,
        } => {
            let kept = if *had_snapshot {
                "keeping previous snapshot"
            } else {
                "no data yet"
            };
            format!("carbon poll #{cycle} failed: {error}; {kept} {totals}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    const LONDON_AND_UNPLACED: &str = r#"{"data":[{"regions":[
        {"regionid": 13, "shortname": "London", "latitude": 51.5, "longitude": -0.1,
         "intensity": {"index": "high"}},
        {"regionid": 14, "shortname": "South East England", "longitude": 0.5,
         "intensity": {"index": "low"}}
    ]}]}"#;

    fn snapshot() -> IntensitySnapshot {
        IntensitySnapshot::from_json(TimeWindow::last_30_minutes(), LONDON_AND_UNPLACED).expect("parses")
    }

    /// Stand-in for the browser timer: keeps the tick callback and counts
    /// how often it was cancelled.
    struct FakeTimer {
        tick: Box<dyn Fn()>,
        cancelled: Rc<Cell<u32>>,
    }

    impl Drop for FakeTimer {
        fn drop(&mut self) {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }

    fn start_fake(
        slot: &RefCell<Option<FakeTimer>>,
        runs: &Rc<Cell<u32>>,
        cancelled: &Rc<Cell<u32>>,
    ) {
        let runs = runs.clone();
        let cancelled = cancelled.clone();
        start_loop(
            slot,
            move || runs.set(runs.get() + 1),
            |cycle| FakeTimer {
                tick: Box::new(cycle),
                cancelled,
            },
        );
    }

    #[test]
    fn runs_once_immediately_then_on_each_tick() {
        let slot = RefCell::new(None);
        let runs = Rc::new(Cell::new(0));
        let cancelled = Rc::new(Cell::new(0));

        start_fake(&slot, &runs, &cancelled);
        assert_eq!(runs.get(), 1);

        {
            let timer = slot.borrow();
            let timer = timer.as_ref().expect("loop is running");
            (timer.tick)();
            (timer.tick)();
        }
        assert_eq!(runs.get(), 3);
        assert_eq!(cancelled.get(), 0);
    }

    #[test]
    fn restart_and_stop_cancel_the_running_timer() {
        let slot = RefCell::new(None);
        let runs = Rc::new(Cell::new(0));
        let cancelled = Rc::new(Cell::new(0));

        start_fake(&slot, &runs, &cancelled);
        start_fake(&slot, &runs, &cancelled);
        assert_eq!(cancelled.get(), 1);
        assert_eq!(runs.get(), 2);
        assert!(slot.borrow().is_some());

        stop_loop(&slot);
        assert_eq!(cancelled.get(), 2);
        assert!(slot.borrow().is_none());

        stop_loop(&slot);
        assert_eq!(cancelled.get(), 2);
    }

    #[test]
    fn describes_successful_cycle() {
        let mut state = DisplayState::default();
        let outcome = state.apply(Ok(snapshot()));
        assert_eq!(
            describe_outcome(3, &outcome, &state),
            "carbon poll #3: 1 regions (1 dropped), 1 heat points [1 ok / 0 failed]"
        );
    }

    #[test]
    fn describes_failed_cycle() {
        let mut state = DisplayState::default();
        let outcome = state.apply(Err(FetchError::Network("fetch error: offline".into())));
        assert_eq!(
            describe_outcome(1, &outcome, &state),
            "carbon poll #1 failed: fetch error: offline; no data yet [0 ok / 1 failed]"
        );

        state.apply(Ok(snapshot()));
        let outcome = state.apply(Err(FetchError::Status(503)));
        assert_eq!(
            describe_outcome(7, &outcome, &state),
            "carbon poll #7 failed: HTTP 503; keeping previous snapshot [1 ok / 2 failed]"
        );
    }
}
