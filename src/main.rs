//! ChronoCrafters entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use chrono_crafters::ads::AdGate;
    use chrono_crafters::hint::{self, Offline};
    use chrono_crafters::platform::LocalStorageStore;
    use chrono_crafters::session::{FrameTicket, LoopAction};
    use chrono_crafters::sim::{Direction, ObjectKind};
    use chrono_crafters::{App, HintError, LevelCatalog, Phase, SessionEvent};

    /// Simulated ad length
    const AD_MILLIS: i32 = 3000;

    /// Ad gate that just waits, standing in for a real ad SDK
    struct TimedGate {
        millis: i32,
    }

    impl AdGate for TimedGate {
        async fn rewarded(&self) {
            log::info!("Simulating rewarded ad...");
            sleep(self.millis).await;
        }

        async fn interstitial(&self) {
            log::info!("Simulating interstitial ad...");
            sleep(self.millis).await;
        }
    }

    async fn sleep(millis: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().is_some_and(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .is_ok()
            });
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }

    /// Game state
    struct Game {
        app: App<LocalStorageStore>,
        /// Pending animation frame and the ticket it carries
        scheduled: Option<(i32, FrameTicket)>,
        hint_pending: bool,
        message: String,
    }

    impl Game {
        fn new() -> Self {
            Self {
                app: App::new(LevelCatalog::builtin(), LocalStorageStore::open()),
                scheduled: None,
                hint_pending: false,
                message: String::new(),
            }
        }

        /// First level not yet completed
        fn first_open_level(&self) -> Option<String> {
            let catalog = self.app.catalog();
            catalog
                .iter()
                .find(|level| !self.app.progress().is_completed(&level.id))
                .or_else(|| catalog.first())
                .map(|level| level.id.clone())
        }

        fn handle_events(&mut self) {
            for event in self.app.process_events() {
                self.message = match event {
                    SessionEvent::Started => "Level started!".to_string(),
                    SessionEvent::Reset => "Level reset.".to_string(),
                    SessionEvent::Pressed { id } => format!("{id} pressed"),
                    SessionEvent::RewindSucceeded {
                        restored_time,
                        charges_left,
                    } => format!("Rewound to {restored_time:.1}s ({charges_left} charges left)"),
                    SessionEvent::RewindFailed(e) => format!("Rewind failed: {e}"),
                    SessionEvent::Won(result) => format!(
                        "Level complete in {:.1}s! {} stars",
                        result.time_taken, result.stars
                    ),
                    SessionEvent::Lost { object } => format!("The {object} shattered!"),
                };
            }
        }

        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let set = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };

            set("hud-message", &self.message);
            let Some(session) = self.app.session() else {
                set("hud-level", "Select a level");
                return;
            };
            let level = session.level();
            set("hud-level", &level.name);
            set("hud-goal", &level.goal);
            set("hud-time", &format!("{:.1}", session.sim_time()));
            set(
                "hud-charges",
                &format!("{}/{}", session.rewind_charges(), level.rewind_charges),
            );
            let policy = session.policy();
            set(
                "hud-policy",
                &format!("x{} {:?}", policy.global_speed, policy.direction),
            );
            set("hud-phase", phase_label(session.phase()));
            let history = session.history();
            set(
                "hud-history",
                &format!("{}/{}", history.len(), history.capacity()),
            );

            let objects: Vec<String> = session
                .objects()
                .iter()
                .map(|obj| {
                    let state = match &obj.kind {
                        ObjectKind::Plant { growth_stage, .. } => {
                            format!("{:.0}%", growth_stage * 100.0)
                        }
                        ObjectKind::Button { pressed: true, .. } => "pressed".to_string(),
                        ObjectKind::Button { .. } => "up".to_string(),
                        ObjectKind::Movable { shattered: true, .. } => "shattered".to_string(),
                        _ => format!("y={:.0}", obj.pos.y),
                    };
                    format!("{}: {}", obj.id, state)
                })
                .collect();
            set("hud-objects", &objects.join(" | "));
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("ChronoCrafters starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document, cannot start");
            return;
        };
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let game = Rc::new(RefCell::new(Game::new()));
        let first = game.borrow().first_open_level();
        if let Some(id) = first {
            select_level(game.clone(), id).await;
        }

        setup_input_handlers(game.clone());
        setup_level_buttons(game.clone());
        setup_auto_pause(game.clone());

        game.borrow().update_hud();
        log::info!("ChronoCrafters running!");
    }

    /// Run the interstitial gate if due, then open the level
    async fn select_level(game: Rc<RefCell<Game>>, id: String) {
        let due = {
            let mut g = game.borrow_mut();
            g.app.back_to_select();
            match g.app.begin_selection(&id) {
                Ok(due) => due,
                Err(e) => {
                    log::warn!("Cannot select level: {e}");
                    return;
                }
            }
        };
        sync_loop(&game);
        if due {
            TimedGate { millis: AD_MILLIS }.interstitial().await;
        }

        let mut g = game.borrow_mut();
        if let Err(e) = g.app.enter_level(&id) {
            log::warn!("Cannot enter level: {e}");
        }
        g.message = "Press Enter to start".to_string();
        g.update_hud();
    }

    async fn show_hint(game: Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            if g.hint_pending {
                return;
            }
            g.hint_pending = true;
            g.message = "Watching an ad for a hint...".to_string();
            g.update_hud();
        }

        let gate = TimedGate { millis: AD_MILLIS };
        let text = hint::request_hint(&gate, &Offline, || {
            let g = game.borrow();
            g.app
                .session()
                .ok_or(HintError::MissingPrompt)
                .and_then(hint::build_prompt)
        })
        .await;

        let mut g = game.borrow_mut();
        g.hint_pending = false;
        g.message = format!("Hint: {text}");
        g.update_hud();
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let key = event.key();
            match key.as_str() {
                "n" | "N" => {
                    let next = game.borrow().app.next_level_id();
                    if let Some(id) = next {
                        wasm_bindgen_futures::spawn_local(select_level(game.clone(), id));
                    }
                    return;
                }
                "h" | "H" | "?" => {
                    wasm_bindgen_futures::spawn_local(show_hint(game.clone()));
                    return;
                }
                _ => {}
            }

            {
                let mut g = game.borrow_mut();
                let rewind_seconds = g.app.settings().rewind_seconds;
                let Some(session) = g.app.session_mut() else {
                    return;
                };
                match key.as_str() {
                    "Enter" => session.start(),
                    "Backspace" => session.reset(),
                    "Escape" => {
                        if !session.pause() {
                            session.resume();
                        }
                    }
                    "0" => {
                        session.set_global_speed(0.0);
                    }
                    "1" => {
                        session.set_global_speed(0.5);
                    }
                    "2" => {
                        session.set_global_speed(1.0);
                    }
                    "3" => {
                        session.set_global_speed(2.0);
                    }
                    "d" | "D" => {
                        let direction = match session.policy().direction {
                            Direction::Forward => Direction::Reverse,
                            Direction::Reverse => Direction::Forward,
                        };
                        session.set_direction(direction);
                    }
                    "p" | "P" => {
                        let target = session
                            .objects()
                            .iter()
                            .find(|o| o.is_pausable())
                            .map(|o| o.id.clone());
                        if let Some(id) = target {
                            session.toggle_paused(&id);
                        }
                    }
                    "z" | "Z" => {
                        let _ = session.rewind(rewind_seconds);
                    }
                    "a" | "A" => {
                        session.press("button-A");
                    }
                    "b" | "B" => {
                        session.press("button-B");
                    }
                    _ => return,
                }
                g.handle_events();
                g.update_hud();
            }
            sync_loop(&game);
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Level select buttons: `#select-<level id>`
    fn setup_level_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let ids: Vec<String> = game
            .borrow()
            .app
            .catalog()
            .iter()
            .map(|level| level.id.clone())
            .collect();
        for id in ids {
            let Some(btn) = document.get_element_by_id(&format!("select-{id}")) else {
                continue;
            };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                wasm_bindgen_futures::spawn_local(select_level(game.clone(), id.clone()));
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Schedule, replace or cancel the animation frame to match the session
    fn sync_loop(game: &Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let mut g = game.borrow_mut();
        let pending = g.scheduled.map(|(_, ticket)| ticket);
        let action = match g.app.session() {
            Some(session) => session.loop_action(pending),
            None if pending.is_some() => LoopAction::Cancel,
            None => LoopAction::Keep,
        };
        match action {
            LoopAction::Keep => {}
            LoopAction::Cancel => {
                if let Some((id, _)) = g.scheduled.take() {
                    let _ = window.cancel_animation_frame(id);
                }
            }
            LoopAction::Schedule(ticket) => {
                if let Some((id, _)) = g.scheduled.take() {
                    let _ = window.cancel_animation_frame(id);
                }
                g.scheduled =
                    request_animation_frame(game.clone(), ticket).map(|id| (id, ticket));
            }
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>, ticket: FrameTicket) -> Option<i32> {
        let window = web_sys::window()?;
        let closure = Closure::once(move |time: f64| {
            game_loop(game, ticket, time);
        });
        let id = window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .ok();
        closure.forget();
        id
    }

    fn game_loop(game: Rc<RefCell<Game>>, ticket: FrameTicket, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.scheduled = None;
            // Stale tickets are rejected; the loop is still resynced below
            let ran = g
                .app
                .session_mut()
                .is_some_and(|session| session.frame(ticket, time / 1000.0));
            if ran {
                g.handle_events();
                g.update_hud();
            }
        }

        sync_loop(&game);
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let pause = move |game: &Rc<RefCell<Game>>, reason: &str| {
            let paused = {
                let mut g = game.borrow_mut();
                g.app.session_mut().is_some_and(|s| s.pause())
            };
            if paused {
                log::info!("Auto-paused ({reason})");
                sync_loop(game);
                game.borrow().update_hud();
            }
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    pause(&game, "tab hidden");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                pause(&game, "window blur");
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn phase_label(phase: Phase) -> &'static str {
        match phase {
            Phase::Idle => "Ready",
            Phase::Running => "Running",
            Phase::Paused => "Paused",
            Phase::Rewinding { .. } => "Rewinding",
            Phase::Won => "Won",
            Phase::Lost => "Lost",
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("ChronoCrafters (native) starting...");
    log::info!("Playing the built-in levels headless - run with `trunk serve` for the web version");

    play_headless();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted run through every built-in level at 60 fps
#[cfg(not(target_arch = "wasm32"))]
fn play_headless() {
    use chrono_crafters::platform::MemoryStore;
    use chrono_crafters::{App, LevelCatalog, Phase, SessionEvent};

    const FRAME: f64 = 1.0 / 60.0;
    const MAX_SECONDS: f64 = 120.0;

    let mut app = App::new(LevelCatalog::builtin(), MemoryStore::default());
    let ids: Vec<String> = app.catalog().iter().map(|l| l.id.clone()).collect();

    for id in ids {
        let session = match app.enter_level(&id) {
            Ok(session) => session,
            Err(e) => {
                log::error!("{e}");
                continue;
            }
        };
        session.start();

        let mut now = 0.0;
        let mut pressed_a = false;
        while session.is_looping() && now < MAX_SECONDS {
            let Some(ticket) = session.frame_ticket() else {
                break;
            };
            session.frame(ticket, now);
            now += FRAME;

            // Level 2: press A, then B a few frames later
            if !pressed_a && session.press("button-A") {
                pressed_a = true;
            } else if pressed_a && session.sim_time() > 0.05 {
                session.press("button-B");
            }
        }

        let phase = session.phase();
        for event in app.process_events() {
            match event {
                SessionEvent::Won(result) => log::info!(
                    "{}: won in {:.1}s, {} stars",
                    result.level_id,
                    result.time_taken,
                    result.stars
                ),
                SessionEvent::Lost { object } => log::info!("{id}: lost, {object} shattered"),
                _ => {}
            }
        }
        if phase != Phase::Won && phase != Phase::Lost {
            log::warn!("{id}: unresolved after {MAX_SECONDS}s ({phase:?})");
        }
    }

    log::info!(
        "Completed {} of {} levels",
        app.progress().completed().len(),
        app.catalog().len()
    );
}
