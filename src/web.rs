//! Browser front end: DOM rendering, click wiring and timers.
//!
//! The controller lives in a thread-local slot (one game per page). DOM
//! listeners borrow it for the duration of one event; timers scheduled from
//! inside a borrow only fire after it has been released.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, window};

use crate::board::levels::GameConfig;
use crate::board::sampling::FallSchedule;
use crate::board::{BOARD_TILES, TileId, TileView};
use crate::error::GameError;
use crate::game::{Display, GameController, Input, RunState};

const GRID_ID: &str = "grid";
const LEVEL_ID: &str = "level-indicator";
const MESSAGE_ID: &str = "message";
const PLAY_ID: &str = "play-btn";
const RESET_ID: &str = "reset-btn";
const BG_FROM_ID: &str = "bg-layer-from";
const BG_TO_ID: &str = "bg-layer-to";

const PLAYER_GLYPH: &str = "🧍";
const LEVEL_CLASS_PREFIX: &str = "level-";

/// Sky per level, brightest first; level 4 is night.
const SKY_GRADIENTS: [&str; 4] = [
    "linear-gradient(to bottom, #87CEEB, #E0F7FA)",
    "linear-gradient(to bottom, #4FC3F7, #81D4FA)",
    "linear-gradient(to bottom, #1A237E, #3949AB)",
    "linear-gradient(to bottom, #0a0a2e, #1A237E)",
];

const BASE_CSS: &str = "
#grid { display:grid; grid-template-columns:repeat(5, 64px); gap:10px; justify-content:center; }
.tile { width:64px; height:64px; border-radius:32px; background:#fff; cursor:pointer; display:flex; align-items:center; justify-content:center; transition:transform 0.8s ease-in, opacity 0.8s ease-in; }
.tile.selected { box-shadow:0 0 0 3px #ffd166; }
.tile.fallen { visibility:hidden; }
.tile.falling, .character.falling { transform:translateY(120vh); opacity:0; }
.character { font-size:32px; transition:transform 0.8s ease-in, opacity 0.8s ease-in; }
.character.hopping { animation:hc-hop 0.4s ease-out; }
@keyframes hc-hop { 50% { transform:translateY(-18px); } }
.bg-layer { position:fixed; inset:0; z-index:-2; transition:opacity 1.2s ease; }
.star { position:fixed; border-radius:50%; background:#fff; z-index:-1; display:none; animation:hc-twinkle 3s ease-in-out infinite; }
.satellite { position:fixed; z-index:-1; display:none; animation-name:hc-drift; animation-timing-function:linear; animation-iteration-count:infinite; }
@keyframes hc-twinkle { 0%, 100% { opacity:0.3; } 50% { opacity:1; } }
@keyframes hc-drift { from { transform:translateX(-10vw); } to { transform:translateX(110vw); } }
body.level-4 .star, body.level-4 .satellite { display:block; }
";

type WebGame = GameController<DomDisplay, StdRng>;

thread_local! {
    static GAME: std::cell::RefCell<Option<WebGame>> = const { std::cell::RefCell::new(None) };
    // Listeners outlive the game they were bound for; a remount reuses them.
    static LISTENERS_BOUND: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
    // Last fall id handed out on this page; survives unmount so old timers stay stale.
    static LAST_FALL_ID: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
}

/// Runs `f` against the mounted game, if any.
fn with_game(f: impl FnOnce(&mut WebGame)) {
    GAME.with(|cell| {
        if let Some(game) = cell.borrow_mut().as_mut() {
            f(game);
        }
    });
}

/// `Display` backed by the page's DOM.
pub struct DomDisplay {
    document: Document,
    body: HtmlElement,
    grid: HtmlElement,
    level_text: HtmlElement,
    message: HtmlElement,
    play_btn: HtmlElement,
    reset_btn: HtmlElement,
    bg_from: HtmlElement,
    bg_to: HtmlElement,
    /// Which background layer is currently visible.
    from_layer_front: bool,
}

impl DomDisplay {
    fn mount(document: Document) -> Result<Self, JsValue> {
        let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;
        ensure_stylesheet(&document, &body)?;
        let bg_from = ensure_element(&document, &body, BG_FROM_ID, "div")?;
        let bg_to = ensure_element(&document, &body, BG_TO_ID, "div")?;
        bg_from.class_list().add_1("bg-layer")?;
        bg_to.class_list().add_1("bg-layer")?;
        let level_text = ensure_element(&document, &body, LEVEL_ID, "div")?;
        let message = ensure_element(&document, &body, MESSAGE_ID, "div")?;
        let grid = ensure_element(&document, &body, GRID_ID, "div")?;
        let play_btn = ensure_element(&document, &body, PLAY_ID, "button")?;
        let reset_btn = ensure_element(&document, &body, RESET_ID, "button")?;
        play_btn.set_text_content(Some("Play"));
        reset_btn.set_text_content(Some("Play Again"));

        let display = Self {
            document,
            body,
            grid,
            level_text,
            message,
            play_btn,
            reset_btn,
            bg_from,
            bg_to,
            from_layer_front: true,
        };
        display.paint_sky_immediately(1)?;
        Ok(display)
    }

    fn paint_sky_immediately(&self, level: u8) -> Result<(), JsValue> {
        let gradient = sky_for(level);
        self.bg_from.style().set_property("background", gradient)?;
        self.bg_to.style().set_property("background", gradient)?;
        self.bg_from.style().set_property("opacity", "1")?;
        self.bg_to.style().set_property("opacity", "0")?;
        Ok(())
    }

    /// Cross-fades to the level's sky and swaps the `level-N` body class.
    fn fade_sky(&mut self, level: u8) -> Result<(), JsValue> {
        let gradient = sky_for(level);
        let (back, front) = if self.from_layer_front {
            (&self.bg_to, &self.bg_from)
        } else {
            (&self.bg_from, &self.bg_to)
        };
        back.style().set_property("background", gradient)?;
        back.style().set_property("opacity", "1")?;
        front.style().set_property("opacity", "0")?;
        self.from_layer_front = !self.from_layer_front;
        self.set_level_class(level)
    }

    fn set_level_class(&self, level: u8) -> Result<(), JsValue> {
        let classes = self.body.class_list();
        let present: Vec<String> = (0..classes.length()).filter_map(|i| classes.item(i)).collect();
        for name in level_classes(present.iter().map(String::as_str)) {
            classes.remove_1(name)?;
        }
        classes.add_1(&format!("{LEVEL_CLASS_PREFIX}{}", level.max(1)))
    }

    fn tile_element(&self, tile: TileId) -> Option<Element> {
        self.grid.children().item(tile as u32)
    }

    fn build_tile(&self, view: &TileView) -> Result<Element, JsValue> {
        let tile = self.document.create_element("div")?;
        tile.class_list().add_1("tile")?;
        tile.set_attribute("data-index", &view.id.to_string())?;
        if view.is_fallen {
            tile.class_list().add_1("fallen")?;
        }
        if view.has_player {
            let character = self.document.create_element("div")?;
            character.class_list().add_1("character")?;
            character.set_text_content(Some(PLAYER_GLYPH));
            tile.append_child(&character)?;
            tile.class_list().add_1("selected")?;
        }
        Ok(tile)
    }
}

impl Display for DomDisplay {
    fn render_board(&mut self, tiles: &[TileView; BOARD_TILES]) {
        self.grid.set_inner_html("");
        for view in tiles {
            match self.build_tile(view) {
                Ok(el) => {
                    if let Err(err) = self.grid.append_child(&el) {
                        log::warn!("cannot attach tile {}: {err:?}", view.id);
                    }
                }
                Err(err) => log::warn!("cannot build tile {}: {err:?}", view.id),
            }
        }
    }

    fn show_message(&mut self, text: &str) {
        self.message.set_text_content(Some(text));
    }

    fn show_level(&mut self, level: u8) {
        self.level_text.set_text_content(Some(&format!("Level: {level}")));
        let res = if level == 1 {
            self.from_layer_front = true;
            self.paint_sky_immediately(1).and_then(|_| self.set_level_class(1))
        } else {
            self.fade_sky(level)
        };
        if let Err(err) = res {
            log::warn!("sky update failed: {err:?}");
        }
    }

    fn set_commit_enabled(&mut self, enabled: bool) {
        if let Some(btn) = self.play_btn.dyn_ref::<web_sys::HtmlButtonElement>() {
            btn.set_disabled(!enabled);
        }
    }

    fn set_run_state(&mut self, state: RunState) {
        let (play, reset) = match state {
            RunState::InProgress => ("inline-block", "none"),
            RunState::Ended => ("none", "inline-block"),
        };
        let res = self
            .play_btn
            .style()
            .set_property("display", play)
            .and_then(|_| self.reset_btn.style().set_property("display", reset));
        if let Err(err) = res {
            log::warn!("cannot toggle buttons: {err:?}");
        }
    }

    fn animate_fall(&mut self, schedule: &FallSchedule) {
        for fall in &schedule.tiles {
            if let Some(el) = self.tile_element(fall.tile) {
                set_timeout(fall.delay_ms, move || {
                    let _ = el.class_list().add_1("falling");
                });
            }
        }
        if let Some((tile, delay)) = schedule.player {
            let character = self
                .tile_element(tile)
                .and_then(|el| el.query_selector(".character").ok().flatten());
            if let Some(character) = character {
                set_timeout(delay, move || {
                    let _ = character.class_list().add_1("falling");
                });
            }
        }
        let id = schedule.id;
        set_timeout(schedule.settle_after_ms, move || with_game(|game| game.settle_fall(id)));
    }

    fn schedule_advance(&mut self, id: u32, delay_ms: u32) {
        set_timeout(delay_ms as f64, move || with_game(|game| game.advance_level(id)));
    }

    fn hop(&mut self, tile: TileId) {
        let character = self
            .tile_element(tile)
            .and_then(|el| el.query_selector(".character").ok().flatten());
        let Some(character) = character else { return };
        // restart the animation if a hop is still running
        let _ = character.class_list().remove_1("hopping");
        let target = character.clone();
        let res = add_once_listener(&character, "animationend", move || {
            let _ = target.class_list().remove_1("hopping");
        })
        .and_then(|_| character.class_list().add_1("hopping"));
        if let Err(err) = res {
            log::warn!("hop on tile {tile} failed: {err:?}");
        }
    }
}

/// Body classes that carry a level marker.
fn level_classes<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    names.filter(|name| name.starts_with(LEVEL_CLASS_PREFIX)).collect()
}

fn sky_for(level: u8) -> &'static str {
    level
        .checked_sub(1)
        .and_then(|i| SKY_GRADIENTS.get(i as usize))
        .copied()
        .unwrap_or(SKY_GRADIENTS[0])
}

fn ensure_element(
    doc: &Document,
    parent: &HtmlElement,
    id: &str,
    tag: &str,
) -> Result<HtmlElement, JsValue> {
    if let Some(el) = doc.get_element_by_id(id) {
        return el.dyn_into::<HtmlElement>().map_err(|_| JsValue::from_str(id));
    }
    let el: HtmlElement = doc.create_element(tag)?.dyn_into()?;
    el.set_id(id);
    parent.append_child(&el)?;
    Ok(el)
}

fn ensure_stylesheet(doc: &Document, body: &HtmlElement) -> Result<(), JsValue> {
    if doc.get_element_by_id("hc-cloud-style").is_some() {
        return Ok(());
    }
    let style = doc.create_element("style")?;
    style.set_id("hc-cloud-style");
    style.set_text_content(Some(BASE_CSS));
    body.append_child(&style)?;
    Ok(())
}

/// Listener removed by the browser after its first call.
fn add_once_listener(
    target: &Element,
    event: &str,
    f: impl FnOnce() + 'static,
) -> Result<(), JsValue> {
    let opts = web_sys::AddEventListenerOptions::new();
    opts.set_once(true);
    let cb = Closure::once_into_js(f);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        cb.unchecked_ref(),
        &opts,
    )
}

fn set_timeout(delay_ms: f64, f: impl FnOnce() + 'static) {
    let Some(win) = window() else { return };
    let cb = Closure::once_into_js(f);
    if let Err(err) = win
        .set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), delay_ms as i32)
    {
        log::error!("setTimeout failed: {err:?}");
    }
}

/// Night-sky decoration, only visible at level 4 through the body class.
fn create_background_elements(
    doc: &Document,
    body: &HtmlElement,
    rng: &mut impl Rng,
) -> Result<(), JsValue> {
    if doc.get_element_by_id("stars-container").is_some() {
        return Ok(());
    }
    let stars = doc.create_element("div")?;
    stars.set_id("stars-container");
    for _ in 0..150 {
        let star: HtmlElement = doc.create_element("div")?.dyn_into()?;
        star.class_list().add_1("star")?;
        let size = rng.gen_range(1.0..3.0);
        let style = star.style();
        style.set_property("left", &format!("{}vw", rng.gen_range(0.0..100.0)))?;
        style.set_property("top", &format!("{}vh", rng.gen_range(0.0..100.0)))?;
        style.set_property("animation-delay", &format!("{}s", rng.gen_range(0.0..3.0)))?;
        style.set_property("width", &format!("{size}px"))?;
        style.set_property("height", &format!("{size}px"))?;
        stars.append_child(&star)?;
    }
    body.insert_before(&stars, body.first_child().as_ref())?;

    let satellites = doc.create_element("div")?;
    satellites.set_id("satellites-container");
    for _ in 0..2 {
        let sat: HtmlElement = doc.create_element("div")?.dyn_into()?;
        sat.class_list().add_1("satellite")?;
        sat.set_text_content(Some("🛰️"));
        let style = sat.style();
        style.set_property("top", &format!("{}vh", 10.0 + rng.gen_range(0.0..30.0)))?;
        style.set_property("left", &format!("{}vw", rng.gen_range(0.0..90.0)))?;
        let (delay, duration) = satellite_timing(rng);
        style.set_property("animation-delay", &format!("{delay}s"))?;
        style.set_property("animation-duration", &format!("{duration}s"))?;
        satellites.append_child(&sat)?;
    }
    body.insert_before(&satellites, body.first_child().as_ref())?;
    Ok(())
}

/// Start offset and orbit time of one satellite, in seconds.
fn satellite_timing(rng: &mut impl Rng) -> (f64, f64) {
    (rng.gen_range(0.0..10.0), rng.gen_range(20.0..30.0))
}

fn add_click_listener(
    target: &Element,
    handler: impl FnMut(web_sys::MouseEvent) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    target.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Tile id of the clicked cloud, if the click landed on one.
fn clicked_tile(evt: &web_sys::MouseEvent) -> Option<TileId> {
    let target: Element = evt.target()?.dyn_into().ok()?;
    let tile = target.closest(".tile").ok()??;
    tile.get_attribute("data-index")?.parse().ok()
}

/// Mounts the game on the page and starts the first run.
pub fn mount(config: GameConfig) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let display = DomDisplay::mount(doc.clone())?;
    create_background_elements(&doc, &display.body, &mut rng)?;

    // Grid listener is delegated so re-rendering tiles never re-binds.
    let grid: Element = display.grid.clone().into();
    let play: Element = display.play_btn.clone().into();
    let reset: Element = display.reset_btn.clone().into();

    let mut game = GameController::new(config, display, rng).map_err(JsValue::from)?;
    retire_game();
    game.continue_fall_ids_from(LAST_FALL_ID.with(|last| last.get()));
    GAME.with(|cell| cell.replace(Some(game)));

    if !LISTENERS_BOUND.with(|bound| bound.replace(true)) {
        bind_inputs(&grid, &play, &reset)?;
    }

    with_game(|game| game.start_run());
    log::info!("cloud board mounted");
    Ok(())
}

fn bind_inputs(grid: &Element, play: &Element, reset: &Element) -> Result<(), JsValue> {
    add_click_listener(grid, |evt| {
        if let Some(id) = clicked_tile(&evt) {
            with_game(|game| {
                game.handle(Input::SelectTile(id));
            });
        }
    })?;
    add_click_listener(play, |_| {
        with_game(|game| {
            game.handle(Input::Play);
        })
    })?;
    add_click_listener(reset, |_| {
        with_game(|game| {
            game.handle(Input::Restart);
        })
    })
}

/// Takes the mounted game out of its slot, remembering its last fall id.
fn retire_game() -> Option<WebGame> {
    let old = GAME.with(|cell| cell.replace(None))?;
    LAST_FALL_ID.with(|last| last.set(old.last_fall_id()));
    Some(old)
}

/// Drops the mounted game (used by browser tests).
pub fn unmount() -> Result<(), GameError> {
    retire_game()
        .map(|_| ())
        .ok_or_else(|| GameError::Dom("no game mounted".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_classes_picks_every_level_marker() {
        let names = ["night", "level-2", "level-9", "levels", "level-"];
        assert_eq!(level_classes(names.into_iter()), vec!["level-2", "level-9", "level-"]);
        assert!(level_classes(["sky"].into_iter()).is_empty());
    }

    #[test]
    fn test_satellite_timing_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let (delay, duration) = satellite_timing(&mut rng);
            assert!((0.0..10.0).contains(&delay));
            assert!((20.0..30.0).contains(&duration));
        }
    }

    #[test]
    fn test_sky_for_falls_back_to_day() {
        assert_eq!(sky_for(4), SKY_GRADIENTS[3]);
        assert_eq!(sky_for(0), SKY_GRADIENTS[0]);
        assert_eq!(sky_for(9), SKY_GRADIENTS[0]);
    }
}
