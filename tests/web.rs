// Browser tests: run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use cloud_hop::GameConfig;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

#[wasm_bindgen_test]
fn mount_renders_full_board() {
    let config = GameConfig { seed: Some(5), ..GameConfig::default() };
    cloud_hop::web::mount(config).unwrap();

    let doc = document();
    let grid = doc.get_element_by_id("grid").unwrap();
    assert_eq!(grid.children().length(), 25);
    assert_eq!(
        doc.get_element_by_id("level-indicator").unwrap().text_content().unwrap(),
        "Level: 1"
    );
    let play: web_sys::HtmlButtonElement =
        doc.get_element_by_id("play-btn").unwrap().dyn_into().unwrap();
    assert!(play.disabled());
    cloud_hop::web::unmount().unwrap();
}

#[wasm_bindgen_test]
fn clicking_a_tile_places_the_player() {
    let config = GameConfig { seed: Some(6), ..GameConfig::default() };
    cloud_hop::web::mount(config).unwrap();

    let doc = document();
    let tile: web_sys::HtmlElement =
        doc.get_element_by_id("grid").unwrap().children().item(12).unwrap().dyn_into().unwrap();
    tile.click();

    let tile = doc.get_element_by_id("grid").unwrap().children().item(12).unwrap();
    assert!(tile.class_list().contains("selected"));
    assert!(tile.query_selector(".character").unwrap().is_some());
    let play: web_sys::HtmlButtonElement =
        doc.get_element_by_id("play-btn").unwrap().dyn_into().unwrap();
    assert!(!play.disabled());
    cloud_hop::web::unmount().unwrap();
}

#[wasm_bindgen_test]
fn hop_class_clears_on_animation_end() {
    let config = GameConfig { seed: Some(7), ..GameConfig::default() };
    cloud_hop::web::mount(config).unwrap();

    let doc = document();
    let tile: web_sys::HtmlElement =
        doc.get_element_by_id("grid").unwrap().children().item(3).unwrap().dyn_into().unwrap();
    tile.click();

    let character = doc
        .get_element_by_id("grid")
        .unwrap()
        .children()
        .item(3)
        .unwrap()
        .query_selector(".character")
        .unwrap()
        .unwrap();
    assert!(character.class_list().contains("hopping"));
    let end = web_sys::Event::new("animationend").unwrap();
    character.dispatch_event(&end).unwrap();
    assert!(!character.class_list().contains("hopping"));
    cloud_hop::web::unmount().unwrap();
}

#[wasm_bindgen_test]
fn body_keeps_a_single_level_class() {
    let doc = document();
    let body = doc.body().unwrap();
    body.class_list().add_1("level-7").unwrap();
    let config = GameConfig { seed: Some(8), ..GameConfig::default() };
    cloud_hop::web::mount(config).unwrap();

    let classes = body.class_list();
    let levels: Vec<String> = (0..classes.length())
        .filter_map(|i| classes.item(i))
        .filter(|c| c.starts_with("level-"))
        .collect();
    assert_eq!(levels, vec!["level-1".to_string()]);
    cloud_hop::web::unmount().unwrap();
}
