//! DOM `KeyboardEvent.key` names

use teaview_core::Key;

pub fn key_from_dom(name: &str) -> Option<Key> {
    match name {
        "ArrowUp" => Some(Key::ArrowUp),
        "ArrowDown" => Some(Key::ArrowDown),
        "ArrowLeft" => Some(Key::ArrowLeft),
        "ArrowRight" => Some(Key::ArrowRight),
        "a" | "A" => Some(Key::A),
        "d" | "D" => Some(Key::D),
        _ => None,
    }
}
