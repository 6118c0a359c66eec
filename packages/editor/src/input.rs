//! Raw editing events as reported by the editable surface

use crate::block::{BlockId, ImageSource};
use serde::{Deserialize, Serialize};

/// Platform-independent key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Enter,
    Backspace,
    /// Anything the surface handles on its own
    Other,
}

impl Key {
    /// Parse a DOM-style key name
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "backspace" => Key::Backspace,
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
}

/// Content carried by a paste or drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Text { text: String },
    Image { image: ImageSource },
}

/// Low-level editing event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InputEvent {
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },

    Paste { payload: Payload },

    Drop { payload: Payload },

    /// The surface finished an ordinary text edit
    #[serde(rename_all = "camelCase")]
    TextChanged { block_id: BlockId, content: String },

    /// A file was supplied by the image picker
    ImageChosen { image: ImageSource },

    /// The image picker was dismissed without a file
    ImageChoiceCancelled,

    /// Delete affordance on a block (e.g. the image remove button)
    #[serde(rename_all = "camelCase")]
    RemoveRequested { block_id: BlockId },
}

impl InputEvent {
    pub fn key(key: Key) -> Self {
        InputEvent::KeyDown {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn shift(key: Key) -> Self {
        InputEvent::KeyDown {
            key,
            modifiers: Modifiers { shift: true },
        }
    }

    pub fn paste_image(image: ImageSource) -> Self {
        InputEvent::Paste {
            payload: Payload::Image { image },
        }
    }

    pub fn drop_image(image: ImageSource) -> Self {
        InputEvent::Drop {
            payload: Payload::Image { image },
        }
    }
}
