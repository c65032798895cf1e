//! Background fill colours.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// RGBA colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::WHITE
    }
}

impl FromStr for Rgba {
    type Err = ModelError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` (the `#` is optional) or a
    /// handful of named colours.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let named = match value.as_str() {
            "white" => Some(Rgba::WHITE),
            "black" => Some(Rgba::BLACK),
            "transparent" | "none" => Some(Rgba::TRANSPARENT),
            "red" => Some(Rgba([255, 0, 0, 255])),
            "green" => Some(Rgba([0, 128, 0, 255])),
            "blue" => Some(Rgba([0, 0, 255, 255])),
            "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let hex = value.strip_prefix('#').unwrap_or(&value);
        let invalid = || ModelError::invalid_option(format!("invalid background colour '{}'", s));
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut out = [0u8, 0, 0, 255];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                    out[i] = v * 17;
                }
                Ok(Rgba(out))
            }
            6 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
            8 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
            _ => Err(invalid()),
        }
    }
}
