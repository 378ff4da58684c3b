//! =============================================================================
//! COMMON.RS - Types et fonctions de couleur partagés
//! COMMON.RS - Shared color types and functions
//! =============================================================================
//!
//! Ce module contient la conversion RGB ⇄ hexadécimal et la couleur échantillonnée.
//! This module contains RGB ⇄ hex conversion and the sampled color.

use crate::errors::ColorError;

// =============================================================================
// COULEUR ÉCHANTILLONNÉE
// SAMPLED COLOR
// =============================================================================

/// Couleur lue sous le curseur
/// Color read under the cursor
///
/// `hex` is always `to_hex(r, g, b)`; build values through `SampledColor::new`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hex: String,
}

impl SampledColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            hex: to_hex(r, g, b),
        }
    }

    /// Parses `#RRGGBB` (or `RRGGBB`)
    // Parsing half of the codec; the picker itself only formats
    #[allow(dead_code)]
    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let (r, g, b) = from_hex(s)?;
        Ok(Self::new(r, g, b))
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Readout "R:  r  G:  g  B:  b" for this color
    pub fn rgb_label(&self) -> String {
        rgb_label(self.r, self.g, self.b)
    }
}

impl Default for SampledColor {
    /// Noir jusqu'au premier échantillon / Black until the first sample
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl From<[u8; 3]> for SampledColor {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

// =============================================================================
// FONCTIONS DE FORMATAGE
// FORMATTING FUNCTIONS
// =============================================================================

/// Formate une couleur RGB en chaîne hexadécimale
/// Formats an RGB color as a hex string
///
/// # Returns
/// Chaîne au format "#RRGGBB" (majuscules) / String in "#RRGGBB" format (uppercase)
#[inline]
pub fn to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Borne une composante à 0-255
/// Clamps a channel to 0-255
///
/// For callers holding wider integers; capture already yields `u8` channels.
#[allow(dead_code)]
#[inline]
pub fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Analyse un code hexadécimal
/// Parses a hex color code
///
/// Accepts an optional leading `#`; the rest must be exactly 6 hex digits.
// Parsing half of the codec; the picker itself only formats
#[allow(dead_code)]
pub fn from_hex(s: &str) -> Result<(u8, u8, u8), ColorError> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidFormat(s.to_string()));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| ColorError::InvalidFormat(s.to_string()))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

/// Formate les composantes RGB alignées sur 3 caractères
/// Formats RGB components right-aligned to 3 characters
///
/// Example: `rgb_label(0, 150, 255)` → `"R:  0  G:150  B:255"`
#[inline]
pub fn rgb_label(r: u8, g: u8, b: u8) -> String {
    format!("R:{:>3}  G:{:>3}  B:{:>3}", r, g, b)
}

// =============================================================================
// TESTS
// =============================================================================
