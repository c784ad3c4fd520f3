//! Color assignment — stable per-session display colors from a fixed palette.
//!
//! DESIGN
//! ======
//! `get` hands out palette slots round-robin and remembers them, so the same
//! id always sees the same color until `release`. The cursor skips slots held
//! by a live id while any free slot remains, which lets released colors be
//! reused before a collision is accepted.
//!
//! COLLISIONS
//! ==========
//! Up to `palette_size()` concurrently live ids get pairwise distinct colors.
//! Beyond that the palette cycles and two live ids may share a color. This is
//! accepted: colors are a visual hint, identity is carried by initials.

#[cfg(test)]
#[path = "color_test.rs"]
mod tests;

use std::collections::HashMap;

/// Built-in palette used when none is configured.
pub const DEFAULT_PALETTE: [&str; 8] =
    ["#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324"];

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Clone)]
pub struct ColorRegistry {
    palette: Vec<String>,
    by_id: HashMap<String, usize>,
    next: usize,
}

impl Default for ColorRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE)
    }
}

impl ColorRegistry {
    /// Build a registry. Entries are normalized to lowercase `#rrggbb`;
    /// unparseable entries are skipped and an empty result falls back to
    /// [`DEFAULT_PALETTE`].
    pub fn new<I, S>(palette: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = palette
            .into_iter()
            .filter_map(|raw| parse_hex_rgb(raw.as_ref()).map(|(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}")))
            .collect();
        if normalized.is_empty() {
            normalized = DEFAULT_PALETTE.iter().map(|c| (*c).to_owned()).collect();
        }
        Self { palette: normalized, by_id: HashMap::new(), next: 0 }
    }

    /// Color for `id`, assigning the next slot on first sight.
    pub fn get(&mut self, id: &str) -> String {
        if let Some(&slot) = self.by_id.get(id) {
            return self.palette[slot].clone();
        }
        let slot = self.next_slot();
        self.next = (slot + 1) % self.palette.len();
        self.by_id.insert(id.to_owned(), slot);
        self.palette[slot].clone()
    }

    /// Current assignment without allocating one.
    #[must_use]
    pub fn peek(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|&slot| self.palette[slot].as_str())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Free `id`'s slot. Returns whether an assignment existed.
    pub fn release(&mut self, id: &str) -> bool {
        self.by_id.remove(id).is_some()
    }

    /// Drop every assignment and rewind the cursor.
    pub fn reset(&mut self) {
        self.by_id.clear();
        self.next = 0;
    }

    #[must_use]
    pub fn palette_size(&self) -> usize {
        self.palette.len()
    }

    #[must_use]
    pub fn assigned(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    fn next_slot(&self) -> usize {
        let len = self.palette.len();
        (0..len)
            .map(|offset| (self.next + offset) % len)
            .find(|slot| !self.by_id.values().any(|held| held == slot))
            .unwrap_or(self.next % len)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
#[must_use]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let full = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_owned(),
        _ => return None,
    };
    let Ok(value) = u32::from_str_radix(&full, 16) else {
        return None;
    };
    let [_, r, g, b] = value.to_be_bytes();
    Some((r, g, b))
}

/// Normalize a color to lowercase `#rrggbb`, or `None` when unparseable.
#[must_use]
pub fn normalize_hex_color(value: &str) -> Option<String> {
    parse_hex_rgb(value).map(|(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Split a comma-separated palette string (`MAPBOARD_PALETTE`).
#[must_use]
pub fn parse_palette(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}
