//! Clip and sound selection for multi-clip actions

use rand::Rng;

use crate::config::SelectionPolicy;

/// Round-robin position in a clip list.
///
/// The cursor is not tied to one list; the arms share a single cursor between hands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequentialCursor(usize);

impl SequentialCursor {
    pub fn position(&self) -> usize {
        self.0
    }

    /// Index into a list of `len` entries, then advance. Resets to 0 when the list shrank.
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if self.0 >= len {
            self.0 = 0;
        }
        let index = self.0;
        self.0 += 1;
        Some(index)
    }
}

/// Pick a clip from `list` according to `policy`; `None` for an empty list
pub fn select_clip<'a>(
    list: &'a [String],
    policy: SelectionPolicy,
    cursor: &mut SequentialCursor,
    rng: &mut impl Rng,
) -> Option<&'a str> {
    let index = match policy {
        SelectionPolicy::Sequential => cursor.advance(list.len())?,
        SelectionPolicy::Random if list.is_empty() => return None,
        SelectionPolicy::Random => rng.gen_range(0..list.len()),
    };
    Some(list[index].as_str())
}

/// Anti-repeat shuffle: swap a random non-head entry into slot 0 and return it.
///
/// The previous head can never play twice in a row while the list has two or more entries.
pub fn rotate_sound<'a, T>(list: &'a mut [T], rng: &mut impl Rng) -> Option<&'a T> {
    if list.len() > 1 {
        let index = rng.gen_range(1..list.len());
        list.swap(0, index);
    }
    list.first()
}
