//! Everything related to compiling a format string and rendering it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("%([0-9]+)").expect("marker pattern is valid"))
}

/// One piece of a compiled [`Template`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fragment {
    /// Text copied verbatim from the format string.
    Literal(String),
    /// The latest value substituted for one stream.
    Slot(String),
}

impl Fragment {
    pub fn as_str(&self) -> &str {
        match self {
            Fragment::Literal(text) | Fragment::Slot(text) => text,
        }
    }

    pub fn is_slot(&self) -> bool {
        matches!(self, Fragment::Slot(_))
    }
}

/// A format string split into literal text and per-stream slots.
///
/// Markers have the form `%N`, where `N` is the decimal index of an input
/// stream. Every marker becomes an initially empty slot. When the same index
/// is used by several markers only the last one receives updates; the others
/// keep their empty content.
///
/// ```
/// use muxline::Template;
///
/// let mut template = Template::compile("cpu %0 | mem %1").unwrap();
/// assert_eq!(template.render(), "cpu  | mem ");
///
/// template.set(1, "42%");
/// assert_eq!(template.render(), "cpu  | mem 42%");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    fragments: Vec<Fragment>,
    /// Stream index -> position of its slot in `fragments`. Marker indices
    /// need not be contiguous.
    slot_of: BTreeMap<usize, usize>,
}

impl Template {
    /// Parses `format`, scanning for markers from left to right.
    pub fn compile(format: &str) -> Result<Self, ParseError> {
        let mut fragments = Vec::new();
        let mut slot_of = BTreeMap::new();
        let mut rest = 0;

        for caps in marker_pattern().captures_iter(format) {
            let marker = &caps[0];
            let index: usize = caps[1].parse().map_err(|source| ParseError::Marker {
                marker: marker.to_owned(),
                source,
            })?;

            let span = caps.get(0).expect("capture group 0 always matches");
            fragments.push(Fragment::Literal(format[rest..span.start()].to_owned()));
            fragments.push(Fragment::Slot(String::new()));

            // Later markers win for a repeated index.
            slot_of.insert(index, fragments.len() - 1);

            rest = span.end();
        }

        if rest < format.len() {
            fragments.push(Fragment::Literal(format[rest..].to_owned()));
        }

        Ok(Template { fragments, slot_of })
    }

    /// Replaces the content of the slot mapped to `index`.
    ///
    /// Returns `false`, leaving the template untouched, if no marker named
    /// `index`.
    pub fn set(&mut self, index: usize, content: impl Into<String>) -> bool {
        let position = match self.slot_of.get(&index) {
            Some(position) => *position,
            None => return false,
        };

        match self.fragments.get_mut(position) {
            Some(Fragment::Slot(slot)) => {
                *slot = content.into();
                true
            }
            _ => false,
        }
    }

    /// Current content of the slot mapped to `index`, if any.
    pub fn slot(&self, index: usize) -> Option<&str> {
        let position = *self.slot_of.get(&index)?;
        self.fragments.get(position).map(Fragment::as_str)
    }

    /// Returns `true` if a marker named `index`.
    pub fn is_mapped(&self, index: usize) -> bool {
        self.slot_of.contains_key(&index)
    }

    /// Stream indices that have a slot, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slot_of.keys().copied()
    }

    /// Number of slot fragments, one per marker occurrence.
    pub fn slot_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_slot()).count()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Concatenates every fragment into the current composite line.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            f.write_str(fragment.as_str())?;
        }
        Ok(())
    }
}
