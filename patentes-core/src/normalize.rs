//! Plate normalization against a fixed allow-list of shapes.
//!
//! Shapes are not checksum-validated: a well-formed but unregistered plate
//! passes here and is left to the lookup strategy to report as not found.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Plate;

/// Accepted plate layouts, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlateShape {
    /// 4 letters + 2 digits, e.g. `ABCD12`.
    Passenger,
    /// 2 letters + 4 digits, e.g. `AB1234`.
    LegacyPassenger,
    /// 2 letters + 3 digits.
    Motorcycle,
    /// 3 letters + 2 digits.
    MotorcycleThreeLetters,
    /// 3 letters + 1 digit + 1 letter.
    MotorcycleNew,
    /// 1-2 letters + 4 digits.
    Trailer,
    /// 4 letters + 1 digit + 1 letter.
    RegionalPassenger,
}

/// Anchored patterns per shape, in [`PlateShape`] order.
static SHAPES: LazyLock<Vec<(PlateShape, Regex)>> = LazyLock::new(|| {
    [
        (PlateShape::Passenger, r"^[A-Z]{4}\d{2}$"),
        (PlateShape::LegacyPassenger, r"^[A-Z]{2}\d{4}$"),
        (PlateShape::Motorcycle, r"^[A-Z]{2}\d{3}$"),
        (PlateShape::MotorcycleThreeLetters, r"^[A-Z]{3}\d{2}$"),
        (PlateShape::MotorcycleNew, r"^[A-Z]{3}\d[A-Z]$"),
        (PlateShape::Trailer, r"^[A-Z]{1,2}\d{4}$"),
        (PlateShape::RegionalPassenger, r"^[A-Z]{4}\d[A-Z]$"),
    ]
    .into_iter()
    .map(|(shape, pattern)| (shape, Regex::new(pattern).expect("plate shape pattern")))
    .collect()
});

/// Strip everything but ASCII letters and digits, uppercase the rest, and
/// accept it only if it matches one of the [`PlateShape`]s exactly.
///
/// ```
/// use patentes_core::normalize;
///
/// let plate = normalize(" ab-12 34 ").expect("legacy passenger plate");
/// assert_eq!(plate.as_str(), "AB1234");
/// assert!(normalize("A1").is_none());
/// ```
#[must_use]
pub fn normalize(raw: &str) -> Option<Plate> {
    let stripped: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    match_shape(&stripped).map(|_shape| Plate::from_canonical(stripped))
}

impl Plate {
    /// First accepted shape this plate matches.
    ///
    /// `AB1234` satisfies both [`PlateShape::LegacyPassenger`] and
    /// [`PlateShape::Trailer`]; the passenger reading wins.
    #[must_use]
    pub fn shape(&self) -> PlateShape {
        match_shape(self.as_str()).unwrap_or(PlateShape::Trailer)
    }
}

fn match_shape(candidate: &str) -> Option<PlateShape> {
    SHAPES
        .iter()
        .find(|(_shape, pattern)| pattern.is_match(candidate))
        .map(|(shape, _pattern)| *shape)
}
