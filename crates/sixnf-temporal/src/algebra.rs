//! Interval algebra over half-open periods.
//!
//! Every relation exists twice: as a Rust predicate over `Span`s and as a SQL
//! boundary predicate over `Operand` expressions. Both must agree for every
//! input, including the infinity sentinel, which sorts after every instant in
//! canonical text form.
//!
//! Comparisons that make no sense for the operand kinds (an instant cannot
//! contain or equal a period) are false, never an error.

use std::fmt;

use sixnf_core::models::{Period, Timestamp};

/// SQL that is always false.
pub const FALSE_SQL: &str = "(1 = 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Equals,
    Contains,
    Overlaps,
    Precedes,
    Succeeds,
    ImmediatelyPrecedes,
    ImmediatelySucceeds,
}

impl Relation {
    pub const ALL: [Relation; 7] = [
        Relation::Equals,
        Relation::Contains,
        Relation::Overlaps,
        Relation::Precedes,
        Relation::Succeeds,
        Relation::ImmediatelyPrecedes,
        Relation::ImmediatelySucceeds,
    ];

    /// Parse the SQL keyword form, e.g. `["IMMEDIATELY", "PRECEDES"]`.
    pub fn from_keywords(first: &str, second: Option<&str>) -> Option<(Self, usize)> {
        let upper = first.to_ascii_uppercase();
        let relation = match upper.as_str() {
            "EQUALS" => Relation::Equals,
            "CONTAINS" => Relation::Contains,
            "OVERLAPS" => Relation::Overlaps,
            "PRECEDES" => Relation::Precedes,
            "SUCCEEDS" => Relation::Succeeds,
            "IMMEDIATELY" => {
                return match second.map(str::to_ascii_uppercase).as_deref() {
                    Some("PRECEDES") => Some((Relation::ImmediatelyPrecedes, 2)),
                    Some("SUCCEEDS") => Some((Relation::ImmediatelySucceeds, 2)),
                    _ => None,
                }
            }
            _ => return None,
        };
        Some((relation, 1))
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Relation::Equals => "EQUALS",
            Relation::Contains => "CONTAINS",
            Relation::Overlaps => "OVERLAPS",
            Relation::Precedes => "PRECEDES",
            Relation::Succeeds => "SUCCEEDS",
            Relation::ImmediatelyPrecedes => "IMMEDIATELY PRECEDES",
            Relation::ImmediatelySucceeds => "IMMEDIATELY SUCCEEDS",
        }
    }

    pub fn holds(self, a: impl Into<Span>, b: impl Into<Span>) -> bool {
        let (a, b) = (a.into(), b.into());
        match self {
            Relation::Equals => equals(a, b),
            Relation::Contains => contains(a, b),
            Relation::Overlaps => overlaps(a, b),
            Relation::Precedes => precedes(a, b),
            Relation::Succeeds => succeeds(a, b),
            Relation::ImmediatelyPrecedes => immediately_precedes(a, b),
            Relation::ImmediatelySucceeds => immediately_succeeds(a, b),
        }
    }

    /// Render as a SQL predicate over the operands' expressions.
    pub fn render(self, a: &Operand, b: &Operand) -> String {
        use Operand::{Instant, Period as P};
        match (self, a, b) {
            (Relation::Equals, P { start, end }, P { start: s2, end: e2 }) => {
                format!("({start} = {s2} AND {end} = {e2})")
            }
            (Relation::Equals, Instant(x), Instant(y)) => format!("({x} = {y})"),
            (Relation::Equals, _, _) => FALSE_SQL.to_string(),

            (Relation::Contains, P { start, end }, P { start: s2, end: e2 }) => {
                format!("({start} <= {s2} AND {end} >= {e2})")
            }
            (Relation::Contains, P { start, end }, Instant(t)) => within(start, end, t),
            (Relation::Contains, Instant(_), _) => FALSE_SQL.to_string(),

            (Relation::Overlaps, P { start, end }, P { start: s2, end: e2 }) => {
                format!("({start} < {e2} AND {end} > {s2})")
            }
            (Relation::Overlaps, P { start, end }, Instant(t))
            | (Relation::Overlaps, Instant(t), P { start, end }) => within(start, end, t),
            (Relation::Overlaps, Instant(x), Instant(y)) => format!("({x} = {y})"),

            (Relation::Precedes, P { end, .. }, P { start: s2, .. }) => format!("({end} <= {s2})"),
            (Relation::Precedes, P { end, .. }, Instant(t)) => format!("({end} <= {t})"),
            (Relation::Precedes, Instant(t), P { start, .. }) => format!("({t} < {start})"),
            (Relation::Precedes, Instant(x), Instant(y)) => format!("({x} < {y})"),

            (Relation::ImmediatelyPrecedes, P { end, .. }, P { start: s2, .. }) => {
                format!("({end} = {s2})")
            }
            (Relation::ImmediatelyPrecedes, P { end, .. }, Instant(t)) => format!("({end} = {t})"),
            (Relation::ImmediatelyPrecedes, Instant(_), _) => FALSE_SQL.to_string(),

            (Relation::Succeeds, a, b) => Relation::Precedes.render(b, a),
            (Relation::ImmediatelySucceeds, a, b) => Relation::ImmediatelyPrecedes.render(b, a),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

fn within(start: &str, end: &str, t: &str) -> String {
    format!("({start} <= {t} AND {end} > {t})")
}

/// A period or a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Period(Period),
    Instant(Timestamp),
}

impl From<Period> for Span {
    fn from(p: Period) -> Self {
        Span::Period(p)
    }
}

impl From<Timestamp> for Span {
    fn from(t: Timestamp) -> Self {
        Span::Instant(t)
    }
}

/// SQL expressions for one side of a period predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Period { start: String, end: String },
    Instant(String),
}

pub fn equals(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    match (a.into(), b.into()) {
        (Span::Period(p), Span::Period(q)) => p.start == q.start && p.end == q.end,
        (Span::Instant(x), Span::Instant(y)) => x == y,
        _ => false,
    }
}

pub fn contains(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    match (a.into(), b.into()) {
        (Span::Period(p), Span::Period(q)) => p.start <= q.start && p.end >= q.end,
        (Span::Period(p), Span::Instant(t)) => p.start <= t && p.end > t,
        (Span::Instant(_), _) => false,
    }
}

pub fn overlaps(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    match (a.into(), b.into()) {
        (Span::Period(p), Span::Period(q)) => p.start < q.end && p.end > q.start,
        (Span::Period(p), Span::Instant(t)) | (Span::Instant(t), Span::Period(p)) => {
            p.start <= t && p.end > t
        }
        (Span::Instant(x), Span::Instant(y)) => x == y,
    }
}

pub fn precedes(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    match (a.into(), b.into()) {
        (Span::Period(p), Span::Period(q)) => p.end <= q.start,
        (Span::Period(p), Span::Instant(t)) => p.end <= t,
        (Span::Instant(t), Span::Period(p)) => t < p.start,
        (Span::Instant(x), Span::Instant(y)) => x < y,
    }
}

pub fn succeeds(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    precedes(b, a)
}

pub fn immediately_precedes(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    match (a.into(), b.into()) {
        (Span::Period(p), Span::Period(q)) => p.end == q.start,
        (Span::Period(p), Span::Instant(t)) => p.end == t,
        (Span::Instant(_), _) => false,
    }
}

pub fn immediately_succeeds(a: impl Into<Span>, b: impl Into<Span>) -> bool {
    immediately_precedes(b, a)
}
