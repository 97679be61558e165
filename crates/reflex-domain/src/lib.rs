//! Parameter domains for REFLEX observations and goals.
//!
//! A domain is the set of values a token parameter may take at a tick.
//! The executive treats domains as data: it never reasons about them, it
//! only snapshots, routes, and serializes them. Three shapes exist:
//!
//! | Shape | Meaning | Wire form |
//! |-------|---------|-----------|
//! | singleton | exactly one value | `<value/>`, `<symbol/>`, `<object/>` |
//! | enumerated set | zero or more values | `<set>...</set>` |
//! | interval | numeric range, possibly unbounded | `<interval/>` |
//!
//! Constructors normalize: a one-element set and a zero-width interval
//! both collapse to a singleton, so equality after a serialization round
//! trip is structural equality.
//!
//! The [`xml`] module implements the wire format, byte for byte, in both
//! directions.

mod domain;
pub mod xml;

pub use domain::{Bound, Domain, DomainKind, Value};
pub use xml::XmlError;
