//! Domain values, bounds, and the [`Domain`] type itself.

use std::fmt;

/// A single concrete value inside a domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean truth value.
    Bool(bool),
    /// Exact integer.
    Int(i64),
    /// Floating point number, serialized fixed-point.
    Float(f64),
    /// Symbolic constant of a user-declared enumeration type.
    Symbol(String),
    /// Reference to a named model entity.
    Entity(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:.6}"),
            Self::Symbol(s) | Self::Entity(s) => f.write_str(s),
        }
    }
}

/// One end of a numeric interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Finite integer bound.
    Int(i64),
    /// Finite floating point bound.
    Float(f64),
    /// Positive infinity, rendered `+inf`.
    PlusInf,
    /// Negative infinity, rendered `-inf`.
    MinusInf,
}

impl Bound {
    /// Returns `true` for the two infinite bounds.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::PlusInf | Self::MinusInf)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:.6}"),
            Self::PlusInf => f.write_str("+inf"),
            Self::MinusInf => f.write_str("-inf"),
        }
    }
}

/// The shape of a [`Domain`].
#[derive(Debug, Clone, PartialEq)]
pub enum DomainKind {
    /// Exactly one value.
    Singleton(Value),
    /// An enumerated set with zero, two, or more values. One-element sets
    /// are normalized to [`DomainKind::Singleton`] by the constructors.
    Set(Vec<Value>),
    /// A numeric range. Zero-width finite intervals are normalized to
    /// [`DomainKind::Singleton`] by the constructors.
    Interval {
        /// Lower bound.
        min: Bound,
        /// Upper bound.
        max: Bound,
    },
}

/// A typed set of candidate values for one token parameter.
///
/// Every domain carries the name of its type as declared in the model
/// ("bool", "int", "float", or a user enumeration such as "Color"). The
/// type name travels on the wire and must survive a round trip.
///
/// # Example
///
/// ```
/// use reflex_domain::Domain;
///
/// let d = Domain::integer(5);
/// assert!(d.is_singleton());
/// assert_eq!(d.type_name(), "int");
///
/// let i = Domain::int_interval(0, 10);
/// assert!(!i.is_singleton());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    ty: String,
    kind: DomainKind,
}

impl Domain {
    /// Boolean singleton of type `bool`.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            ty: "bool".to_string(),
            kind: DomainKind::Singleton(Value::Bool(value)),
        }
    }

    /// Integer singleton of type `int`.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self {
            ty: "int".to_string(),
            kind: DomainKind::Singleton(Value::Int(value)),
        }
    }

    /// Float singleton of type `float`.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self {
            ty: "float".to_string(),
            kind: DomainKind::Singleton(Value::Float(value)),
        }
    }

    /// Symbolic singleton of the given enumeration type.
    #[must_use]
    pub fn symbol(ty: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            kind: DomainKind::Singleton(Value::Symbol(value.into())),
        }
    }

    /// Entity singleton referring to a named model object.
    #[must_use]
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            ty: "object".to_string(),
            kind: DomainKind::Singleton(Value::Entity(name.into())),
        }
    }

    /// Singleton with an explicit type name.
    ///
    /// Needed for user-declared numeric types ("depth", "heading") whose
    /// type name differs from the builtin `int` / `float`.
    #[must_use]
    pub fn scalar(ty: impl Into<String>, value: Value) -> Self {
        Self {
            ty: ty.into(),
            kind: DomainKind::Singleton(value),
        }
    }

    /// Enumerated set of the given type.
    ///
    /// A one-element set collapses to a singleton. The empty set is a
    /// legal domain and serializes as a self-closing `<set/>`.
    #[must_use]
    pub fn set(ty: impl Into<String>, mut values: Vec<Value>) -> Self {
        let kind = if values.len() == 1 {
            DomainKind::Singleton(values.remove(0))
        } else {
            DomainKind::Set(values)
        };
        Self {
            ty: ty.into(),
            kind,
        }
    }

    /// Integer interval of type `int`.
    ///
    /// A zero-width interval collapses to a singleton.
    #[must_use]
    pub fn int_interval(min: i64, max: i64) -> Self {
        Self::interval("int", Bound::Int(min), Bound::Int(max))
    }

    /// Float interval of type `float`.
    #[must_use]
    pub fn float_interval(min: f64, max: f64) -> Self {
        Self::interval("float", Bound::Float(min), Bound::Float(max))
    }

    /// Interval with explicit bounds and type name.
    ///
    /// Equal finite bounds collapse to a singleton of the matching value
    /// kind.
    #[must_use]
    pub fn interval(ty: impl Into<String>, min: Bound, max: Bound) -> Self {
        let kind = match (min, max) {
            (Bound::Int(a), Bound::Int(b)) if a == b => DomainKind::Singleton(Value::Int(a)),
            (Bound::Float(a), Bound::Float(b)) if a == b => DomainKind::Singleton(Value::Float(a)),
            _ => DomainKind::Interval { min, max },
        };
        Self {
            ty: ty.into(),
            kind,
        }
    }

    /// The declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.ty
    }

    /// The shape of this domain.
    #[must_use]
    pub fn kind(&self) -> &DomainKind {
        &self.kind
    }

    /// Returns `true` when the domain holds exactly one value.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        matches!(self.kind, DomainKind::Singleton(_))
    }

    /// The single value, when there is one.
    #[must_use]
    pub fn singleton(&self) -> Option<&Value> {
        match &self.kind {
            DomainKind::Singleton(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DomainKind::Singleton(v) => write!(f, "{v}"),
            DomainKind::Set(values) => {
                f.write_str("{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            DomainKind::Interval { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_constructors() {
        assert_eq!(
            Domain::boolean(true).singleton(),
            Some(&Value::Bool(true))
        );
        assert_eq!(Domain::integer(7).type_name(), "int");
        assert_eq!(Domain::entity("auv").type_name(), "object");
        assert_eq!(
            Domain::symbol("Behavior", "Survey").singleton(),
            Some(&Value::Symbol("Survey".to_string()))
        );
    }

    #[test]
    fn one_element_set_collapses() {
        let d = Domain::set("Color", vec![Value::Symbol("Red".into())]);
        assert!(d.is_singleton());
    }

    #[test]
    fn empty_set_is_legal() {
        let d = Domain::set("Color", vec![]);
        assert!(!d.is_singleton());
        assert_eq!(d.kind(), &DomainKind::Set(vec![]));
    }

    #[test]
    fn zero_width_interval_collapses() {
        assert_eq!(Domain::int_interval(4, 4), Domain::integer(4));
        assert!(Domain::int_interval(0, 1).singleton().is_none());
    }

    #[test]
    fn unbounded_interval_keeps_shape() {
        let d = Domain::interval("int", Bound::MinusInf, Bound::PlusInf);
        match d.kind() {
            DomainKind::Interval { min, max } => {
                assert!(min.is_infinite());
                assert!(max.is_infinite());
            }
            other => panic!("expected interval, got {other:?}"),
        }
    }

    #[test]
    fn display_forms() {
        assert_eq!(Domain::integer(3).to_string(), "3");
        assert_eq!(Domain::float(1.5).to_string(), "1.500000");
        assert_eq!(Domain::int_interval(0, 10).to_string(), "[0, 10]");
        assert_eq!(
            Domain::set("Color", vec![Value::Symbol("Red".into()), Value::Symbol("Blue".into())])
                .to_string(),
            "{Red, Blue}"
        );
    }
}
