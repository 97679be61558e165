//! Observations: facts a reactor publishes about its internal timelines.
//!
//! An observation states, for one (timeline, tick), the active predicate
//! and the domain of each of its parameters. Two shapes exist with the
//! same contract:
//!
//! - [`ObservationByValue`]: an owned snapshot, used when buffering or
//!   when the producer assembled the fact itself
//! - [`ObservationByReference`]: backed by a live token in the producer's
//!   deliberation engine, reading parameter domains on demand
//!
//! Consumers only ever see `&dyn Observation`, so the shape is the
//! producer's private choice.

use reflex_domain::xml::push_escaped;
use reflex_domain::Domain;
use reflex_types::TimelineName;
use std::borrow::Cow;
use std::sync::Arc;

/// One named parameter of an observation.
///
/// Both fields are copy-on-write so by-value observations lend their
/// storage while by-reference observations materialize on demand.
pub struct Parameter<'a> {
    /// Parameter name.
    pub name: Cow<'a, str>,
    /// The parameter's domain at the observed tick.
    pub domain: Cow<'a, Domain>,
}

/// A fact about one timeline at one tick.
pub trait Observation {
    /// Timeline the fact is about.
    fn timeline(&self) -> &TimelineName;

    /// Active predicate name.
    fn predicate(&self) -> &str;

    /// Number of bound parameters.
    fn parameter_count(&self) -> usize;

    /// Returns the parameter at `index`, if any.
    fn parameter(&self, index: usize) -> Option<Parameter<'_>>;

    /// Snapshots this observation into an owned by-value form.
    fn to_value(&self) -> ObservationByValue {
        let mut snapshot =
            ObservationByValue::new(self.timeline().clone(), self.predicate().to_string());
        for index in 0..self.parameter_count() {
            if let Some(p) = self.parameter(index) {
                snapshot.push(p.name.into_owned(), p.domain.into_owned());
            }
        }
        snapshot
    }

    /// Serializes this observation in the XML wire format.
    ///
    /// The output is byte-exact: replay tooling compares these strings.
    /// Zero-parameter observations emit a self-closing element.
    fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<Observation on=\"");
        push_escaped(&mut out, self.timeline().as_str());
        out.push_str("\" predicate=\"");
        push_escaped(&mut out, self.predicate());
        if self.parameter_count() == 0 {
            out.push_str("\"/>");
            return out;
        }
        out.push_str("\">");
        for index in 0..self.parameter_count() {
            if let Some(p) = self.parameter(index) {
                out.push_str("<Assert name=\"");
                push_escaped(&mut out, &p.name);
                out.push_str("\">");
                reflex_domain::xml::write_domain(&p.domain, &mut out);
                out.push_str("</Assert>");
            }
        }
        out.push_str("</Observation>");
        out
    }
}

/// Owned snapshot observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationByValue {
    timeline: TimelineName,
    predicate: String,
    parameters: Vec<(String, Domain)>,
}

impl ObservationByValue {
    /// Creates an observation with no parameters yet.
    #[must_use]
    pub fn new(timeline: TimelineName, predicate: impl Into<String>) -> Self {
        Self {
            timeline,
            predicate: predicate.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter binding.
    pub fn push(&mut self, name: impl Into<String>, domain: Domain) {
        self.parameters.push((name.into(), domain));
    }

    /// Builder-style variant of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.push(name, domain);
        self
    }
}

impl Observation for ObservationByValue {
    fn timeline(&self) -> &TimelineName {
        &self.timeline
    }

    fn predicate(&self) -> &str {
        &self.predicate
    }

    fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    fn parameter(&self, index: usize) -> Option<Parameter<'_>> {
        let (name, domain) = self.parameters.get(index)?;
        Some(Parameter {
            name: Cow::Borrowed(name),
            domain: Cow::Borrowed(domain),
        })
    }
}

/// Read-only view of a live token inside a deliberation engine.
///
/// Parameter domains are read at call time, so a by-reference observation
/// always reflects the token's current restriction.
pub trait TokenView: Send + Sync {
    /// Timeline the token sits on.
    fn timeline(&self) -> &TimelineName;

    /// Predicate of the token.
    fn predicate(&self) -> &str;

    /// Number of parameters.
    fn parameter_count(&self) -> usize;

    /// Name of the parameter at `index`.
    fn parameter_name(&self, index: usize) -> Option<&str>;

    /// Current domain of the parameter at `index`.
    fn parameter_domain(&self, index: usize) -> Option<Domain>;
}

/// Observation backed by a live token.
#[derive(Clone)]
pub struct ObservationByReference {
    token: Arc<dyn TokenView>,
}

impl ObservationByReference {
    /// Wraps a token view.
    #[must_use]
    pub fn new(token: Arc<dyn TokenView>) -> Self {
        Self { token }
    }
}

impl Observation for ObservationByReference {
    fn timeline(&self) -> &TimelineName {
        self.token.timeline()
    }

    fn predicate(&self) -> &str {
        self.token.predicate()
    }

    fn parameter_count(&self) -> usize {
        self.token.parameter_count()
    }

    fn parameter(&self, index: usize) -> Option<Parameter<'_>> {
        let name = self.token.parameter_name(index)?;
        let domain = self.token.parameter_domain(index)?;
        Some(Parameter {
            name: Cow::Borrowed(name),
            domain: Cow::Owned(domain),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_value_round_trip_through_trait() {
        let obs = ObservationByValue::new("clock".into(), "Tick")
            .with("value", Domain::integer(5));

        assert_eq!(obs.timeline().as_str(), "clock");
        assert_eq!(obs.predicate(), "Tick");
        assert_eq!(obs.parameter_count(), 1);

        let p = obs.parameter(0).expect("first parameter");
        assert_eq!(p.name, "value");
        assert_eq!(p.domain.as_ref(), &Domain::integer(5));
        assert!(obs.parameter(1).is_none());
    }

    #[test]
    fn xml_form_with_parameters() {
        let obs = ObservationByValue::new("clock".into(), "Tick")
            .with("value", Domain::integer(5));
        assert_eq!(
            obs.to_xml(),
            concat!(
                r#"<Observation on="clock" predicate="Tick">"#,
                r#"<Assert name="value"><value type="int" name="5"/></Assert>"#,
                r#"</Observation>"#
            )
        );
    }

    #[test]
    fn xml_form_without_parameters_self_closes() {
        let obs = ObservationByValue::new("door".into(), "Closed");
        assert_eq!(obs.to_xml(), r#"<Observation on="door" predicate="Closed"/>"#);
    }

    struct FixedToken {
        timeline: TimelineName,
    }

    impl TokenView for FixedToken {
        fn timeline(&self) -> &TimelineName {
            &self.timeline
        }

        fn predicate(&self) -> &str {
            "Holds"
        }

        fn parameter_count(&self) -> usize {
            1
        }

        fn parameter_name(&self, index: usize) -> Option<&str> {
            (index == 0).then_some("flag")
        }

        fn parameter_domain(&self, index: usize) -> Option<Domain> {
            (index == 0).then(|| Domain::boolean(true))
        }
    }

    #[test]
    fn by_reference_reads_token_on_demand() {
        let obs = ObservationByReference::new(Arc::new(FixedToken {
            timeline: "valve".into(),
        }));

        assert_eq!(obs.predicate(), "Holds");
        let snapshot = obs.to_value();
        assert_eq!(
            snapshot,
            ObservationByValue::new("valve".into(), "Holds")
                .with("flag", Domain::boolean(true))
        );
    }

    #[test]
    fn snapshots_compare_equal_across_shapes() {
        let by_ref = ObservationByReference::new(Arc::new(FixedToken {
            timeline: "valve".into(),
        }));
        let by_value = by_ref.to_value();
        assert_eq!(by_ref.to_xml(), by_value.to_xml());
    }
}
