//! Literal path construction.
//!
//! Literal paths are built by a direct tagged-variant constructor keyed on
//! the parsed literal's kind — a static match, no reflection. A literal
//! carries no dataset dependency of its own; it anchors to the dataset and
//! identity column of the context it was compiled in, so that literal-only
//! expressions still produce one row per subject.

use cairn_columnar::Value;
use cairn_fhir_model::FhirType;

use crate::error::{FhirPathError, FhirPathResult};
use crate::parser::Literal;
use crate::path::{LiteralPath, PathValue};

/// Builds a literal path anchored to the given context path.
pub(crate) fn build_literal(anchor: &PathValue, literal: &Literal) -> FhirPathResult<PathValue> {
    let (value, fhir_type) = match literal {
        Literal::Null => (Value::Null, None),
        Literal::Boolean(b) => (Value::Boolean(*b), Some(FhirType::Boolean)),
        Literal::String(s) => (Value::String(s.clone()), Some(FhirType::String)),
        Literal::Number(d) => (Value::Decimal(*d), Some(FhirType::Decimal)),
        Literal::Integer(i) => (Value::Integer(*i), Some(FhirType::Integer)),
        Literal::Date(s) => (Value::Date(s.clone()), Some(FhirType::Date)),
        Literal::DateTime(s) => (Value::DateTime(s.clone()), Some(FhirType::DateTime)),
        Literal::Time(s) => (Value::Time(s.clone()), Some(FhirType::Time)),
        Literal::Quantity(_, _) => {
            return Err(FhirPathError::InvalidInput(format!(
                "Quantity literals are not supported here: {}",
                literal
            )));
        }
    };
    Ok(PathValue::Literal(LiteralPath {
        expression: literal.to_string(),
        dataset: anchor.dataset().clone(),
        id_column: anchor.id_column_name().map(str::to_string),
        value,
        fhir_type,
        lineage: anchor.lineage().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_columnar::Dataset;
    use rust_decimal::Decimal;

    fn anchor() -> PathValue {
        PathValue::Literal(LiteralPath {
            expression: "true".into(),
            dataset: Dataset::from_rows("anchor", vec!["id"], vec![]),
            id_column: Some("id".into()),
            value: Value::Boolean(true),
            fhir_type: Some(FhirType::Boolean),
            lineage: "Patient#0".into(),
        })
    }

    #[test]
    fn literal_kinds_map_to_typed_values() {
        let anchor = anchor();
        let cases = vec![
            (Literal::Boolean(true), Some(FhirType::Boolean)),
            (Literal::String("official".into()), Some(FhirType::String)),
            (Literal::Integer(7), Some(FhirType::Integer)),
            (Literal::Number(Decimal::new(25, 1)), Some(FhirType::Decimal)),
            (Literal::Date("2020-01-01".into()), Some(FhirType::Date)),
            (Literal::Time("14:30:00".into()), Some(FhirType::Time)),
            (Literal::Null, None),
        ];
        for (literal, fhir_type) in cases {
            let path = build_literal(&anchor, &literal).unwrap();
            assert_eq!(path.fhir_type(), fhir_type, "for {}", literal);
            assert!(path.is_singular());
            assert!(path.is_literal());
        }
    }

    #[test]
    fn quantity_literals_are_rejected() {
        let err = build_literal(&anchor(), &Literal::Quantity(Decimal::from(5), "mg".into()))
            .unwrap_err();
        assert!(err.to_string().contains("Quantity literals"));
    }
}
