//! The FHIR type codes the compiler understands.

use serde::{Deserialize, Serialize};

/// Declared FHIR types, covering the primitives and the complex datatypes
/// the compiler navigates. Backbone elements (anonymous nested structures)
/// carry [`FhirType::BackboneElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FhirType {
    Boolean,
    String,
    Uri,
    Url,
    Canonical,
    Code,
    Oid,
    Id,
    Uuid,
    Markdown,
    Base64Binary,
    Integer,
    UnsignedInt,
    PositiveInt,
    Decimal,
    Date,
    DateTime,
    Instant,
    Time,
    Coding,
    CodeableConcept,
    Quantity,
    Identifier,
    HumanName,
    ContactPoint,
    Address,
    Period,
    Reference,
    Extension,
    BackboneElement,
}

impl FhirType {
    /// Parses a FHIR type code as it appears in structure definitions.
    pub fn from_code(code: &str) -> Option<FhirType> {
        Some(match code {
            "boolean" => FhirType::Boolean,
            "string" => FhirType::String,
            "uri" => FhirType::Uri,
            "url" => FhirType::Url,
            "canonical" => FhirType::Canonical,
            "code" => FhirType::Code,
            "oid" => FhirType::Oid,
            "id" => FhirType::Id,
            "uuid" => FhirType::Uuid,
            "markdown" => FhirType::Markdown,
            "base64Binary" => FhirType::Base64Binary,
            "integer" => FhirType::Integer,
            "unsignedInt" => FhirType::UnsignedInt,
            "positiveInt" => FhirType::PositiveInt,
            "decimal" => FhirType::Decimal,
            "date" => FhirType::Date,
            "dateTime" => FhirType::DateTime,
            "instant" => FhirType::Instant,
            "time" => FhirType::Time,
            "Coding" => FhirType::Coding,
            "CodeableConcept" => FhirType::CodeableConcept,
            "Quantity" => FhirType::Quantity,
            "Identifier" => FhirType::Identifier,
            "HumanName" => FhirType::HumanName,
            "ContactPoint" => FhirType::ContactPoint,
            "Address" => FhirType::Address,
            "Period" => FhirType::Period,
            "Reference" => FhirType::Reference,
            "Extension" => FhirType::Extension,
            "BackboneElement" => FhirType::BackboneElement,
            _ => return None,
        })
    }

    /// The code used in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            FhirType::Boolean => "boolean",
            FhirType::String => "string",
            FhirType::Uri => "uri",
            FhirType::Url => "url",
            FhirType::Canonical => "canonical",
            FhirType::Code => "code",
            FhirType::Oid => "oid",
            FhirType::Id => "id",
            FhirType::Uuid => "uuid",
            FhirType::Markdown => "markdown",
            FhirType::Base64Binary => "base64Binary",
            FhirType::Integer => "integer",
            FhirType::UnsignedInt => "unsignedInt",
            FhirType::PositiveInt => "positiveInt",
            FhirType::Decimal => "decimal",
            FhirType::Date => "date",
            FhirType::DateTime => "dateTime",
            FhirType::Instant => "instant",
            FhirType::Time => "time",
            FhirType::Coding => "Coding",
            FhirType::CodeableConcept => "CodeableConcept",
            FhirType::Quantity => "Quantity",
            FhirType::Identifier => "Identifier",
            FhirType::HumanName => "HumanName",
            FhirType::ContactPoint => "ContactPoint",
            FhirType::Address => "Address",
            FhirType::Period => "Period",
            FhirType::Reference => "Reference",
            FhirType::Extension => "Extension",
            FhirType::BackboneElement => "BackboneElement",
        }
    }

    /// Whether values of this type are primitive (materializable directly).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FhirType::Boolean
                | FhirType::String
                | FhirType::Uri
                | FhirType::Url
                | FhirType::Canonical
                | FhirType::Code
                | FhirType::Oid
                | FhirType::Id
                | FhirType::Uuid
                | FhirType::Markdown
                | FhirType::Base64Binary
                | FhirType::Integer
                | FhirType::UnsignedInt
                | FhirType::PositiveInt
                | FhirType::Decimal
                | FhirType::Date
                | FhirType::DateTime
                | FhirType::Instant
                | FhirType::Time
        )
    }

    /// Whether this type supports arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FhirType::Integer | FhirType::UnsignedInt | FhirType::PositiveInt | FhirType::Decimal
        )
    }

    /// String-kinded types, which compare and concatenate freely among
    /// themselves.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            FhirType::String
                | FhirType::Uri
                | FhirType::Url
                | FhirType::Canonical
                | FhirType::Code
                | FhirType::Oid
                | FhirType::Id
                | FhirType::Uuid
                | FhirType::Markdown
                | FhirType::Base64Binary
        )
    }

    /// Temporal types grouped by comparability: dates and datetimes compare
    /// with each other, times only with times.
    pub fn is_date_like(&self) -> bool {
        matches!(self, FhirType::Date | FhirType::DateTime | FhirType::Instant)
    }

    /// Whether two declared types are mutually comparable.
    pub fn comparable_with(&self, other: &FhirType) -> bool {
        (self.is_numeric() && other.is_numeric())
            || (self.is_string_like() && other.is_string_like())
            || (self.is_date_like() && other.is_date_like())
            || (*self == FhirType::Time && *other == FhirType::Time)
            || (*self == FhirType::Boolean && *other == FhirType::Boolean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips() {
        for t in [FhirType::Boolean, FhirType::CodeableConcept, FhirType::PositiveInt] {
            assert_eq!(FhirType::from_code(t.code()), Some(t));
        }
    }

    #[test]
    fn comparability_groups() {
        assert!(FhirType::Integer.comparable_with(&FhirType::Decimal));
        assert!(FhirType::Code.comparable_with(&FhirType::String));
        assert!(FhirType::Date.comparable_with(&FhirType::DateTime));
        assert!(!FhirType::Date.comparable_with(&FhirType::Time));
        assert!(!FhirType::Integer.comparable_with(&FhirType::String));
    }
}
