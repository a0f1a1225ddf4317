//! Shared fixtures: an in-memory resource source with a small clinical
//! dataset, context builders, and a mock terminology gateway.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use cairn_columnar::{Dataset, Value};
use cairn_fhir_model::builtin_registry;
use cairn_fhirpath::{
    Coding, CompilerConfig, ParserContext, ResourceSource, TerminologyError, TerminologyGateway,
};

pub fn s(value: &str) -> Value {
    Value::String(value.to_string())
}

pub fn strct(fields: Vec<(&str, Value)>) -> Value {
    Value::Struct(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

pub fn arr(items: Vec<Value>) -> Value {
    Value::Array(items)
}

pub fn coding(system: &str, code: &str) -> Value {
    strct(vec![("system", s(system)), ("code", s(code))])
}

pub fn codeable(codings: Vec<Value>) -> Value {
    strct(vec![("coding", arr(codings))])
}

pub fn reference(target_id: &str) -> Value {
    strct(vec![("reference", s(target_id))])
}

pub fn human_name(use_code: &str, family: &str, given: &[&str]) -> Value {
    strct(vec![
        ("use", s(use_code)),
        ("family", s(family)),
        ("given", arr(given.iter().map(|g| s(g)).collect())),
    ])
}

/// A warehouse of in-memory encoded resource tables.
pub struct StaticSource {
    tables: HashMap<String, Dataset>,
}

impl StaticSource {
    pub fn with_fixtures() -> StaticSource {
        let mut tables = HashMap::new();
        tables.insert("Patient".to_string(), patients());
        tables.insert("Practitioner".to_string(), practitioners());
        tables.insert("Organization".to_string(), organizations());
        tables.insert("Encounter".to_string(), encounters());
        tables.insert("Condition".to_string(), conditions());
        tables.insert("Questionnaire".to_string(), questionnaires());
        StaticSource { tables }
    }
}

impl ResourceSource for StaticSource {
    fn dataset_for(&self, resource_type: &str) -> Option<Dataset> {
        self.tables.get(resource_type).cloned()
    }
}

fn patients() -> Dataset {
    Dataset::from_rows(
        "patient",
        vec![
            "id",
            "gender",
            "active",
            "multipleBirthInteger",
            "name",
            "maritalStatus",
            "managingOrganization",
            "generalPractitioner",
            "extension",
        ],
        vec![
            vec![
                s("p1"),
                s("female"),
                Value::Boolean(true),
                Value::Integer(1),
                arr(vec![
                    human_name("official", "Abbott", &["Alice", "Ann"]),
                    human_name("maiden", "Aylward", &["Amy"]),
                ]),
                codeable(vec![
                    coding("http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "M"),
                    coding("http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "S"),
                ]),
                reference("o1"),
                arr(vec![reference("pr1")]),
                arr(vec![
                    strct(vec![
                        ("url", s("http://example.org/race")),
                        ("valueString", s("example-race")),
                    ]),
                    strct(vec![
                        ("url", s("http://example.org/other")),
                        ("valueString", s("ignored")),
                    ]),
                ]),
            ],
            vec![
                s("p2"),
                s("male"),
                Value::Boolean(false),
                Value::Integer(2),
                arr(vec![human_name("official", "Baker", &["Bob"])]),
                codeable(vec![coding(
                    "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus",
                    "S",
                )]),
                reference("o2"),
                arr(vec![reference("o1")]),
                Value::Null,
            ],
            vec![
                s("p3"),
                s("female"),
                Value::Boolean(true),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
            ],
        ],
    )
}

fn practitioners() -> Dataset {
    Dataset::from_rows(
        "practitioner",
        vec!["id", "gender", "name"],
        vec![vec![
            s("pr1"),
            s("male"),
            arr(vec![human_name("official", "Carter", &["Colin"])]),
        ]],
    )
}

fn organizations() -> Dataset {
    Dataset::from_rows(
        "organization",
        vec!["id", "name", "active"],
        vec![
            vec![s("o1"), s("Gold Hospital"), Value::Boolean(true)],
            vec![s("o2"), s("Silver Clinic"), Value::Boolean(true)],
            vec![s("o3"), s("Bronze Surgery"), Value::Boolean(false)],
        ],
    )
}

/// Four encounters referencing three distinct organizations; o1 is
/// referenced twice.
fn encounters() -> Dataset {
    Dataset::from_rows(
        "encounter",
        vec!["id", "status", "subject", "serviceProvider"],
        vec![
            vec![s("e1"), s("finished"), reference("p1"), reference("o1")],
            vec![s("e2"), s("finished"), reference("p1"), reference("o1")],
            vec![s("e3"), s("in-progress"), reference("p2"), reference("o2")],
            vec![s("e4"), s("finished"), reference("p3"), reference("o3")],
        ],
    )
}

fn conditions() -> Dataset {
    Dataset::from_rows(
        "condition",
        vec!["id", "subject", "code", "clinicalStatus"],
        vec![
            vec![
                s("c1"),
                reference("p1"),
                codeable(vec![
                    coding("http://snomed.info/sct", "195662009"),
                    coding("http://snomed.info/sct", "444814009"),
                ]),
                codeable(vec![coding(
                    "http://terminology.hl7.org/CodeSystem/condition-clinical",
                    "active",
                )]),
            ],
            vec![
                s("c2"),
                reference("p1"),
                codeable(vec![coding("http://snomed.info/sct", "444814009")]),
                codeable(vec![coding(
                    "http://terminology.hl7.org/CodeSystem/condition-clinical",
                    "resolved",
                )]),
            ],
            vec![
                s("c3"),
                reference("p2"),
                codeable(vec![coding("http://snomed.info/sct", "271737000")]),
                codeable(vec![coding(
                    "http://terminology.hl7.org/CodeSystem/condition-clinical",
                    "active",
                )]),
            ],
        ],
    )
}

/// One questionnaire with items nested four levels deep.
fn questionnaires() -> Dataset {
    let level4 = strct(vec![("linkId", s("1.1.1.1")), ("text", s("Level four"))]);
    let level3 = strct(vec![
        ("linkId", s("1.1.1")),
        ("text", s("Level three")),
        ("item", arr(vec![level4])),
    ]);
    let level2 = strct(vec![
        ("linkId", s("1.1")),
        ("text", s("Level two")),
        ("item", arr(vec![level3])),
    ]);
    let level1 = strct(vec![
        ("linkId", s("1")),
        ("text", s("Level one")),
        ("item", arr(vec![level2])),
    ]);
    Dataset::from_rows(
        "questionnaire",
        vec!["id", "title", "status", "item"],
        vec![vec![s("q1"), s("Intake"), s("active"), arr(vec![level1])]],
    )
}

/// Builds a context for the given subject type over the fixture tables.
/// Also installs a tracing subscriber honouring RUST_LOG, so compiler
/// debug output is visible when a test needs investigating.
pub fn context_for(subject: &str) -> ParserContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let registry = Arc::new(builtin_registry().clone());
    ParserContext::new(subject, Arc::new(StaticSource::with_fixtures()), registry)
        .expect("fixture context")
}

pub fn context_with_config(subject: &str, config: CompilerConfig) -> ParserContext {
    context_for(subject).with_config(config)
}

/// A gateway answering from fixed tables: translations keyed by
/// (system, code), value set membership keyed by (url, system, code).
pub struct MockGateway {
    translations: HashMap<(String, String), Vec<Coding>>,
    members: HashSet<(String, String, String)>,
}

impl MockGateway {
    pub fn new() -> MockGateway {
        let mut translations = HashMap::new();
        translations.insert(
            ("http://snomed.info/sct".to_string(), "195662009".to_string()),
            vec![Coding::new("http://example.org/target", "acute-viral")],
        );
        let mut members = HashSet::new();
        members.insert((
            "http://example.org/vs/respiratory".to_string(),
            "http://snomed.info/sct".to_string(),
            "195662009".to_string(),
        ));
        MockGateway { translations, members }
    }
}

impl TerminologyGateway for MockGateway {
    fn translate(
        &self,
        codings: &[Coding],
        _concept_map_url: &str,
        _reverse: bool,
        _equivalence: &str,
    ) -> Result<Vec<Coding>, TerminologyError> {
        let mut out = Vec::new();
        for coding in codings {
            if let (Some(system), Some(code)) = (&coding.system, &coding.code) {
                if let Some(translated) =
                    self.translations.get(&(system.clone(), code.clone()))
                {
                    out.extend(translated.iter().cloned());
                }
            }
        }
        Ok(out)
    }

    fn validate(&self, value_set_url: &str, codings: &[Coding]) -> Result<bool, TerminologyError> {
        Ok(codings.iter().any(|coding| {
            match (&coding.system, &coding.code) {
                (Some(system), Some(code)) => self.members.contains(&(
                    value_set_url.to_string(),
                    system.clone(),
                    code.clone(),
                )),
                _ => false,
            }
        }))
    }
}

/// A gateway that fails every call, for surfacing transport faults.
pub struct FailingGateway;

impl TerminologyGateway for FailingGateway {
    fn translate(
        &self,
        _codings: &[Coding],
        _concept_map_url: &str,
        _reverse: bool,
        _equivalence: &str,
    ) -> Result<Vec<Coding>, TerminologyError> {
        Err(TerminologyError::Transport("connection refused".to_string()))
    }

    fn validate(
        &self,
        _value_set_url: &str,
        _codings: &[Coding],
    ) -> Result<bool, TerminologyError> {
        Err(TerminologyError::Transport("connection refused".to_string()))
    }
}
