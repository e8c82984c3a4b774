//! FHIR R4 resource-type vocabulary and parsing of model answers against it.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// FHIR R4 (4.0.1) resource types.
pub const R4_RESOURCE_TYPES: &[&str] = &[
    "Account",
    "ActivityDefinition",
    "AdverseEvent",
    "AllergyIntolerance",
    "Appointment",
    "AppointmentResponse",
    "AuditEvent",
    "Basic",
    "Binary",
    "BiologicallyDerivedProduct",
    "BodyStructure",
    "Bundle",
    "CapabilityStatement",
    "CarePlan",
    "CareTeam",
    "CatalogEntry",
    "ChargeItem",
    "ChargeItemDefinition",
    "Claim",
    "ClaimResponse",
    "ClinicalImpression",
    "CodeSystem",
    "Communication",
    "CommunicationRequest",
    "CompartmentDefinition",
    "Composition",
    "ConceptMap",
    "Condition",
    "Consent",
    "Contract",
    "Coverage",
    "CoverageEligibilityRequest",
    "CoverageEligibilityResponse",
    "DetectedIssue",
    "Device",
    "DeviceDefinition",
    "DeviceMetric",
    "DeviceRequest",
    "DeviceUseStatement",
    "DiagnosticReport",
    "DocumentManifest",
    "DocumentReference",
    "EffectEvidenceSynthesis",
    "Encounter",
    "Endpoint",
    "EnrollmentRequest",
    "EnrollmentResponse",
    "EpisodeOfCare",
    "EventDefinition",
    "Evidence",
    "EvidenceVariable",
    "ExampleScenario",
    "ExplanationOfBenefit",
    "FamilyMemberHistory",
    "Flag",
    "Goal",
    "GraphDefinition",
    "Group",
    "GuidanceResponse",
    "HealthcareService",
    "ImagingStudy",
    "Immunization",
    "ImmunizationEvaluation",
    "ImmunizationRecommendation",
    "ImplementationGuide",
    "InsurancePlan",
    "Invoice",
    "Library",
    "Linkage",
    "List",
    "Location",
    "Measure",
    "MeasureReport",
    "Media",
    "Medication",
    "MedicationAdministration",
    "MedicationDispense",
    "MedicationKnowledge",
    "MedicationRequest",
    "MedicationStatement",
    "MedicinalProduct",
    "MedicinalProductAuthorization",
    "MedicinalProductContraindication",
    "MedicinalProductIndication",
    "MedicinalProductIngredient",
    "MedicinalProductInteraction",
    "MedicinalProductManufactured",
    "MedicinalProductPackaged",
    "MedicinalProductPharmaceutical",
    "MedicinalProductUndesirableEffect",
    "MessageDefinition",
    "MessageHeader",
    "MolecularSequence",
    "NamingSystem",
    "NutritionOrder",
    "Observation",
    "ObservationDefinition",
    "OperationDefinition",
    "OperationOutcome",
    "Organization",
    "OrganizationAffiliation",
    "Parameters",
    "Patient",
    "PaymentNotice",
    "PaymentReconciliation",
    "Person",
    "PlanDefinition",
    "Practitioner",
    "PractitionerRole",
    "Procedure",
    "Provenance",
    "Questionnaire",
    "QuestionnaireResponse",
    "RelatedPerson",
    "RequestGroup",
    "ResearchDefinition",
    "ResearchElementDefinition",
    "ResearchStudy",
    "ResearchSubject",
    "RiskAssessment",
    "RiskEvidenceSynthesis",
    "Schedule",
    "SearchParameter",
    "ServiceRequest",
    "Slot",
    "Specimen",
    "SpecimenDefinition",
    "StructureDefinition",
    "StructureMap",
    "Subscription",
    "Substance",
    "SubstanceNucleicAcid",
    "SubstancePolymer",
    "SubstanceProtein",
    "SubstanceReferenceInformation",
    "SubstanceSourceMaterial",
    "SubstanceSpecification",
    "SupplyDelivery",
    "SupplyRequest",
    "Task",
    "TerminologyCapabilities",
    "TestReport",
    "TestScript",
    "ValueSet",
    "VerificationResult",
    "VisionPrescription",
];

/// A FHIR resource type validated against the R4 vocabulary.
///
/// Always holds the canonical spelling, so `"allergy intolerance"` and
/// `"AllergyIntolerance"` parse to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(&'static str);

impl ResourceType {
    /// Look up a resource type by name, ignoring ASCII case and whitespace.
    pub fn lookup(name: &str) -> Option<Self> {
        let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return None;
        }
        R4_RESOURCE_TYPES
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(&compact))
            .map(ResourceType)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| CoreError::invalid_resource_type(s))
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The resource types a query is about, as inferred by the language model.
///
/// Keeps the model's raw answer next to the validated types. An empty type
/// list means the resource fetch runs unfiltered by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeHint {
    raw: String,
    types: Vec<ResourceType>,
}

impl ResourceTypeHint {
    pub fn from_model_output(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let types = parse_resource_types(&raw);
        Self { raw, types }
    }

    pub fn from_types(types: impl IntoIterator<Item = ResourceType>) -> Self {
        let types: Vec<ResourceType> =
            types.into_iter().collect::<IndexSet<_>>().into_iter().collect();
        let raw = join_types(&types);
        Self { raw, types }
    }

    pub fn unfiltered() -> Self {
        Self {
            raw: String::new(),
            types: Vec::new(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn types(&self) -> &[ResourceType] {
        &self.types
    }

    pub fn is_unfiltered(&self) -> bool {
        self.types.is_empty()
    }

    pub fn mentions(&self, resource_type: ResourceType) -> bool {
        self.types.contains(&resource_type)
    }
}

impl fmt::Display for ResourceTypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unfiltered() {
            f.write_str("unspecified")
        } else {
            f.write_str(&join_types(&self.types))
        }
    }
}

fn join_types(types: &[ResourceType]) -> String {
    types
        .iter()
        .map(ResourceType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Longest run of words a spelled-out type name spans, e.g.
/// `Medicinal Product Authorization`.
const MAX_NAME_WORDS: usize = 4;

/// Extract known resource types from free-form model output.
///
/// Scans the words of the answer against the vocabulary, so types are found
/// in lists, after labels (`Answer: Immunization`), with trailing commentary
/// (`Observation - for the height`) or inside a sentence. Parenthesised notes
/// are dropped, adjacent capitalised words are joined (`Claim Response` ->
/// `ClaimResponse`) and plurals fall back to their singular form. Only
/// capitalised words count, so prose such as "the patient's allergies" does
/// not add `Patient`; an all-lowercase answer is scanned leniently instead.
/// Order of first mention is kept.
pub fn parse_resource_types(text: &str) -> Vec<ResourceType> {
    let without_notes = strip_parenthesized(text);
    let phrases: Vec<Vec<&str>> = without_notes
        .split(|c: char| !(c.is_alphanumeric() || c.is_whitespace()))
        .map(|phrase| phrase.split_whitespace().collect())
        .filter(|words: &Vec<&str>| !words.is_empty())
        .collect();

    let found = scan_phrases(&phrases, true);
    if !found.is_empty() {
        return found.into_iter().collect();
    }
    let lenient = scan_phrases(&phrases, false);
    if !lenient.is_empty() {
        tracing::trace!(?lenient, "resource types matched without capitalisation");
    }
    lenient.into_iter().collect()
}

fn scan_phrases(phrases: &[Vec<&str>], capitalised_only: bool) -> IndexSet<ResourceType> {
    let mut found = IndexSet::new();
    for words in phrases {
        let mut start = 0;
        while start < words.len() {
            let longest = MAX_NAME_WORDS.min(words.len() - start);
            let matched = (1..=longest).rev().find_map(|len| {
                let window = &words[start..start + len];
                if capitalised_only && !window.iter().all(|word| starts_uppercase(word)) {
                    return None;
                }
                lookup_word_run(window).map(|resource_type| (resource_type, len))
            });
            match matched {
                Some((resource_type, len)) => {
                    found.insert(resource_type);
                    start += len;
                }
                None => start += 1,
            }
        }
    }
    found
}

fn lookup_word_run(words: &[&str]) -> Option<ResourceType> {
    let joined = words.concat();
    ResourceType::lookup(&joined).or_else(|| {
        joined
            .strip_suffix('s')
            .and_then(ResourceType::lookup)
    })
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn strip_parenthesized(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(' ');
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
