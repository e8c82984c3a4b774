//! Prompt and query templates.
//!
//! The lookup templates mirror the sentence shapes used when FHIR resources
//! were flattened to text for indexing, which is what makes a templated
//! query land near the right entries.

use octofhir_rag_core::{PatientName, ResourceTypeHint};

/// System instruction for pulling the patient name out of a question.
pub const PATIENT_NAME_SYSTEM: &str = r#"Given the following question from the user, identify all potential first and last names within this sentence.

The name might contain numbers e.g. Carmelo33, Reichert620, Antone63
The name might also contain numbers e.g. Andrea7, Jenkins714, Chasity985, Pagac496, Carmelo33
The name might also contain an apostrophe e.g. Andrea's, John's, Johns' James'

Return the answer formatted as first-name last-name.

Use the form:
first-name last-name

Do not include any special formatting characters, like new lines or "\n".
Do not include triple quotes.

If there are no names, do not make one up.
If there are no names return None"#;

/// System instruction for guessing the FHIR resource types a question is about.
pub const RESOURCE_TYPE_SYSTEM: &str = r#"FHIR (Fast Healthcare Interoperability Resources) is a standard for exchanging healthcare data.
It defines various resources (like Patient, Observation, Procedure) to represent clinical concepts.
See all resource types here: https://hl7.org/fhir/R4/resourcelist.html

Given the following user's natural language question about healthcare data, help me understand which FHIR resources might be relevant.

The output must be a list of FHIR Resource Types.

If you are unable to identify Resource Types from the user question, do not make one up.
If you are unable to identify Resource Types from the user question return an empty string.

Examples
- Question: Where can I find a patient's immunization history?
  Possible FHIR Resource Types: Patient (for demographics), Immunization (to record immunization events)
- Question: How do I track medication dosage changes?
  Possible FHIR Resource Types: MedicationRequest, MedicationDispense (depends on dosage tracking detail needed)
- Question: What can you tell me about Alina705's claim created on 03/17/2007?
  Possible FHIR Resource Types: Claim, ClaimResponse
- Question: Explain why a Throat culture procedure was performed on Antone63 on 2014-04-20?
  Possible FHIR Resource Types: Procedure
- Question: What medications is Antone69 allergic to?
  Possible FHIR Resource Types: AllergyIntolerance
- Question: What is Babara869's height?
  Possible FHIR Resource Types: Observation
- Question: When was the last blood pressure reading for Carmelo33 taken?
  Possible FHIR Resource Types: Observation
- Question: Based on this explanation of benefits created on February 11, 1999, how much did it cost and what service was provided?
  Possible FHIR Resource Types: ExplanationOfBenefit"#;

/// Pseudo-document shaped like an indexed Patient entry for `name`.
pub fn patient_lookup_query(name: &PatientName) -> String {
    format!(
        "The type of information in this entry is patient.\n\
         The name use for this patient is official. The name family for this patient is {name}\n\
         The name given 0 for this patient is {name}"
    )
}

/// Resource query for `query`, prefixed with the hinted types unless the
/// hint is unfiltered.
pub fn resource_query(query: &str, hint: &ResourceTypeHint) -> String {
    if hint.is_unfiltered() {
        query.to_string()
    } else {
        format!("The type of information in this entry is {hint}. {query}")
    }
}
