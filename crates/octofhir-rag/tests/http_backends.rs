use std::sync::Arc;
use std::time::Duration;

use assert_json_diff::assert_json_include;
use octofhir_rag::config::LlmConfig;
use octofhir_rag::{
    HttpSimilaritySearch, IndexError, LanguageModel, LlmError, MetadataFilter, OpenAiChatModel,
    PatientResourceRetriever, RetrieverError, SearchRequest, SimilaritySearch,
};
use octofhir_rag_core::{PatientId, ResourceTypeHint};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        base_url: format!("{}/v1", server.uri()),
        model: "gpt-test".into(),
        api_key: Some("sk-test".into()),
        ..Default::default()
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

fn search_client(server: &MockServer) -> HttpSimilaritySearch {
    HttpSimilaritySearch::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn chat_model_sends_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-test"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Babara869\n")))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAiChatModel::new(&llm_config(&server)).unwrap();
    let answer = model
        .complete("Identify names.", "What is Babara869's height?")
        .await
        .unwrap();
    assert_eq!(answer, "  Babara869\n");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_json_include!(
        actual: body,
        expected: json!({
            "messages": [
                {"role": "system", "content": "Identify names."},
                {"role": "user", "content": "What is Babara869's height?"}
            ]
        })
    );
}

#[tokio::test]
async fn chat_model_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let model = OpenAiChatModel::new(&llm_config(&server)).unwrap();
    match model.complete("s", "u").await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_model_requires_a_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let model = OpenAiChatModel::new(&llm_config(&server)).unwrap();
    assert!(matches!(
        model.complete("s", "u").await,
        Err(LlmError::EmptyCompletion)
    ));
}

#[tokio::test]
async fn chat_model_accepts_empty_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("")))
        .mount(&server)
        .await;

    let model = OpenAiChatModel::new(&llm_config(&server)).unwrap();
    assert_eq!(model.complete("s", "u").await.unwrap(), "");
}

#[test]
fn chat_model_rejects_bad_base_url() {
    let config = LlmConfig {
        base_url: "not a url".into(),
        ..Default::default()
    };
    assert!(matches!(
        OpenAiChatModel::new(&config),
        Err(LlmError::Configuration(_))
    ));
}

#[tokio::test]
async fn search_posts_request_and_truncates_to_k() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "k": 2,
            "filter": {"namespace": "fhir_patient_id", "allow_list": ["patient-42"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"content": "a", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.93},
                {"content": "b", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.88},
                {"content": "c", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.80}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = SearchRequest::new("allergies", 2, 0.75)
        .with_filter(MetadataFilter::allow("fhir_patient_id", ["patient-42"]));
    let hits = search_client(&server)
        .similarity_search(&request)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].content, "a");
    assert_eq!(hits[1].metadata["fhir_patient_id"], json!("patient-42"));
}

#[tokio::test]
async fn search_enforces_threshold_and_allow_list_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"content": "other patient", "metadata": {"fhir_patient_id": "patient-7"}, "score": 0.97},
                {"content": "weak match", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.2},
                {"content": "allergy", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.81},
                {"content": "no score", "metadata": {"fhir_patient_id": "patient-42"}},
                {"content": "condition", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.9}
            ]
        })))
        .mount(&server)
        .await;

    let request = SearchRequest::new("allergies", 20, 0.75)
        .with_filter(MetadataFilter::allow("fhir_patient_id", ["patient-42"]));
    let hits = search_client(&server)
        .similarity_search(&request)
        .await
        .unwrap();

    let contents: Vec<&str> = hits.iter().map(|hit| hit.content.as_str()).collect();
    assert_eq!(contents, vec!["condition", "allergy"]);
}

#[tokio::test]
async fn retriever_over_http_rejects_weak_patient_match() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{"role": "system", "content": octofhir_rag::prompts::PATIENT_NAME_SYSTEM}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Antone69")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{"role": "system", "content": octofhir_rag::prompts::RESOURCE_TYPE_SYSTEM}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("AllergyIntolerance")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"k": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": "patient entry", "metadata": {"fhir_patient_id": "patient-99"}, "score": 0.31}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"k": 20})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": "someone else", "metadata": {"fhir_patient_id": "patient-7"}, "score": 0.9}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = PatientResourceRetriever::new(
        Arc::new(OpenAiChatModel::new(&llm_config(&server)).unwrap()),
        Arc::new(search_client(&server)),
    );
    let err = retriever
        .retrieve("What medications is Antone69 allergic to?")
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieverError::PatientNotFound { name } if name == "Antone69"));
}

#[tokio::test]
async fn fetch_over_http_drops_other_patients_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"content": "someone else", "metadata": {"fhir_patient_id": "patient-7"}, "score": 0.9},
                {"content": "Allergy to penicillin.", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.8}
            ]
        })))
        .mount(&server)
        .await;

    let retriever = PatientResourceRetriever::new(
        Arc::new(OpenAiChatModel::new(&llm_config(&server)).unwrap()),
        Arc::new(search_client(&server)),
    );
    let records = retriever
        .fetch_resources(
            "What medications is Antone69 allergic to?",
            &ResourceTypeHint::unfiltered(),
            &PatientId::new("patient-42").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metadata["fhir_patient_id"], json!("patient-42"));
}

#[tokio::test]
async fn search_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index offline"))
        .mount(&server)
        .await;

    let result = search_client(&server)
        .similarity_search(&SearchRequest::new("q", 1, 0.8))
        .await;
    assert!(matches!(result, Err(IndexError::Status { status: 500, .. })));
}

#[tokio::test]
async fn search_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = search_client(&server)
        .similarity_search(&SearchRequest::new("q", 1, 0.8))
        .await;
    assert!(matches!(result, Err(IndexError::InvalidResponse(_))));
}

#[tokio::test]
async fn retriever_over_http_backends() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{"role": "system", "content": octofhir_rag::prompts::PATIENT_NAME_SYSTEM}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Antone69")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{"role": "system", "content": octofhir_rag::prompts::RESOURCE_TYPE_SYSTEM}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Possible FHIR Resource Types: AllergyIntolerance",
        )))
        .mount(&server)
        .await;

    // Patient lookup carries no filter; resource fetch does.
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"k": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": "patient entry", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.97}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "k": 20,
            "filter": {"namespace": "fhir_patient_id", "allow_list": ["patient-42"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": "Allergy to penicillin.", "metadata": {"fhir_patient_id": "patient-42"}, "score": 0.9}]
        })))
        .mount(&server)
        .await;

    let retriever = PatientResourceRetriever::new(
        Arc::new(OpenAiChatModel::new(&llm_config(&server)).unwrap()),
        Arc::new(search_client(&server)),
    );
    let output = retriever
        .retrieve("What medications is Antone69 allergic to?")
        .await
        .unwrap();

    let text = output.render();
    assert!(text.contains("The Patient name is Antone69"));
    assert!(text.contains("FHIR Resource Type is AllergyIntolerance"));
    assert!(text.contains("Patient_ID=patient-42"));
    assert!(text.ends_with("Allergy to penicillin."));
}
