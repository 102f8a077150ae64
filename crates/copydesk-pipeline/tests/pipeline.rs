//! End-to-end pipeline runs against mocked edge functions.

use copydesk_core::{
    AudienceProfile, Channel, ChannelOption, EmailStyle, GenerationRequest, SocialPlatform,
    Structure,
};
use copydesk_pipeline::prompts::allowed_placeholders;
use copydesk_pipeline::{fallback, stages, FunctionsClient, Pipeline, PipelineError, PromptCatalog};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_pipeline(base_url: &str) -> Pipeline {
    pipeline_with(base_url, PromptCatalog::bundled())
}

fn pipeline_with(base_url: &str, catalog: PromptCatalog) -> Pipeline {
    let client =
        FunctionsClient::new(base_url, "anon-key", 5).expect("client construction should not fail");
    Pipeline::new(client, catalog, 0).with_rng(StdRng::seed_from_u64(3))
}

fn scenario_profile() -> AudienceProfile {
    AudienceProfile {
        name: "Zapracowane mamy".to_string(),
        age_range: "25-45".to_string(),
        gender: "female".to_string(),
        language_samples: "Nie mam na nic czasu".to_string(),
        biography: "Pracuje na etacie, dwoje dzieci".to_string(),
        beliefs: "Zdrowe jedzenie jest drogie".to_string(),
        pains: std::array::from_fn(|i| format!("bolączka {i}")),
        desires: std::array::from_fn(|i| format!("pragnienie {i}")),
        competitors: std::array::from_fn(|i| format!("konkurent {i}")),
        offer: "Kurs gotowania w 15 minut".to_string(),
        benefits: std::array::from_fn(|i| format!("korzyść {i}")),
        why_it_works: "Proste przepisy".to_string(),
        experience: "Dietetyczka od 2012".to_string(),
        ..AudienceProfile::default()
    }
}

fn request(channel: Channel, option: Option<ChannelOption>) -> GenerationRequest {
    GenerationRequest::new(scenario_profile(), channel, "Sprzedaż kursu", option)
        .expect("request is valid")
}

async fn mount_json(server: &MockServer, function: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/functions/v1/{function}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn bodies_sent_to(server: &MockServer, function: &str) -> Vec<Value> {
    let target = format!("/functions/v1/{function}");
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .into_iter()
        .filter(|r| r.url.path() == target)
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}

/// Mounts a well-formed response for every edge function.
async fn mount_every_function(server: &MockServer) {
    mount_json(server, "preprocess-profile", json!({"summary": "Mamy bez czasu"})).await;
    mount_json(server, "generate-hooks", json!({"hooks": ["H1", "H2"]})).await;
    mount_json(server, "generate-ad-script", json!({"content": "Skrypt"})).await;
    mount_json(server, "humanize-ad-script", json!({"content": "Skrypt 2"})).await;
    mount_json(
        server,
        "generate-email-blueprint",
        json!({"emotionalPoints": "a", "narrativeAxis": "b", "style": "c"}),
    )
    .await;
    mount_json(
        server,
        "generate-subject-lines",
        json!({"subject1": "S1", "subject2": "S2"}),
    )
    .await;
    mount_json(server, "generate-email-content", json!({"content": "Mail"})).await;
    mount_json(server, "cleanup-email", json!({"content": "Mail 2"})).await;
    mount_json(
        server,
        "generate-social-hook",
        json!({"hooks": ["H"], "theme": "t", "form": "f", "cta": "c"}),
    )
    .await;
    mount_json(server, "generate-social-post", json!({"content": "Post"})).await;
}

async fn called_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .into_iter()
        .map(|r| r.url.path().to_owned())
        .collect()
}

/// Overrides every template with one that references each placeholder its
/// stage is allowed to use.
fn catalog_using_every_placeholder() -> PromptCatalog {
    let yaml: String = PromptCatalog::bundled()
        .keys()
        .map(|key| {
            let names: Vec<String> = allowed_placeholders(key)
                .expect("bundled key has an allow-list")
                .iter()
                .map(|p| format!("{{{{{p}}}}}"))
                .collect();
            format!("{key}: \"{}\"\n", names.join(" "))
        })
        .collect();
    PromptCatalog::with_overrides_from_str(&yaml).expect("overrides accepted")
}

// ---------------------------------------------------------------------------
// Stage plans and overrides
// ---------------------------------------------------------------------------

#[tokio::test]
async fn runs_follow_the_stage_plan_and_render_every_allowed_placeholder() {
    let cases = [
        (Channel::Ad, None),
        (
            Channel::Email,
            Some(ChannelOption::EmailStyle(EmailStyle::Story)),
        ),
        (
            Channel::Social,
            Some(ChannelOption::Platform(SocialPlatform::Linkedin)),
        ),
    ];
    for (channel, option) in cases {
        let server = MockServer::start().await;
        mount_every_function(&server).await;

        pipeline_with(&server.uri(), catalog_using_every_placeholder())
            .run(&request(channel, option))
            .await
            .unwrap_or_else(|e| panic!("{channel} run failed: {e}"));

        let expected: Vec<String> = stages::plan(channel)
            .iter()
            .map(|stage| format!("/functions/v1/{}", stage.function))
            .collect();
        assert_eq!(called_paths(&server).await, expected, "{channel} call order");
    }
}

#[tokio::test]
async fn overridden_body_template_can_reference_structure() {
    let server = MockServer::start().await;
    mount_every_function(&server).await;
    let catalog = PromptCatalog::with_overrides_from_str(
        "email.body.PAS: \"Struktura {{structure}} {{subject}}\"\n\
         email.body.CJN: \"Struktura {{structure}} {{subject}}\"\n",
    )
    .expect("overrides accepted");

    let req = request(
        Channel::Email,
        Some(ChannelOption::EmailStyle(EmailStyle::Story)),
    );
    let artifact = pipeline_with(&server.uri(), catalog)
        .run(&req)
        .await
        .expect("email run succeeds");

    let structure = artifact.structure.expect("email has a structure");
    let content_calls = bodies_sent_to(&server, "generate-email-content").await;
    assert_eq!(
        content_calls[0]["prompt"],
        format!("Struktura {} S1", structure.as_str())
    );
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[tokio::test]
async fn email_scenario_produces_blueprint_two_subjects_and_tagged_body() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "generate-email-blueprint",
        json!({"emotionalPoints": "zmęczenie", "narrativeAxis": "od chaosu do spokoju", "style": "ciepły"}),
    )
    .await;
    mount_json(
        &server,
        "generate-subject-lines",
        json!({"subject1": "Obiad w 15 minut?", "subject2": "Koniec z głodnymi wieczorami"}),
    )
    .await;
    mount_json(&server, "generate-email-content", json!({"content": "Szkic maila"})).await;
    mount_json(&server, "cleanup-email", json!({"content": "Cześć!\n\nGotowy mail"})).await;

    let req = request(
        Channel::Email,
        Some(ChannelOption::EmailStyle(EmailStyle::Story)),
    );
    let artifact = test_pipeline(&server.uri())
        .run(&req)
        .await
        .expect("email run succeeds");

    let blueprint = artifact.blueprint.as_ref().expect("blueprint present");
    assert_eq!(blueprint.narrative_axis, "od chaosu do spokoju");
    assert_eq!(artifact.subject.as_deref(), Some("Obiad w 15 minut?"));
    assert_eq!(
        artifact.alternative_subject.as_deref(),
        Some("Koniec z głodnymi wieczorami")
    );
    assert_eq!(artifact.body, "Cześć!\n\nGotowy mail");
    assert!(matches!(
        artifact.structure,
        Some(Structure::Pas | Structure::Cjn)
    ));
    assert!(artifact.fallback_stages.is_empty());

    let content_calls = bodies_sent_to(&server, "generate-email-content").await;
    assert_eq!(content_calls.len(), 1);
    let structure = artifact.structure.map(Structure::as_str);
    assert_eq!(content_calls[0]["structure"].as_str(), structure);
    assert_eq!(content_calls[0]["subject"], "Obiad w 15 minut?");
    assert_eq!(content_calls[0]["targetAudience"]["ageRange"], "25-45");

    let blueprint_calls = bodies_sent_to(&server, "generate-email-blueprint").await;
    assert_eq!(blueprint_calls[0]["style"], "story");
    assert!(blueprint_calls[0]["prompt"]
        .as_str()
        .is_some_and(|p| p.contains("1. bolączka 0")));
}

#[tokio::test]
async fn empty_cleanup_falls_back_to_local_paragraph_split() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "generate-email-blueprint",
        json!({"emotionalPoints": "a", "narrativeAxis": "b", "style": "c"}),
    )
    .await;
    mount_json(
        &server,
        "generate-subject-lines",
        json!({"subject1": "S1", "subject2": "S2"}),
    )
    .await;
    mount_json(
        &server,
        "generate-email-content",
        json!({"content": "Jeden. Dwa. Trzy. Cztery."}),
    )
    .await;
    mount_json(&server, "cleanup-email", json!({"content": "   "})).await;

    let req = request(
        Channel::Email,
        Some(ChannelOption::EmailStyle(EmailStyle::Direct)),
    );
    let artifact = test_pipeline(&server.uri()).run(&req).await.expect("run");

    assert_eq!(artifact.body, "Jeden. Dwa. Trzy.\n\nCztery.");
    assert_eq!(artifact.fallback_stages, vec!["cleanup-email".to_string()]);
}

// ---------------------------------------------------------------------------
// Ad
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ad_run_ranks_hooks_and_uses_humanized_body() {
    let server = MockServer::start().await;
    mount_json(&server, "preprocess-profile", json!({"summary": "Mamy bez czasu"})).await;
    mount_json(
        &server,
        "generate-hooks",
        json!({"hooks": [{"hook": "Słaby", "score": 2}, {"hook": "Mocny", "score": 9}]}),
    )
    .await;
    mount_json(&server, "generate-ad-script", json!({"content": "Surowy skrypt"})).await;
    mount_json(&server, "humanize-ad-script", json!({"content": "Ludzki skrypt"})).await;

    let artifact = test_pipeline(&server.uri())
        .run(&request(Channel::Ad, None))
        .await
        .expect("ad run succeeds");

    assert_eq!(artifact.hooks, vec!["Mocny", "Słaby"]);
    assert_eq!(artifact.selected_hook, "Mocny");
    assert_eq!(artifact.body, "Ludzki skrypt");
    assert!(matches!(
        artifact.structure,
        Some(Structure::Pas | Structure::Aida)
    ));

    let script_calls = bodies_sent_to(&server, "generate-ad-script").await;
    assert_eq!(script_calls[0]["hook"], "Mocny");
    assert!(script_calls[0]["prompt"]
        .as_str()
        .is_some_and(|p| p.contains("Mamy bez czasu")));
}

#[tokio::test]
async fn transient_failures_are_retried_within_stage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/preprocess-profile"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_json(&server, "preprocess-profile", json!({"summary": "ok"})).await;
    mount_json(&server, "generate-hooks", json!({"hooks": ["H"]})).await;
    mount_json(&server, "generate-ad-script", json!({"content": "S"})).await;
    mount_json(&server, "humanize-ad-script", json!({"content": "S2"})).await;

    let artifact = test_pipeline(&server.uri())
        .run(&request(Channel::Ad, None))
        .await
        .expect("third attempt succeeds");

    assert_eq!(artifact.body, "S2");
    assert_eq!(bodies_sent_to(&server, "preprocess-profile").await.len(), 3);
}

#[tokio::test]
async fn exhausted_retries_abort_the_run_at_that_stage() {
    let server = MockServer::start().await;
    mount_json(&server, "preprocess-profile", json!({"summary": "ok"})).await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/generate-hooks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = test_pipeline(&server.uri())
        .run(&request(Channel::Ad, None))
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some("generate-hooks"));
    assert_eq!(bodies_sent_to(&server, "generate-hooks").await.len(), 3);
    assert!(bodies_sent_to(&server, "generate-ad-script").await.is_empty());
}

#[tokio::test]
async fn remote_error_body_aborts_without_retry() {
    let server = MockServer::start().await;
    mount_json(&server, "preprocess-profile", json!({"error": "model overloaded"})).await;

    let err = test_pipeline(&server.uri())
        .run(&request(Channel::Ad, None))
        .await
        .unwrap_err();

    match err {
        PipelineError::Stage { stage, source } => {
            assert_eq!(stage, "preprocess-profile");
            assert!(matches!(*source, PipelineError::Remote { .. }));
        }
        other => panic!("expected Stage error, got {other:?}"),
    }
    assert_eq!(bodies_sent_to(&server, "preprocess-profile").await.len(), 1);
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

#[tokio::test]
async fn social_run_substitutes_fallbacks_for_empty_fields() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "generate-social-hook",
        json!({"hooks": [], "theme": "Szybkie obiady"}),
    )
    .await;
    mount_json(&server, "generate-social-post", json!({"content": "Post"})).await;

    let req = request(
        Channel::Social,
        Some(ChannelOption::Platform(SocialPlatform::Instagram)),
    );
    let artifact = test_pipeline(&server.uri()).run(&req).await.expect("run");

    assert_eq!(artifact.selected_hook, fallback::HOOK);
    assert!(artifact.structure.is_none());
    let brief = artifact.social.as_ref().expect("brief present");
    assert_eq!(brief.theme, "Szybkie obiady");
    assert_eq!(brief.form, fallback::MISSING);
    assert_eq!(brief.cta, fallback::MISSING);
    assert_eq!(
        artifact.fallback_stages,
        vec!["generate-social-hook".to_string()]
    );

    let post_calls = bodies_sent_to(&server, "generate-social-post").await;
    assert_eq!(post_calls[0]["platform"], "instagram");
    assert_eq!(post_calls[0]["hook"], fallback::HOOK);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_call() {
    let server = MockServer::start().await;
    let mut req = request(Channel::Ad, None);
    req.audience.pains[0].clear();

    let err = test_pipeline(&server.uri()).run(&req).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRequest(_)), "got {err:?}");
    assert!(server
        .received_requests()
        .await
        .expect("recording enabled")
        .is_empty());
}
