//! Integration tests for the Gemini Live channel against a mock server
//!
//! These tests verify:
//! - Setup message contents per platform and modality
//! - Text and audio turns, over text and binary frames
//! - Server-initiated failures (goAway, refused setup)
//! - Deadline cancellation closes the socket

mod fixtures;
mod mock_providers;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mock_providers::live_mock::{audio_part, text_answer, text_part, transcription, turn_complete};
use mock_providers::{LiveScript, MockLiveServer, wait_until};
use waav_live_tester::config::Secret;
use waav_live_tester::{
    ChannelFactory, GeminiLiveFactory, Modality, ModelSpec, Platform, SessionTiming,
    StimulusUnit, StreamChannel, StreamEvent, TestCase, TesterConfig, TesterError, TurnSession,
    TurnState,
};

fn studio_config(server: &MockLiveServer) -> TesterConfig {
    let mut config = TesterConfig::default();
    config.credentials.google_api_key = Some(Secret::new("test-key".to_string()));
    config.endpoints.studio_live_url = server.url();
    config.timing.connect_timeout_secs = 5;
    config
}

async fn collect_turn(channel: &mut dyn StreamChannel) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = channel.next_event().await.unwrap() {
        let done = event == StreamEvent::TurnComplete;
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_text_turn_round_trip() {
    let server = MockLiveServer::start(vec![text_answer("The time is ", "3:45 PM UTC.")]).await;
    let factory = GeminiLiveFactory::new(Arc::new(studio_config(&server)));
    let case = TestCase::new(
        Platform::Studio,
        &ModelSpec::live("gemini-2.0-flash-live-001"),
        Modality::Text,
    );

    let mut channel = factory.open(&case).await.unwrap();
    channel
        .send(StimulusUnit::Text("What time is it now?".to_string()))
        .await
        .unwrap();
    let events = collect_turn(channel.as_mut()).await;
    channel.close().await.unwrap();
    assert!(channel.is_closed());

    assert_eq!(
        events,
        vec![
            StreamEvent::PartialText("The time is ".to_string()),
            StreamEvent::PartialText("3:45 PM UTC.".to_string()),
            StreamEvent::TurnComplete,
        ]
    );

    let session = &server.sessions()[0];
    assert!(session.uri.contains("key=test-key"));
    assert_eq!(session.authorization, None);

    let setup = session.setup.as_ref().unwrap();
    assert_eq!(setup["model"], "models/gemini-2.0-flash-live-001");
    assert_eq!(setup["generationConfig"]["responseModalities"][0], "TEXT");
    assert!(setup["tools"][0]["googleSearch"].is_object());
    assert!(setup.get("outputAudioTranscription").is_none());

    let content = &session.client_content[0];
    assert_eq!(content["turns"][0]["role"], "user");
    assert_eq!(content["turns"][0]["parts"][0]["text"], "What time is it now?");
    assert_eq!(content["turnComplete"], true);
}

#[tokio::test]
async fn test_native_audio_turn_over_binary_frames() {
    let pcm = fixtures::samples_to_bytes(&fixtures::generate_sine_wave(
        480,
        440.0,
        0.5,
        fixtures::OUTPUT_RATE,
    ));
    let server = MockLiveServer::start(vec![LiveScript::RespondBinary(vec![
        audio_part(&pcm[..480]),
        audio_part(&pcm[480..]),
        transcription("It is ten o'clock"),
        turn_complete(),
    ])])
    .await;
    let factory = GeminiLiveFactory::new(Arc::new(studio_config(&server)));
    let case = TestCase::new(
        Platform::Studio,
        &ModelSpec::native_audio("gemini-2.5-flash-preview-native-audio-dialog"),
        Modality::Voice,
    );

    let mut channel = factory.open(&case).await.unwrap();
    let frames = [Bytes::from_static(&[1, 0, 2, 0]), Bytes::from_static(&[3, 0, 4, 0])];
    for frame in &frames {
        channel
            .send(StimulusUnit::AudioFrame(frame.clone()))
            .await
            .unwrap();
    }
    channel.finish_input().await.unwrap();
    let events = collect_turn(channel.as_mut()).await;
    channel.close().await.unwrap();

    assert_eq!(
        events,
        vec![
            StreamEvent::AudioFragment(Bytes::copy_from_slice(&pcm[..480])),
            StreamEvent::AudioFragment(Bytes::copy_from_slice(&pcm[480..])),
            StreamEvent::TranscribedText("It is ten o'clock".to_string()),
            StreamEvent::TurnComplete,
        ]
    );

    let session = &server.sessions()[0];
    let setup = session.setup.as_ref().unwrap();
    assert_eq!(setup["generationConfig"]["responseModalities"][0], "AUDIO");
    assert!(setup["outputAudioTranscription"].is_object());
    assert_eq!(session.audio_chunks, vec![vec![1, 0, 2, 0], vec![3, 0, 4, 0]]);
    assert_eq!(session.audio_mime.as_deref(), Some("audio/pcm;rate=16000"));
    assert!(session.audio_stream_end);
}

#[tokio::test]
async fn test_vertex_uses_bearer_token_and_region() {
    let server = MockLiveServer::start(vec![text_answer("It is ", "noon, 12 PM")]).await;
    let mut config = TesterConfig::default();
    config.credentials.vertex_project = Some("test-project".to_string());
    config.credentials.vertex_location = Some("us-central1".to_string());
    config.credentials.vertex_access_token = Some(Secret::new("vertex-token".to_string()));
    config.endpoints.vertex_live_url = server.vertex_url();
    let factory = GeminiLiveFactory::new(Arc::new(config));

    let case = TestCase::new(
        Platform::Vertex,
        &ModelSpec::live("gemini-2.0-flash-live-preview-04-09"),
        Modality::Text,
    )
    .with_region(Some("europe-west4".to_string()));

    let mut channel = factory.open(&case).await.unwrap();
    channel
        .send(StimulusUnit::Text("What time is it now?".to_string()))
        .await
        .unwrap();
    collect_turn(channel.as_mut()).await;
    channel.close().await.unwrap();

    let session = &server.sessions()[0];
    assert_eq!(session.uri, "/europe-west4/live");
    assert_eq!(session.authorization.as_deref(), Some("Bearer vertex-token"));
    assert_eq!(
        session.setup.as_ref().unwrap()["model"],
        "projects/test-project/locations/europe-west4/publishers/google/models/gemini-2.0-flash-live-preview-04-09"
    );
}

#[tokio::test]
async fn test_go_away_is_transport_error() {
    let server = MockLiveServer::start(vec![LiveScript::GoAway]).await;
    let factory = GeminiLiveFactory::new(Arc::new(studio_config(&server)));
    let case = TestCase::new(Platform::Studio, &ModelSpec::live("m"), Modality::Text);

    let mut channel = factory.open(&case).await.unwrap();
    channel
        .send(StimulusUnit::Text("What time is it now?".to_string()))
        .await
        .unwrap();
    let err = channel.next_event().await.unwrap_err();
    assert!(matches!(err, TesterError::Transport(_)));
    channel.close().await.unwrap();
}

#[tokio::test]
async fn test_refused_setup_fails_open() {
    let server = MockLiveServer::start(vec![LiveScript::RefuseSetup]).await;
    let factory = GeminiLiveFactory::new(Arc::new(studio_config(&server)));
    let case = TestCase::new(Platform::Studio, &ModelSpec::live("m"), Modality::Text);

    let err = factory.open(&case).await.err().unwrap();
    assert!(matches!(err, TesterError::Transport(_)));
    assert!(server.sessions()[0].setup.is_some());
}

#[tokio::test]
async fn test_deadline_closes_socket_and_keeps_partial_text() {
    let server = MockLiveServer::start(vec![LiveScript::Stall(vec![text_part("The time is")])]).await;
    let factory = GeminiLiveFactory::new(Arc::new(studio_config(&server)));
    let case = TestCase::new(Platform::Studio, &ModelSpec::live("m"), Modality::Text);
    let stimulus = waav_live_tester::Stimulus::Text {
        content: "What time is it now?".to_string(),
    };
    let timing = SessionTiming {
        turn_timeout: Duration::from_millis(300),
        frame_pacing: Duration::ZERO,
    };

    let result = TurnSession::new(&case, timing).run(&factory, &stimulus).await;

    assert_eq!(result.state, TurnState::TimedOut);
    assert_eq!(result.response.text, "The time is");
    assert!(!result.response.terminated);
    assert!(
        wait_until(Duration::from_secs(2), || server
            .sessions()
            .first()
            .is_some_and(|s| s.client_closed))
        .await
    );
    assert_eq!(server.connection_count(), 1);
}
