//! Tests for the transcode client against a mock worker.

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vtc_models::{JobId, JobState, PresetChoice, QualityLevel, SubmitMetadata};

use crate::client::TranscodeClient;
use crate::config::ClientConfig;
use crate::error::TranscodeError;
use crate::multipart::UploadSource;

// =============================================================================
// Test Helpers
// =============================================================================

fn client_for(server: &MockServer) -> TranscodeClient {
    TranscodeClient::new(ClientConfig::with_base_url(server.uri())).unwrap()
}

fn job_json(id: &str, state: &str, progress: u8) -> serde_json::Value {
    json!({
        "success": true,
        "job": {
            "id": id,
            "state": state,
            "progress": progress,
            "inputFile": "/data/uploads/tmp/in.mov",
            "preset": "web_1080p"
        }
    })
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_bytes_sends_multipart_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode/upload"))
        .and(header_exists("x-request-id"))
        .and(body_string_contains("name=\"preset\""))
        .and(body_string_contains("web_1080p"))
        .and(body_string_contains("\"schemaVersion\":1"))
        .and(body_string_contains("filename=\"talk.mp4\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "jobId": "101",
            "videoInfo": { "duration": 600.0, "width": 3840, "height": 2160 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let meta = SubmitMetadata::new().with_title("talk");
    let response = client
        .submit(
            UploadSource::from_bytes("talk.mp4", b"not really a video".to_vec()),
            &PresetChoice::named("web_1080p"),
            None,
            Some(&meta),
        )
        .await
        .unwrap();

    assert_eq!(response.job_id, JobId::from("101"));
    let probe = response.video_probe.unwrap();
    assert_eq!(probe.duration_minutes(), Some(10.0));
    assert_eq!(probe.width, Some(3840));
}

#[tokio::test]
async fn test_submit_streams_file_from_disk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode/upload"))
        .and(body_string_contains("bytes from a temp file"))
        .and(body_string_contains("name=\"outputPath\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": "7" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::Builder::new().suffix(".mov").tempfile().unwrap();
    file.write_all(b"bytes from a temp file").unwrap();

    let client = client_for(&server);
    let response = client
        .submit(
            UploadSource::from_path(file.path()),
            &PresetChoice::Auto,
            Some("/data/media/out.mp4"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(response.job_id.as_str(), "7");
    assert!(response.video_probe.is_none());
}

#[tokio::test]
async fn test_submit_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode/upload"))
        .respond_with(ResponseTemplate::new(503).set_body_string("GPU busy"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .submit(
            UploadSource::from_bytes("a.mp4", vec![1, 2, 3]),
            &PresetChoice::Auto,
            None,
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, TranscodeError::Http { ref body, .. } if body == "GPU busy"));
}

#[tokio::test]
async fn test_submit_rejected_with_success_false() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Unknown preset: web_8k"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .submit_path("/data/uploads/a.mov", &PresetChoice::named("web_8k"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscodeError::Rejected(ref m) if m.contains("web_8k")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_submit_path_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode"))
        .and(body_json(json!({
            "inputFile": "/data/uploads/a.mov",
            "outputFile": "/data/media/a.mp4",
            "preset": "web_720p"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": "55" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .submit_path(
            "/data/uploads/a.mov",
            &PresetChoice::named("web_720p"),
            Some("/data/media/a.mp4"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(response.job_id.as_str(), "55");
}

#[tokio::test]
async fn test_submit_dynamic_drops_unknown_quality() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/transcode/dynamic"))
        .and(body_json(json!({ "inputFile": "/data/media/a.mov" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": "d1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .submit_dynamic("/data/media/a.mov", None, Some(QualityLevel::Unknown))
        .await
        .unwrap();

    assert_eq!(response.job_id.as_str(), "d1");
}

// =============================================================================
// Status and progress
// =============================================================================

#[tokio::test]
async fn test_get_status_parses_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/job/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("42", "active", 35)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job = client.get_status(&JobId::from("42")).await.unwrap();

    assert_eq!(job.state, JobState::Active);
    assert_eq!(job.progress, 35);
    assert_eq!(job.preset.as_deref(), Some("web_1080p"));
}

#[tokio::test]
async fn test_get_progress_uses_lightweight_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/job/42/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "42", "state": "active", "progress": 61
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/job/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("42", "active", 0)))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let progress = client.get_progress(&JobId::from("42")).await.unwrap();
    assert_eq!(progress.progress, 61);
}

#[tokio::test]
async fn test_get_progress_falls_back_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/job/42/progress"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/job/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("42", "completed", 100)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let progress = client.get_progress(&JobId::from("42")).await.unwrap();

    assert_eq!(progress.id, JobId::from("42"));
    assert_eq!(progress.state, JobState::Completed);
    assert_eq!(progress.progress, 100);
}

#[tokio::test]
async fn test_get_progress_reports_fallback_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_progress(&JobId::from("9")).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

// =============================================================================
// Capacity, catalog, analysis
// =============================================================================

#[tokio::test]
async fn test_is_available_reads_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "gpu": { "utilizationPercent": 97.0, "memoryUsedMb": 7800, "memoryTotalMb": 8192 },
            "queue": { "waiting": 12, "active": 2 },
            "availableForNewJobs": false
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_available().await.unwrap());

    let status = client.get_system_status().await.unwrap();
    assert_eq!(status.queue.depth(), 14);
    assert_eq!(status.gpu.memory_total_mb, 8192);
}

#[tokio::test]
async fn test_get_presets() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/presets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "presets": [{
                "name": "web_720p",
                "videoCodec": "h264_nvenc",
                "audioCodec": "aac",
                "width": 1280,
                "height": 720,
                "videoBitrate": "2500k",
                "audioBitrate": "128k",
                "fps": 30
            }]
        })))
        .mount(&server)
        .await;

    let presets = client_for(&server).get_presets().await.unwrap();
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].resolution(), "1280x720");
}

#[tokio::test]
async fn test_analyze_bitrate_failure_is_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze/bitrate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("ffprobe crashed"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let analysis = client.analyze_bitrate("/data/uploads/a.mov").await;
    assert!(analysis.is_unknown());
    assert!(client.try_analyze_bitrate("/data/uploads/a.mov").await.is_err());
}

#[tokio::test]
async fn test_analyze_bitrate_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze/bitrate"))
        .and(body_json(json!({ "inputFile": "/data/uploads/a.mov" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitrateRatio": 0.4,
            "quality": "low"
        })))
        .mount(&server)
        .await;

    let analysis = client_for(&server).analyze_bitrate("/data/uploads/a.mov").await;
    assert_eq!(analysis.quality, QualityLevel::Low);
    assert_eq!(analysis.bitrate_ratio, Some(0.4));
}

// =============================================================================
// Cleanup, health, queue
// =============================================================================

#[tokio::test]
async fn test_cleanup_missing_file_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/cleanup"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "ENOENT" })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .cleanup("/data/uploads/tmp/gone.mov")
        .await
        .unwrap();
    assert!(!response.deleted);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    assert!(client_for(&server).health_check().await);
}

#[tokio::test]
async fn test_health_check_unreachable_is_false() {
    // Nothing listens on port 9 in the test environment.
    let client = TranscodeClient::new(ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_queue_stats_and_clear() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/queue/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "waiting": 4, "active": 1, "completed": 30, "failed": 2, "delayed": 0
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/queue/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "cleared": 4 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stats = client.queue_stats().await.unwrap();
    assert_eq!(stats.depth(), 5);
    assert_eq!(client.clear_queue().await.unwrap(), 4);
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/job/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(job_json("1", "active", 5))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout: Duration::from_millis(200),
        ..ClientConfig::with_base_url(server.uri())
    };
    let client = TranscodeClient::new(config).unwrap();
    let err = client.get_status(&JobId::from("1")).await.unwrap_err();

    assert!(matches!(err, TranscodeError::Timeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let client = TranscodeClient::new(ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();
    let err = client.get_status(&JobId::from("1")).await.unwrap_err();

    assert!(matches!(err, TranscodeError::Network(_)));
    assert_eq!(err.status(), None);
    assert!(err.is_retryable());
}
