//! Shared test fixtures: a counting mock gateway and raw multipart builders.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ApiError;
use crate::gemini::StyleGateway;
use crate::types::{Photo, Salon, StyleAdvice};

pub const TEST_BOUNDARY: &str = "----stylesync-test-boundary";

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={TEST_BOUNDARY}")
}

pub fn file_part(name: &str, filename: &str, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{TEST_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {mime_type}\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

pub fn jpeg_file_part(name: &str) -> Vec<u8> {
    file_part(
        name,
        &format!("{name}.jpg"),
        "image/jpeg",
        &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46],
    )
}

pub fn text_part(name: &str, value: &str) -> Vec<u8> {
    format!(
        "--{TEST_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
    )
    .into_bytes()
}

pub fn close_delimiter() -> Vec<u8> {
    format!("--{TEST_BOUNDARY}--\r\n").into_bytes()
}

pub fn multipart_body(parts: Vec<Vec<u8>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(&part);
    }
    body.extend_from_slice(&close_delimiter());
    body
}

pub fn sample_advice() -> StyleAdvice {
    StyleAdvice {
        style_name: "레이어드 컷".to_string(),
        technique: "레이어를 충분히 내어 자연스러운 흐름을 살립니다.".to_string(),
        growth_guide: "약 3개월, 5cm 정도 길러야 합니다.".to_string(),
        styling_tips: "아침에 에센스를 발라 결을 정리하세요.".to_string(),
    }
}

/// Gateway stand-in with per-operation call counters.
pub struct MockGateway {
    advice: Option<StyleAdvice>,
    simulation: Option<String>,
    salons: Vec<Salon>,
    analyze_calls: AtomicUsize,
    simulate_calls: AtomicUsize,
    salon_calls: AtomicUsize,
}

impl MockGateway {
    pub fn succeeding() -> Self {
        Self {
            advice: Some(sample_advice()),
            simulation: Some("data:image/png;base64,aGVsbG8=".to_string()),
            salons: vec![Salon {
                name: "준오헤어 강남점".to_string(),
                address: Some("지도에서 위치 보기".to_string()),
                url: Some("https://maps.example/1".to_string()),
            }],
            analyze_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
            salon_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failing_analysis() -> Self {
        Self {
            advice: None,
            ..Self::succeeding()
        }
    }

    pub fn without_simulation(mut self) -> Self {
        self.simulation = None;
        self
    }

    pub fn with_salons(mut self, salons: Vec<Salon>) -> Self {
        self.salons = salons;
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub fn salon_calls(&self) -> usize {
        self.salon_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StyleGateway for MockGateway {
    async fn simulate(&self, _current: &Photo, _desired: &Photo) -> Option<String> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulation.clone()
    }

    async fn analyze(&self, _current: &Photo, _desired: &Photo) -> Result<StyleAdvice, ApiError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.advice
            .clone()
            .ok_or_else(|| ApiError::upstream("스타일 분석에 실패했습니다.", "mock analysis failure"))
    }

    async fn find_salons(&self, _style_name: &str, _lat: f64, _lng: f64) -> Vec<Salon> {
        self.salon_calls.fetch_add(1, Ordering::SeqCst);
        self.salons.clone()
    }
}
