use std::env;

use anyhow::Result;

/// Process-wide configuration, loaded once at startup and read-only after.
/// The provider credential is required up front so a missing key fails the
/// process instead of the first request.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_image_model: String,
    pub gemini_analysis_model: String,
    pub gemini_search_model: String,
    pub gemini_timeout_seconds: u64,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }

        Ok(Config {
            port: env_u16("PORT", 3001),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            gemini_api_key,
            gemini_base_url: env_string(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_analysis_model: env_string("GEMINI_ANALYSIS_MODEL", "gemini-3-flash-preview"),
            gemini_search_model: env_string("GEMINI_SEARCH_MODEL", "gemini-2.5-flash"),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 90),
        })
    }
}

pub const SIMULATION_PROMPT: &str = "You are a professional virtual hair stylist. Your goal is to show the user (Image 1) exactly how they would look with the hairstyle from the reference photo (Image 2).\n\n\
STRICT GENERATION GUIDELINES:\n\
1. **Base Subject**: Use the person in IMAGE 1 as the base. KEEP their face, facial features, skin tone, expression, and clothing EXACTLY THE SAME. Do not change the person's identity.\n\
2. **Target Hairstyle**: Extract the hairstyle (cut, shape, volume, texture, length) from IMAGE 2 and apply it to the person in Image 1.\n\
3. **Seamless Blending**: The new hair must look naturally grown from the user's head. Match the lighting and shadows of Image 1 so it looks like a real photo, not a sticker.\n\
4. **Composition**: ensure the FULL HEAD and HAIRSTYLE are visible. Do not crop the top of the hair. Keep the image framing similar to Image 1.\n\
5. **Output**: A high-quality, photorealistic portrait of the User (Image 1) wearing the Hairstyle (Image 2).";

pub const ANALYSIS_PROMPT: &str = "Analyze these two images. Image 1 is the user's current hair. Image 2 is the desired hairstyle.\n\
Provide a structured JSON response with the following fields. **All values must be written in Korean.**\n\
1. 'styleName': A concise name for the desired style (e.g., '레이어드 컷', '가일컷').\n\
2. 'technique': Detailed technical instructions for a professional hairdresser to achieve this look on the user's current hair (cuts, texturing, chemical treatments).\n\
3. 'growthGuide': Estimate how long the user needs to grow their hair (in months or cm) or if it needs cutting. Be specific based on the length difference.\n\
4. 'stylingTips': Daily styling advice for the user to maintain this look.\n\n\
Return ONLY valid JSON.";
