use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    completion::{CompletionError, CompletionService},
    models::{GeneratedCode, GenerationType},
    parser::parse_generated_code,
};

/// A per-type generation failure; sibling types are unaffected.
#[derive(Debug, Error)]
#[error("Failed to generate {ty}: {source}")]
pub struct GenerationError {
    pub ty: GenerationType,
    pub source: CompletionError,
}

/// Builds type-specific prompts and runs them through the completion service.
pub struct Generator {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl Generator {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self { completion, timeout }
    }

    /// Generates one project of the given type. `framework` falls back to the type default.
    pub async fn generate(
        &self,
        prompt: &str,
        ty: GenerationType,
        framework: Option<&str>,
        features: &[String],
    ) -> Result<GeneratedCode, GenerationError> {
        let framework = framework.unwrap_or(ty.default_framework());
        let generation_prompt = build_generation_prompt(ty, framework, prompt, features);
        info!(
            "🎯 Generating {} ({}) for prompt: {}",
            ty,
            framework,
            crate::completion::preview(prompt, 100)
        );

        match self.complete_bounded(&generation_prompt).await {
            Ok(raw) => {
                let code = parse_generated_code(&raw);
                info!("✅ {} generated with {} files", ty, code.files.len());
                Ok(code)
            }
            Err(source) => {
                error!("❌ {} generation failed: {}", ty, source);
                Err(GenerationError { ty, source })
            }
        }
    }

    /// Re-generates existing code according to a follow-up instruction.
    pub async fn enhance(
        &self,
        existing: &serde_json::Value,
        instruction: &str,
    ) -> Result<GeneratedCode, CompletionError> {
        let prompt = build_enhancement_prompt(existing, instruction);
        info!("🛠️ Enhancing code: {}", crate::completion::preview(instruction, 100));
        let raw = self.complete_bounded(&prompt).await?;
        Ok(parse_generated_code(&raw))
    }

    async fn complete_bounded(&self, prompt: &str) -> Result<String, CompletionError> {
        tokio::time::timeout(self.timeout, self.completion.complete(prompt))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))?
    }
}

pub fn build_generation_prompt(
    ty: GenerationType,
    framework: &str,
    user_prompt: &str,
    features: &[String],
) -> String {
    let mut prompt = match ty {
        GenerationType::Website => website_prompt(framework, user_prompt),
        GenerationType::MobileApp => mobile_app_prompt(framework, user_prompt),
    };
    let features: Vec<&str> = features.iter().map(|f| f.trim()).filter(|f| !f.is_empty()).collect();
    if !features.is_empty() {
        prompt.push_str("\n\nRequested features:\n");
        for feature in features {
            prompt.push_str("- ");
            prompt.push_str(feature);
            prompt.push('\n');
        }
    }
    prompt.push_str("\n\nGenerate the complete project now:");
    prompt
}

fn website_prompt(framework: &str, user_prompt: &str) -> String {
    format!(r#"Generate a complete, production-ready {framework} website based on this requirement: "{user_prompt}"

IMPORTANT: Return ONLY a valid JSON object with this exact structure (no markdown, no code blocks, just raw JSON):

{{
  "type": "website",
  "framework": "{framework}",
  "files": {{
    "index.html": "<!DOCTYPE html>...",
    "styles.css": "/* CSS code */",
    "script.js": "// JavaScript code"
  }},
  "dependencies": {{
    "package-name": "version"
  }},
  "structure": ["index.html", "styles.css", "script.js"],
  "instructions": "Setup and deployment instructions"
}}

Requirements:
1. Generate complete, working code for every file
2. Use a modern, responsive design in the stylesheet
3. Add interactive behaviour in the script
4. Handle errors properly and keep the code clean
5. Comment the key sections
6. Keep it cross-browser compatible
7. Add SEO meta tags to the HTML"#)
}

fn mobile_app_prompt(framework: &str, user_prompt: &str) -> String {
    format!(r#"Generate a complete, production-ready {framework} mobile app based on this requirement: "{user_prompt}"

IMPORTANT: Return ONLY a valid JSON object with this exact structure (no markdown, no code blocks, just raw JSON):

{{
  "type": "mobile-app",
  "framework": "{framework}",
  "files": {{
    "App.js": "import React from 'react'...",
    "package.json": "{{ ... }}",
    "app.json": "{{ ... }}",
    "screens/HomeScreen.js": "...",
    "components/Header.js": "...",
    "navigation/AppNavigator.js": "..."
  }},
  "dependencies": {{
    "react": "18.2.0",
    "react-native": "0.72.0",
    "@react-navigation/native": "^6.0.0"
  }},
  "structure": ["App.js", "screens/", "components/", "navigation/"],
  "instructions": "Setup: npm install && npx expo start"
}}

Requirements:
1. Generate complete cross-platform code (Expo compatible)
2. Set up navigation between screens
3. Build reusable components
4. Style with StyleSheet
5. Include an error boundary
6. Comment the code for clarity"#)
}

pub fn build_enhancement_prompt(existing: &serde_json::Value, instruction: &str) -> String {
    let serialized = serde_json::to_string_pretty(existing).unwrap_or_else(|_| existing.to_string());
    format!(r#"Enhance the following code based on this request: "{instruction}"

Existing code:
{serialized}

Return the enhanced code in the same JSON structure format (type, framework, files, dependencies, structure, instructions)."#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    struct Recording {
        prompts: Mutex<Vec<String>>,
        reply: Result<String, ()>,
        delay: Duration,
    }

    #[async_trait]
    impl CompletionService for Recording {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(|_| CompletionError::Transport("connection reset".into()))
        }
    }

    fn recording(reply: Result<&str, ()>, delay: Duration) -> Arc<Recording> {
        Arc::new(Recording { prompts: Mutex::new(vec![]), reply: reply.map(str::to_string), delay })
    }

    #[test]
    fn website_prompt_uses_framework_and_features() {
        let p = build_generation_prompt(GenerationType::Website, "html", "todo app", &["dark mode".into(), " ".into()]);
        assert!(p.contains("production-ready html website"));
        assert!(p.contains("\"todo app\""));
        assert!(p.contains("\"type\": \"website\""));
        assert!(p.contains("- dark mode\n"));
        assert!(!p.contains("- \n"));
    }

    #[test]
    fn mobile_prompt_asks_for_screens_and_navigation() {
        let p = build_generation_prompt(GenerationType::MobileApp, "react-native", "notes", &[]);
        assert!(p.contains("\"type\": \"mobile-app\""));
        assert!(p.contains("navigation/AppNavigator.js"));
        assert!(!p.contains("Requested features"));
    }

    #[test]
    fn enhancement_prompt_embeds_existing_code() {
        let existing = serde_json::json!({"files": {"index.html": "<p>hi</p>"}});
        let p = build_enhancement_prompt(&existing, "add a footer");
        assert!(p.contains("\"add a footer\""));
        assert!(p.contains("<p>hi</p>"));
    }

    #[tokio::test]
    async fn applies_default_framework() {
        let svc = recording(Ok(r#"{"type":"mobile-app","framework":"react-native","files":{"App.js":"x"}}"#), Duration::ZERO);
        let generator = Generator::new(svc.clone(), Duration::from_secs(5));
        let code = generator.generate("notes", GenerationType::MobileApp, None, &[]).await.unwrap();
        assert_eq!(code.files["App.js"], "x");
        assert!(svc.prompts.lock()[0].contains("production-ready react-native mobile app"));
    }

    #[tokio::test]
    async fn upstream_failure_carries_type() {
        let generator = Generator::new(recording(Err(()), Duration::ZERO), Duration::from_secs(5));
        let err = generator.generate("x", GenerationType::Website, Some("vue"), &[]).await.unwrap_err();
        assert_eq!(err.ty, GenerationType::Website);
        assert!(err.to_string().contains("website"));
    }

    #[tokio::test]
    async fn slow_completion_times_out() {
        let generator = Generator::new(recording(Ok("{}"), Duration::from_millis(200)), Duration::from_millis(10));
        let err = generator.generate("x", GenerationType::Website, None, &[]).await.unwrap_err();
        assert!(matches!(err.source, CompletionError::Timeout(_)));
    }

    #[tokio::test]
    async fn enhance_reparses_through_fallback() {
        let generator = Generator::new(recording(Ok("<html>new</html>"), Duration::ZERO), Duration::from_secs(5));
        let code = generator.enhance(&serde_json::json!({}), "more").await.unwrap();
        assert_eq!(code.files["index.html"], "<html>new</html>");
    }
}
