use futures::future::join_all;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::json;
use tracing::info;

use crate::{
    generator::{GenerationError, Generator},
    models::{GeneratedCode, GenerationRequest, GenerationType},
};

/// Per-type outcomes of one generation batch, in request order.
#[derive(Debug)]
pub struct GenerationResults {
    entries: Vec<(GenerationType, Result<GeneratedCode, GenerationError>)>,
}

impl GenerationResults {
    pub fn types(&self) -> Vec<GenerationType> {
        self.entries.iter().map(|(ty, _)| *ty).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = (GenerationType, &GeneratedCode)> {
        self.entries.iter().filter_map(|(ty, r)| r.as_ref().ok().map(|code| (*ty, code)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ty: GenerationType) -> Option<&Result<GeneratedCode, GenerationError>> {
        self.entries.iter().find(|(t, _)| *t == ty).map(|(_, r)| r)
    }

    pub fn all_failed(&self) -> bool {
        self.success_count() == 0
    }
}

fn error_entry(err: &GenerationError) -> serde_json::Value {
    json!({
        "error": format!("Failed to generate {}", err.ty),
        "details": err.source.to_string(),
    })
}

impl Serialize for GenerationResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ty, result) in &self.entries {
            match result {
                Ok(code) => map.serialize_entry(ty.as_str(), code)?,
                Err(err) => map.serialize_entry(ty.as_str(), &error_entry(err))?,
            }
        }
        map.end()
    }
}

/// Runs every requested type concurrently. A failing type never aborts the others.
pub async fn generate_all(generator: &Generator, request: &GenerationRequest) -> GenerationResults {
    info!("🚀 Generating {:?} for prompt: {}", request.types, crate::completion::preview(&request.prompt, 100));

    let runs = request.types.iter().map(|&ty| async move {
        let result = generator
            .generate(&request.prompt, ty, request.framework.as_deref(), &request.features)
            .await;
        (ty, result)
    });
    let entries = join_all(runs).await;

    let results = GenerationResults { entries };
    info!("✅ Generation batch finished: {}/{} types succeeded", results.success_count(), results.len());
    results
}
