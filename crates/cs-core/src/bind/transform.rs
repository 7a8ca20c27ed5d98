//! Two-way string transformers applied to bound fields.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cs_common::TransformError;

/// Converts a raw document string into the form a field parses, and back.
pub trait Transformer: Send + Sync {
    fn forward(&self, source: &str) -> Result<String, TransformError>;

    fn reverse(&self, target: &str) -> Result<String, TransformError>;
}

struct Trim;

impl Transformer for Trim {
    fn forward(&self, source: &str) -> Result<String, TransformError> {
        Ok(source.trim().to_string())
    }

    fn reverse(&self, target: &str) -> Result<String, TransformError> {
        Ok(target.to_string())
    }
}

struct Lowercase;

impl Transformer for Lowercase {
    fn forward(&self, source: &str) -> Result<String, TransformError> {
        Ok(source.to_lowercase())
    }

    fn reverse(&self, target: &str) -> Result<String, TransformError> {
        Ok(target.to_string())
    }
}

/// Forward decodes standard base64 into UTF-8 text; reverse encodes.
struct Base64;

impl Transformer for Base64 {
    fn forward(&self, source: &str) -> Result<String, TransformError> {
        let bytes = STANDARD
            .decode(source.trim())
            .map_err(|e| TransformError::new("base64", e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|_| TransformError::new("base64", "decoded bytes are not UTF-8"))
    }

    fn reverse(&self, target: &str) -> Result<String, TransformError> {
        Ok(STANDARD.encode(target.as_bytes()))
    }
}

/// Transformers by id.
#[derive(Clone)]
pub struct TransformerRegistry {
    entries: HashMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// A registry with nothing in it, not even the built-ins.
    pub fn empty() -> Self {
        TransformerRegistry {
            entries: HashMap::new(),
        }
    }

    /// Add or replace a transformer. Returns the one it replaced.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        transformer: Arc<dyn Transformer>,
    ) -> Option<Arc<dyn Transformer>> {
        self.entries.insert(id.into(), transformer)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Transformer>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn forward(&self, id: &str, source: &str) -> cs_common::Result<String> {
        let transformer = self.lookup(id)?;
        Ok(transformer.forward(source)?)
    }

    pub fn reverse(&self, id: &str, target: &str) -> cs_common::Result<String> {
        let transformer = self.lookup(id)?;
        Ok(transformer.reverse(target)?)
    }

    fn lookup(&self, id: &str) -> cs_common::Result<&Arc<dyn Transformer>> {
        self.entries
            .get(id)
            .ok_or_else(|| cs_common::Error::UnknownTransformer { id: id.to_string() })
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        let mut registry = TransformerRegistry::empty();
        registry.register("trim", Arc::new(Trim));
        registry.register("lowercase", Arc::new(Lowercase));
        registry.register("base64", Arc::new(Base64));
        registry
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
