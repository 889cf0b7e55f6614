//! Batch generator: one identifier and one rendered prompt per record.

use crate::template::{RenderError, Template};
use crate::types::{IdGenerator, RandomIdGenerator, Record, RequestId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Rendered prompts keyed by the identifier assigned to their record.
pub type Prompts = HashMap<RequestId, String>;

/// One record's identifier and rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRequest {
    pub id: RequestId,
    pub prompt: String,
}

/// Assigns identifiers and renders prompts.
///
/// By default ids are random (see [`RandomIdGenerator`]); inject another
/// [`IdGenerator`] for reproducible batches.
pub struct BatchGenerator {
    ids: Arc<dyn IdGenerator>,
    strict: bool,
}

impl BatchGenerator {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(RandomIdGenerator::new()))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids, strict: false }
    }

    /// Reject the whole batch when any record leaves a placeholder unbound.
    ///
    /// Off by default: unbound placeholders are kept verbatim.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Renders every record, preserving input order.
    ///
    /// Either every record is rendered or none is.
    pub fn render_requests(
        &self,
        template: &str,
        records: &[Record],
    ) -> Result<Vec<RenderedRequest>, RenderError> {
        let template = Template::new(template);
        if self.strict {
            for (index, record) in records.iter().enumerate() {
                if let Some(name) = template.unbound(record).first() {
                    return Err(RenderError::UnboundPlaceholder {
                        index,
                        placeholder: name.to_string(),
                    });
                }
            }
        }

        let requests: Vec<RenderedRequest> = records
            .iter()
            .map(|record| RenderedRequest {
                id: self.ids.next_id(),
                prompt: template.render(record),
            })
            .collect();

        let mut seen = std::collections::HashSet::with_capacity(requests.len());
        for request in &requests {
            if !seen.insert(request.id) {
                return Err(RenderError::DuplicateId { id: request.id });
            }
        }

        debug!(records = records.len(), strict = self.strict, "rendered prompt batch");
        Ok(requests)
    }

    /// Identifier → prompt mapping with exactly one entry per record.
    pub fn generate(&self, template: &str, records: &[Record]) -> Result<Prompts, RenderError> {
        Ok(self
            .render_requests(template, records)?
            .into_iter()
            .map(|r| (r.id, r.prompt))
            .collect())
    }

    /// Like [`generate`](Self::generate), from raw JSON objects.
    ///
    /// Every item is converted before any id is issued, so a bad item fails
    /// the batch without generating anything.
    pub fn generate_json(
        &self,
        template: &str,
        items: &[serde_json::Value],
    ) -> Result<Prompts, RenderError> {
        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| Record::from_json(index, item))
            .collect::<Result<Vec<_>, _>>()?;
        self.generate(template, &records)
    }
}

impl Default for BatchGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a batch with random identifiers and lenient rendering.
pub fn generate(template: &str, records: &[Record]) -> Result<Prompts, RenderError> {
    BatchGenerator::new().generate(template, records)
}
