//! Configured path mappings.
//!
//! | Form          | Resolve (external -> internal) | Map (internal -> external) |
//! |---------------|--------------------------------|----------------------------|
//! | `int:ext`     | yes                            | yes                        |
//! | `int>ext`     | yes                            | no                         |
//! | `int<ext`     | no                             | yes                        |
//! | `path`        | identity                       | identity                   |

use super::MappingError;

/// One parsed mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub internal: String,
    pub external: String,
    pub inbound: bool,
    pub outbound: bool,
}

impl MappingRule {
    pub fn parse(spec: &str) -> Result<Self, MappingError> {
        let spec_trimmed = spec.trim();
        if spec_trimmed.is_empty() {
            return Err(MappingError::Rule(spec.to_string(), "mapping is empty"));
        }

        let split = [('>', true, false), ('<', false, true), (':', true, true)]
            .into_iter()
            .find_map(|(op, inbound, outbound)| {
                spec_trimmed
                    .split_once(op)
                    .map(|(internal, external)| (internal, external, inbound, outbound))
            });

        let (internal, external, inbound, outbound) = match split {
            Some(parts) => parts,
            None => (spec_trimmed, spec_trimmed, true, true),
        };

        let internal = internal.trim();
        let external = external.trim();
        if internal.is_empty() || external.is_empty() {
            return Err(MappingError::Rule(
                spec.to_string(),
                "both sides of a mapping must be set",
            ));
        }

        Ok(Self {
            internal: internal.to_string(),
            external: external.to_string(),
            inbound,
            outbound,
        })
    }

    /// Identity mappings need no map entry.
    pub fn is_identity(&self) -> bool {
        self.internal == self.external
    }
}
