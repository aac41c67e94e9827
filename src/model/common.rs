use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

/// Declared type of an attribute. Unknown strings deserialize to `Unknown`
/// so that rows written by newer deployments still decode (pass-through).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    Float,
    Enum,
    MultiEnum,
    Array,
    EnumMultiLang,
    MultiEnumMultiLang,
    ArrayMultiLang,
    #[serde(other)]
    Unknown,
}

impl AttributeType {
    /// Whether this type carries one extra raw value per configured locale.
    pub fn is_multilang(&self) -> bool {
        matches!(
            self,
            AttributeType::EnumMultiLang
                | AttributeType::MultiEnumMultiLang
                | AttributeType::ArrayMultiLang
        )
    }

    /// The per-field type: multilingual variants decode each field with the
    /// rules of their base type.
    pub fn base(&self) -> AttributeType {
        match self {
            AttributeType::EnumMultiLang => AttributeType::Enum,
            AttributeType::MultiEnumMultiLang => AttributeType::MultiEnum,
            AttributeType::ArrayMultiLang => AttributeType::Array,
            other => *other,
        }
    }

    /// Enumerated types expose their allowed options via `typeValue`.
    pub fn is_enumerated(&self) -> bool {
        matches!(
            self.base(),
            AttributeType::Enum | AttributeType::MultiEnum | AttributeType::Array
        )
    }
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_type_serde_uses_original_names() {
        assert_eq!(
            serde_json::to_string(&AttributeType::MultiEnumMultiLang).unwrap(),
            "\"multiEnumMultiLang\""
        );
        let ty: AttributeType = serde_json::from_str("\"multiEnum\"").unwrap();
        assert_eq!(ty, AttributeType::MultiEnum);
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let ty: AttributeType = serde_json::from_str("\"wysiwyg\"").unwrap();
        assert_eq!(ty, AttributeType::Unknown);
        assert!(!ty.is_multilang());
    }

    #[test]
    fn multilang_variants_report_base_type() {
        assert_eq!(AttributeType::ArrayMultiLang.base(), AttributeType::Array);
        assert_eq!(AttributeType::EnumMultiLang.base(), AttributeType::Enum);
        assert!(AttributeType::MultiEnumMultiLang.is_multilang());
        assert!(!AttributeType::Int.is_multilang());
    }
}
