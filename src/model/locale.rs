use serde::{Deserialize, Serialize};

/// Locale configuration: whether multilingual values are active and which
/// locale codes (e.g. "de_DE") are configured, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleSettings {
    #[serde(default)]
    pub is_multilang_active: bool,
    #[serde(default)]
    pub input_language_list: Vec<String>,
}

/// One physical field produced by locale expansion: the base field itself
/// (`locale = None`) or a locale-qualified variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVariant {
    pub field: String,
    pub locale: Option<String>,
}

impl LocaleSettings {
    pub fn new(locales: &[&str]) -> Self {
        Self {
            is_multilang_active: !locales.is_empty(),
            input_language_list: locales.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// The locale codes in force: empty when multilingual support is off.
    pub fn active_locales(&self) -> &[String] {
        if self.is_multilang_active {
            &self.input_language_list
        } else {
            &[]
        }
    }

    /// Expand a logical field name into its ordered physical variants:
    /// the base field first, then one camel-cased variant per locale
    /// ("value" + "de_DE" -> "valueDeDe").
    pub fn expand(&self, base: &str) -> Vec<FieldVariant> {
        let mut variants = vec![FieldVariant {
            field: base.to_string(),
            locale: None,
        }];
        for code in self.active_locales() {
            variants.push(FieldVariant {
                field: format!("{}{}", base, locale_suffix(code)),
                locale: Some(code.clone()),
            });
        }
        variants
    }
}

/// Camel-cased field suffix for a locale code: "de_DE" -> "DeDe".
pub fn locale_suffix(code: &str) -> String {
    code.to_lowercase()
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
