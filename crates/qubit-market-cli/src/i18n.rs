// crates/qubit-market-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Locale selection and message rendering for CLI output.
// Purpose: Keep every user-facing CLI string in one translatable table.
// Dependencies: std::sync::OnceLock
// ============================================================================

//! ## Overview
//! Messages are looked up by dotted key in a per-locale static table and
//! rendered by substituting `{name}` placeholders with the arguments captured
//! by [`t!`](crate::t). The locale is chosen once per process.
//!
//! ## Invariants
//! - Every locale table carries the same keys and placeholders as English.
//! - Lookups fall back to English, then to the key itself.
//! - Placeholders without a matching argument are left in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

// ============================================================================
// SECTION: Locales
// ============================================================================

/// Languages the CLI can speak.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English, the fallback for missing entries.
    En,
    /// Catalan.
    Ca,
}

/// Every locale with a message table, English first.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

impl Locale {
    /// Primary language subtag (`en`, `ca`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Reads a language tag such as `ca`, `EN` or `ca_ES`.
    ///
    /// Only the primary subtag is considered; region suffixes are ignored.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let primary = value.trim().split(['-', '_']).next().unwrap_or_default();
        SUPPORTED_LOCALES.iter().copied().find(|locale| locale.tag().eq_ignore_ascii_case(primary))
    }

    /// Message table for this locale.
    pub(crate) const fn messages(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::En => CATALOG_EN,
            Self::Ca => CATALOG_CA,
        }
    }

    /// Template for `key` in this locale's table.
    pub(crate) fn lookup(self, key: &str) -> Option<&'static str> {
        self.messages().iter().find(|(candidate, _)| *candidate == key).map(|(_, text)| *text)
    }
}

/// Locale chosen for this process.
static ACTIVE_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Selects the output locale. Later calls are ignored.
pub fn set_locale(locale: Locale) {
    let _ = ACTIVE_LOCALE.set(locale);
}

/// Locale selected with [`set_locale`], or English.
#[must_use]
pub fn current_locale() -> Locale {
    ACTIVE_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// One named value for a `{name}` placeholder.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Rendered value.
    pub value: String,
}

impl MessageArg {
    /// Pairs a placeholder name with its rendered value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "qubit-market {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config validated successfully."),
    (
        "store.config.unsupported_backend",
        "Ledger commands need a durable store: set [store] type = \"sqlite\" with a path, or \
         pass --store-path.",
    ),
    ("store.open_failed", "Failed to open ledger store: {error}"),
    ("audit.open_failed", "Failed to open audit log at {path}: {error}"),
    ("market.open_failed", "Failed to open market: {error}"),
    ("market.operation_failed", "Operation rejected ({kind}): {error}"),
    ("ledger.history.failed", "Failed to read ledger history: {error}"),
    ("ledger.version.not_found", "Ledger version not found: {version}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "qubit-market {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut generar la sortida JSON: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "La configuració s'ha validat correctament."),
    (
        "store.config.unsupported_backend",
        "Les ordres del registre necessiten un emmagatzematge durador: configureu [store] type = \
         \"sqlite\" amb un camí, o passeu --store-path.",
    ),
    ("store.open_failed", "No s'ha pogut obrir l'emmagatzematge del registre: {error}"),
    ("audit.open_failed", "No s'ha pogut obrir el registre d'auditoria a {path}: {error}"),
    ("market.open_failed", "No s'ha pogut obrir el mercat: {error}"),
    ("market.operation_failed", "Operació rebutjada ({kind}): {error}"),
    ("ledger.history.failed", "No s'ha pogut llegir l'historial del registre: {error}"),
    ("ledger.version.not_found", "Versió del registre no trobada: {version}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders `key` in the current locale with `args` substituted.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = current_locale().lookup(key).or_else(|| Locale::En.lookup(key));
    template.map_or_else(|| key.to_string(), |template| render(template, &args))
}

/// Replaces each `{name}` in `template` with the matching argument.
fn render(template: &str, args: &[MessageArg]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(width) = rest[open ..].find('}') else {
            break;
        };
        let close = open + width;
        out.push_str(&rest[.. open]);
        let name = &rest[open + 1 .. close];
        match args.iter().find(|arg| arg.key == name) {
            Some(arg) => out.push_str(&arg.value),
            None => out.push_str(&rest[open ..= close]),
        }
        rest = &rest[close + 1 ..];
    }
    out.push_str(rest);
    out
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[path = "tests/i18n.rs"]
mod tests;
