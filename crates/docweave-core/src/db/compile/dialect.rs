use crate::config::{CompilerConfig, PlaceholderStyle};

///
/// Dialect
///
/// Backend text conventions the condition compiler renders through.
/// Placeholder indexes are 1-based and follow binding order.
///

pub trait Dialect: Send + Sync {
    fn quote_ident(&self, ident: &str) -> String;

    fn placeholder(&self, index: usize) -> String;

    /// Numbered placeholders can be referenced twice; positional ones
    /// (`?`) need the value bound once per occurrence.
    fn numbered_placeholders(&self) -> bool;

    fn lower_fn(&self) -> &str {
        "LOWER"
    }

    fn false_literal(&self) -> &str {
        "FALSE"
    }
}

/// Quote an identifier, doubling embedded quote characters.
pub(crate) fn quote_with(quote: char, ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(quote);
    for ch in ident.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);

    out
}

///
/// Postgres
/// `"ident"` quoting and `$n` placeholders.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_ident(&self, ident: &str) -> String {
        quote_with('"', ident)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn numbered_placeholders(&self) -> bool {
        true
    }
}

///
/// ConfiguredDialect
/// Dialect assembled from a `CompilerConfig`.
///

#[derive(Clone, Debug)]
pub struct ConfiguredDialect {
    config: CompilerConfig,
}

impl ConfiguredDialect {
    #[must_use]
    pub const fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

impl From<CompilerConfig> for ConfiguredDialect {
    fn from(config: CompilerConfig) -> Self {
        Self::new(config)
    }
}

impl Dialect for ConfiguredDialect {
    fn quote_ident(&self, ident: &str) -> String {
        quote_with(self.config.quote, ident)
    }

    fn placeholder(&self, index: usize) -> String {
        match self.config.placeholder {
            PlaceholderStyle::Dollar => format!("${index}"),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }

    fn numbered_placeholders(&self) -> bool {
        matches!(self.config.placeholder, PlaceholderStyle::Dollar)
    }

    fn lower_fn(&self) -> &str {
        &self.config.lower_fn
    }

    fn false_literal(&self) -> &str {
        &self.config.false_literal
    }
}
