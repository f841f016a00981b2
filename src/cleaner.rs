//! Limpieza del texto extraído de los PDF: elimina citas académicas y la
//! sección de bibliografía, y normaliza el espacio en blanco.

use std::sync::LazyLock;

use regex::Regex;

// (Delvigne & Rozenberg, 2002)
static AUTHOR_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([A-Z][a-zA-Z&.\s]+,\s*\d{4}\)").unwrap());

// [12], [3, 7]
static NUMERIC_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\d+(?:\s*,\s*\d+)*\s*\]").unwrap());

// (2005)
static BARE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d{4}\)").unwrap());

// Coincide en cualquier posición, no sólo en una cabecera: una mención a
// "references" en mitad de una frase trunca también el resto de la página.
static REFERENCES_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)references.*").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Elimina artefactos de citas y la bibliografía conservando el contenido
/// clínico. Nunca falla: cualquier cadena produce una cadena.
pub fn clean_pdf_text(text: &str) -> String {
    let text = AUTHOR_YEAR.replace_all(text, "");
    let text = NUMERIC_CITATION.replace_all(&text, "");
    let text = BARE_YEAR.replace_all(&text, "");
    let text = REFERENCES_TAIL.replace(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}
