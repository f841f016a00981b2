//! Registro de preguntas respondidas (JSONL) y analítica por tema.

use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RagAnswer;

/// Una pregunta y su respuesta, tal como se guardan en el historial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(question: &str, answer: &RagAnswer, topic: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer: answer.answer.clone(),
            sources: answer.sources.clone(),
            topic: topic.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Recuento de preguntas por tema, en total y por día.
#[derive(Debug, Default, Serialize)]
pub struct TopicAnalytics {
    pub total_questions: usize,
    pub by_topic: BTreeMap<String, usize>,
    pub by_day: BTreeMap<NaiveDate, BTreeMap<String, usize>>,
}

impl std::fmt::Display for TopicAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} preguntas registradas.", self.total_questions)?;
        for (topic, count) in &self.by_topic {
            writeln!(f, "  - {topic}: {count}")?;
        }
        Ok(())
    }
}

/// Historial append-only en un fichero JSONL.
pub struct QueryHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl QueryHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn append(&self, record: &QueryRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("No se pudo abrir el historial {}", self.path.display()))?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Lee todos los registros. Un fichero inexistente es un historial vacío.
    pub fn load(&self) -> Result<Vec<QueryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("No se pudo leer el historial {}", self.path.display()))?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Línea {} inválida en {}", n + 1, self.path.display())
                })
            })
            .collect()
    }

    pub fn analytics(&self, range: DateRange) -> Result<TopicAnalytics> {
        Ok(summarize(&self.load()?, range))
    }
}

/// Intervalo de días (UTC) con ambos extremos inclusivos; `None` no acota.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

pub fn summarize(records: &[QueryRecord], range: DateRange) -> TopicAnalytics {
    let mut analytics = TopicAnalytics::default();
    for record in records {
        if !range.contains(record.created_at.date_naive()) {
            continue;
        }
        analytics.total_questions += 1;
        *analytics.by_topic.entry(record.topic.clone()).or_insert(0) += 1;
        *analytics
            .by_day
            .entry(record.created_at.date_naive())
            .or_default()
            .entry(record.topic.clone())
            .or_insert(0) += 1;
    }
    analytics
}
